use std::{io::Write, str::FromStr};

use base64::{
    engine::general_purpose::{STANDARD, URL_SAFE},
    Engine,
};
use flate2::{write::ZlibEncoder, Compression};

pub const MERMAID_INK_URL: &str = "https://mermaid.ink/img/";
pub const KROKI_MERMAID_URL: &str = "https://kroki.io/mermaid/svg/";

#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    #[error("Failed to compress the diagram: {0}")]
    CompressionFailed(#[from] std::io::Error),
}

/// The ways a compiled diagram can be handed to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MermaidOutput {
    /// Raw Mermaid markdown.
    Markdown,
    /// Link to an image rendered by mermaid.ink.
    MermaidInk,
    /// Link to an image rendered by kroki.io.
    Kroki,
}

impl MermaidOutput {
    pub fn as_str(&self) -> &'static str {
        match self {
            MermaidOutput::Markdown => "mmd",
            MermaidOutput::MermaidInk => "mermaidink",
            MermaidOutput::Kroki => "kroki",
        }
    }
}

impl FromStr for MermaidOutput {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mmd" => Ok(MermaidOutput::Markdown),
            "mermaidink" => Ok(MermaidOutput::MermaidInk),
            "kroki" => Ok(MermaidOutput::Kroki),
            _ => Err(format!(
                "Invalid mermaid output: {}, expected one of: mmd, mermaidink, kroki",
                s
            )),
        }
    }
}

/// mermaid.ink takes the diagram as standard base64 in the path.
pub fn mermaid_ink_url(diagram: &str) -> String {
    format!("{MERMAID_INK_URL}{}", STANDARD.encode(diagram.as_bytes()))
}

/// kroki.io takes the diagram as a zlib stream, base64 encoded with the URL
/// safe alphabet.
pub fn kroki_url(diagram: &str) -> Result<String, LinkError> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::best());
    encoder.write_all(diagram.as_bytes())?;
    let compressed = encoder.finish()?;

    Ok(format!("{KROKI_MERMAID_URL}{}", URL_SAFE.encode(compressed)))
}
