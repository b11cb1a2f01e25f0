mod env_overrides;
pub mod guard;
pub mod log;

use config::{Config, File, FileFormat, FileSourceFile};
use envconfig::Envconfig;
use serde::{Deserialize, Serialize};
use std::{convert::Infallible, path::PathBuf};

use crate::{
    env_overrides::{EnvVarOverrides, EnvVarOverridesError},
    guard::GuardConfig,
    log::LoggingConfig,
};

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DiagramConfig {
    /// Logger configuration. Logs are written to stderr.
    #[serde(default)]
    pub log: LoggingConfig,

    /// Handling of plan nodes the diagram tooling does not know about.
    #[serde(default)]
    pub guard: GuardConfig,
}

#[derive(Debug, thiserror::Error)]
pub enum DiagramConfigError {
    #[error("Failed to load configuration: {0}")]
    ConfigLoadError(#[from] config::ConfigError),
    #[error("Failed to apply configuration overrides: {0}")]
    EnvVarOverridesError(#[from] EnvVarOverridesError),
    #[error("Failed to load the environment variables: {0}")]
    EnvVarLoadError(#[from] envconfig::Error),
    #[error("Failed to parse the configuration file path: {0}")]
    ConfigPathParseError(Infallible),
}

static DEFAULT_FILE_NAMES: &[&str] = &[
    "qp-diagram.config.yaml",
    "qp-diagram.config.yml",
    "qp-diagram.config.json",
    "qp-diagram.config.json5",
];

/// Loads the configuration from `override_config_path`, or from the first
/// default file name found in the working directory, then applies the
/// environment overrides. Without any file every section uses its defaults.
pub fn load_config(
    override_config_path: Option<String>,
) -> Result<DiagramConfig, DiagramConfigError> {
    load_config_with_overrides(override_config_path, EnvVarOverrides::init_from_env()?)
}

fn load_config_with_overrides(
    override_config_path: Option<String>,
    env_overrides: EnvVarOverrides,
) -> Result<DiagramConfig, DiagramConfigError> {
    let mut config = Config::builder();

    if let Some(path_str) = override_config_path {
        let path_buf = path_str
            .parse::<PathBuf>()
            .map_err(DiagramConfigError::ConfigPathParseError)?;
        let as_file: File<FileSourceFile, _> = path_buf.into();

        config = config.add_source(as_file.required(true));
    } else {
        for name in DEFAULT_FILE_NAMES {
            config = config.add_source(File::with_name(name).required(false));
        }
    }

    config = env_overrides.apply_overrides(config)?;

    Ok(config.build()?.try_deserialize::<DiagramConfig>()?)
}

pub fn parse_yaml_config(config_raw: String) -> Result<DiagramConfig, DiagramConfigError> {
    Config::builder()
        .add_source(File::from_str(&config_raw, FileFormat::Yaml))
        .build()?
        .try_deserialize::<DiagramConfig>()
        .map_err(DiagramConfigError::ConfigLoadError)
}
