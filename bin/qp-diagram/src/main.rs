mod logger;

use std::{fs, path::PathBuf, process::ExitCode};

use clap::Parser;
use hive_router_diagram_config::{load_config, DiagramConfigError};
use hive_router_query_plan_diagram::{
    connectors::{plan_touches_connector, SubgraphInfoMap},
    diagram::{query_plan_to_mermaid, DiagramError},
    exhaustiveness::{ExhaustivenessGuard, UnhandledVariantError},
    links::{kroki_url, mermaid_ink_url, LinkError, MermaidOutput},
    plan_nodes::QueryPlan,
};
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::logger::configure_logging;

const LINK_WARNING: &str = "
--- Warning: This URL is not associated with Apollo GraphQL, visit at your own discretion. ---
--- Visiting this link will pass the encoded mermaid textual representation of the query plan, base64 encoded, to the url below. ---
";

#[derive(Parser, Debug)]
#[command(author, version, about = "Prints a federated query plan as text, JSON or a Mermaid flowchart")]
struct Args {
    #[arg(long, value_name = "JSON", help = "Query plan produced by the federation query planner")]
    plan: PathBuf,

    #[arg(long, value_name = "JSON", help = "Subgraph schemas keyed by subgraph name")]
    subgraphs: Option<PathBuf>,

    #[arg(long, value_name = "FILE", env = "QP_DIAGRAM_CONFIG_FILE_PATH")]
    config: Option<String>,

    #[arg(long, help = "Print the plan as an indented tree instead of JSON")]
    pretty: bool,

    #[arg(long, help = "Do not print the plan itself")]
    skip_log: bool,

    #[arg(long, value_name = "OUTPUT", help = "One of: mmd, mermaidink, kroki")]
    mermaid: Option<MermaidOutput>,

    #[arg(long, help = "Report whether the plan reaches a connector subgraph")]
    connectors: bool,
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] DiagramConfigError),
    #[error("Failed to configure the logger: {0}")]
    Logger(#[from] tracing_subscriber::filter::ParseError),
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("Failed to print the query plan: {0}")]
    Print(#[from] serde_json::Error),
    #[error(transparent)]
    Diagram(#[from] DiagramError),
    #[error(transparent)]
    Link(#[from] LinkError),
    #[error(transparent)]
    UnhandledVariant(#[from] UnhandledVariantError),
}

fn read_json<T: DeserializeOwned>(path: &PathBuf) -> Result<T, CliError> {
    let raw = fs::read_to_string(path).map_err(|source| CliError::Read {
        path: path.clone(),
        source,
    })?;

    serde_json::from_str(&raw).map_err(|source| CliError::Parse {
        path: path.clone(),
        source,
    })
}

fn print_mermaid(
    plan: &QueryPlan,
    output: MermaidOutput,
    guard: &ExhaustivenessGuard,
) -> Result<(), CliError> {
    let diagram = query_plan_to_mermaid(plan, guard)?;

    match output {
        MermaidOutput::Markdown => {
            println!("Mermaid Markdown:");
            print!("{diagram}");
        }
        MermaidOutput::MermaidInk | MermaidOutput::Kroki => {
            let url = match output {
                MermaidOutput::Kroki => kroki_url(&diagram)?,
                _ => mermaid_ink_url(&diagram),
            };
            println!("To view a generated image of your query plan visit: ");
            println!("    - {url}");
            print!("{LINK_WARNING}");
        }
    }

    Ok(())
}

fn run(args: Args) -> Result<(), CliError> {
    let config = load_config(args.config)?;
    configure_logging(&config.log)?;
    let guard = config.guard.guard();
    debug!(guard_mode = guard.mode().as_str(), "configuration loaded");

    let plan: QueryPlan = read_json(&args.plan)?;
    info!(path = %args.plan.display(), "query plan loaded");

    if !args.skip_log {
        if args.pretty {
            print!("{plan}");
        } else {
            println!("{}", serde_json::to_string_pretty(&plan)?);
        }
    }

    if let Some(output) = args.mermaid {
        print_mermaid(&plan, output, &guard)?;
    }

    if args.connectors {
        let subgraphs: SubgraphInfoMap = match &args.subgraphs {
            Some(path) => read_json(path)?,
            None => SubgraphInfoMap::new(),
        };
        let touches = match &plan.node {
            Some(root) => plan_touches_connector(root, &subgraphs, &guard)?,
            None => false,
        };
        println!("Touches connectors: {touches}");
    }

    Ok(())
}

fn main() -> ExitCode {
    match run(Args::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}
