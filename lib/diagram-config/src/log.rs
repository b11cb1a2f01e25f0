use serde::{Deserialize, Serialize};
use tracing_subscriber::{
    filter::{LevelFilter, ParseError},
    EnvFilter,
};

/// Logs always go to stderr, stdout is reserved for the printed plan and
/// diagram.
#[derive(Debug, Deserialize, Serialize, Default)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Verbosity applied to every target. Overridden by `LOG_LEVEL`.
    #[serde(default)]
    pub level: LogLevel,

    /// Layout of the log lines. Overridden by `LOG_FORMAT`.
    #[serde(default)]
    pub format: LogFormat,

    /// `EnvFilter` directives such as
    /// `hive_router_query_plan_diagram::connectors=debug`. When set, `level`
    /// is ignored. Overridden by `LOG_FILTER`.
    #[serde(default)]
    pub filter: Option<String>,
}

impl LoggingConfig {
    pub fn env_filter(&self) -> Result<EnvFilter, ParseError> {
        match &self.filter {
            Some(directives) => EnvFilter::try_new(directives),
            None => Ok(EnvFilter::new("").add_directive(LevelFilter::from(self.level).into())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    #[default]
    Warn,
    Error,
    Off,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => LevelFilter::TRACE,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Off => LevelFilter::OFF,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Indented span tree, easiest to follow through a single plan walk.
    Tree,
    /// One line per event.
    #[default]
    Compact,
    Json,
}
