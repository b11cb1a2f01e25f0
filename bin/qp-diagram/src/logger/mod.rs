use std::io::IsTerminal;

use hive_router_diagram_config::log::{LogFormat, LoggingConfig};
use tracing_subscriber::{
    filter::ParseError,
    fmt::{self, format::FmtSpan, time::UtcTime},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    Layer, Registry,
};

/// Installs the global subscriber. Everything is written to stderr, stdout
/// only carries the printed plan and diagram.
pub fn configure_logging(config: &LoggingConfig) -> Result<(), ParseError> {
    let timer = UtcTime::rfc_3339();
    let filter = config.env_filter()?;
    let is_terminal = std::io::stderr().is_terminal();

    let layer = match config.format {
        LogFormat::Tree => tracing_tree::HierarchicalLayer::new(2)
            .with_ansi(is_terminal)
            .with_bracketed_fields(true)
            .with_deferred_spans(false)
            .with_wraparound(25)
            .with_indent_lines(true)
            .with_timer(tracing_tree::time::Uptime::default())
            .with_thread_names(false)
            .with_thread_ids(false)
            .with_targets(false)
            .boxed(),
        LogFormat::Json => fmt::Layer::<Registry>::default()
            .json()
            .with_writer(std::io::stderr)
            .with_timer(timer)
            .with_span_events(FmtSpan::CLOSE)
            .boxed(),
        LogFormat::Compact => fmt::Layer::<Registry>::default()
            .compact()
            .with_writer(std::io::stderr)
            .with_ansi(is_terminal)
            .with_timer(timer)
            .with_span_events(FmtSpan::CLOSE)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(layer)
        .with(filter)
        .init();

    Ok(())
}
