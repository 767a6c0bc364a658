/// Logging setup
///
/// Everything is logged through `tracing` to stderr. `RUST_LOG` overrides
/// the configured level.
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

/// Map a configured level name to a filter; `None` for unknown names
pub fn parse_level(level: &str) -> Option<LevelFilter> {
    match level.to_lowercase().as_str() {
        "trace" => Some(LevelFilter::TRACE),
        "debug" => Some(LevelFilter::DEBUG),
        "info" => Some(LevelFilter::INFO),
        "warn" => Some(LevelFilter::WARN),
        "error" => Some(LevelFilter::ERROR),
        "none" | "off" => Some(LevelFilter::OFF),
        _ => None,
    }
}

/// Install the global subscriber; a second call is a no-op
pub fn init(level: &str) {
    let level = parse_level(level).unwrap_or(LevelFilter::INFO);
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.to_string()));

    let installed = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .with_writer(std::io::stderr)
        .try_init();

    if installed.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}
