//! Tracing subscriber setup
//!
//! Priority: `RUST_LOG`, then `-q`, then `-v` (repeatable), then `logging.level`.

use tracing_subscriber::EnvFilter;

/// Pick the filter directive for the given flags
pub fn directive(config_level: &str, verbose: u8, quiet: bool) -> String {
    if quiet {
        return "error".to_string();
    }
    match verbose {
        0 => config_level.to_string(),
        1 => "info".to_string(),
        2 => "debug".to_string(),
        _ => "trace".to_string(),
    }
}

/// Install the global subscriber, writing to stderr.
///
/// Calling this twice is harmless; the first subscriber stays installed.
pub fn init(config_level: &str, verbose: u8, quiet: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(directive(config_level, verbose, quiet)));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_names(true)
        .try_init();
}
