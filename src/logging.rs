//! Structured logging setup.
//!
//! The library only emits `tracing` events; installing a subscriber is left
//! to the embedding application. [`init`] is a convenience for binaries and
//! tests that want the configured level on stderr.

use tracing::Level;

use crate::config::LoggingConfig;

/// Parses a level name, falling back to `WARN` for anything unrecognized.
#[must_use]
pub fn parse_level(level: &str) -> Level {
    match level.trim().to_ascii_lowercase().as_str() {
        "error" => Level::ERROR,
        "info" => Level::INFO,
        "debug" => Level::DEBUG,
        "trace" => Level::TRACE,
        _ => Level::WARN,
    }
}

/// Installs a global `fmt` subscriber at the configured level.
///
/// Returns `false` if a global subscriber was already installed, which makes
/// repeated calls from tests harmless.
pub fn init(config: &LoggingConfig) -> bool {
    tracing_subscriber::fmt()
        .with_max_level(parse_level(&config.level))
        .with_target(config.with_target)
        .with_writer(std::io::stderr)
        .try_init()
        .is_ok()
}
