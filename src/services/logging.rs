//! Logging setup for Shelfmark binaries.
//!
//! Installs a `tracing-subscriber` fmt subscriber writing to stderr, so the
//! stdout response stream of `shelfmark-rpc` only ever carries JSON.

use tracing_subscriber::EnvFilter;

use crate::types::settings::LoggingSettings;

/// Builds the filter: `RUST_LOG` when set, otherwise the configured directive.
///
/// An unparsable configured directive falls back to `info`.
pub fn build_filter(settings: &LoggingSettings) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.filter))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Installs the global subscriber. Returns `false` if one was already installed.
pub fn init(settings: &LoggingSettings) -> bool {
    tracing_subscriber::fmt()
        .with_env_filter(build_filter(settings))
        .with_writer(std::io::stderr)
        .with_ansi(settings.ansi)
        .with_target(true)
        .try_init()
        .is_ok()
}
