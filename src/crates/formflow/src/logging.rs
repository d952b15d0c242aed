//! Tracing setup
//!
//! The library itself only emits `tracing` events. Embedders that want them
//! printed call [`init_tracing`] once with the loaded [`LoggingConfig`].

use crate::config::LoggingConfig;
use tracing_subscriber::EnvFilter;

/// Filter from `RUST_LOG`, falling back to the configured level
pub fn env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}

/// Install a global fmt subscriber
///
/// Returns `false` when a global subscriber was already installed; the
/// existing one is left in place.
pub fn init_tracing(config: &LoggingConfig) -> bool {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter(&config.level))
        .with_ansi(config.colored);

    let result = match (config.format.as_str(), config.timestamps) {
        ("pretty", true) => builder.pretty().try_init(),
        ("pretty", false) => builder.pretty().without_time().try_init(),
        (_, true) => builder.compact().try_init(),
        (_, false) => builder.compact().without_time().try_init(),
    };

    match result {
        Ok(()) => {
            tracing::debug!(level = %config.level, format = %config.format, "Tracing initialized");
            true
        }
        Err(_) => false,
    }
}
