//! Logging bootstrap
//!
//! Installs a `tracing_subscriber` registry with an env filter and a fmt
//! layer. `RUST_LOG` wins over the configured level.

use crate::config::LoggingConfig;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Build the filter used by [`init`]
pub fn env_filter(config: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Initialize global logging
///
/// Returns false when a global subscriber was already installed (tests, or an
/// embedding application that set up its own).
pub fn init(config: &LoggingConfig) -> bool {
    tracing_subscriber::registry()
        .with(env_filter(config))
        .with(tracing_subscriber::fmt::layer())
        .try_init()
        .is_ok()
}
