//! Tracing subscriber setup
//!
//! Installs a global `tracing` subscriber driven by [`LoggingConfig`].
//! `RUST_LOG` takes precedence over the configured level.

use deferq_domain::{DeferqError, LoggingConfig, Result};
use tracing_subscriber::EnvFilter;

/// Install the global subscriber.
///
/// Returns `Ok(false)` when a global subscriber was already installed, so it
/// is safe to call more than once.
///
/// # Errors
/// Returns `DeferqError::Config` if neither `RUST_LOG` nor the configured
/// level is a valid filter directive.
pub fn init_tracing(config: &LoggingConfig) -> Result<bool> {
    let filter = build_filter(config)?;

    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);
    let installed = if config.json {
        builder.json().with_current_span(true).try_init().is_ok()
    } else {
        builder.try_init().is_ok()
    };

    if installed {
        tracing::debug!(level = %config.level, json = config.json, "tracing initialized");
    }
    Ok(installed)
}

fn build_filter(config: &LoggingConfig) -> Result<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(&config.level).map_err(|e| {
        DeferqError::Config(format!("invalid log level '{}': {e}", config.level))
    })
}
