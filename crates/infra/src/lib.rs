//! # deferq Infrastructure
//!
//! Adapters that connect the deferred queue to the outside world.
//!
//! This crate contains:
//! - Configuration loading (environment and TOML/JSON files)
//! - Tracing subscriber setup
//! - The reqwest-based [`http::HttpTransmitter`]
//! - The touch-file [`watchdog::FileWatchdog`]
//! - Conversions from third-party errors into `DeferqError`
//!
//! ## Architecture
//! - Implements the port traits declared in `deferq-core`
//! - Owns every piece of network and filesystem I/O

pub mod config;
pub mod errors;
pub mod http;
pub mod observability;
pub mod watchdog;

use std::sync::Arc;

use deferq_core::{DeferredQueue, DeferredQueueBuilder, LivenessRegistrar, Transmitter};
use deferq_domain::{Config, Result};

pub use errors::InfraError;
pub use http::{HttpTransmitter, HttpTransmitterBuilder};
pub use observability::init_tracing;
pub use watchdog::FileWatchdog;

/// Builder for a queue wired to the HTTP transmitter and the file watchdog,
/// with timing taken from `config`.
///
/// # Errors
/// Returns `DeferqError::Config` if the configuration is invalid, names an
/// unparseable interface address, or an HTTP client cannot be built from it.
pub fn queue_builder<C: Send + Sync + 'static>(
    config: &Config,
    agent_name: &str,
    context_name: &str,
) -> Result<DeferredQueueBuilder<C>> {
    config.validate()?;

    let transmitter: Arc<dyn Transmitter> = Arc::new(HttpTransmitter::from_config(&config.transport)?);
    let registrar: Arc<dyn LivenessRegistrar> = Arc::new(FileWatchdog::from_config(&config.watchdog));

    Ok(DeferredQueue::builder(transmitter, registrar)
        .agent_name(agent_name)
        .context_name(context_name)
        .config(&config.deferred))
}
