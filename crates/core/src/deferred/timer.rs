//! Backoff timer regimes
//!
//! The ticker is created once and never torn down. "Stopping" parks it on a
//! range of a day or two, which never matters while the store is empty.

use std::time::Duration;

use deferq_common::{FlexTicker, Regime, TickerError};
use deferq_domain::DeferredConfig;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::debug;

/// Intervals for both regimes
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimerSettings {
    pub backoff_min: Duration,
    pub backoff_max: Duration,
    pub jitter: f64,
    pub idle_min: Duration,
    pub idle_max: Duration,
}

impl Default for TimerSettings {
    fn default() -> Self {
        Self::from(&DeferredConfig::default())
    }
}

impl From<&DeferredConfig> for TimerSettings {
    fn from(config: &DeferredConfig) -> Self {
        Self {
            backoff_min: config.backoff_min(),
            backoff_max: config.backoff_max(),
            jitter: config.jitter,
            idle_min: config.idle_min(),
            idle_max: config.idle_max(),
        }
    }
}

#[derive(Debug)]
pub struct BackoffTimer {
    ticker: FlexTicker,
    settings: TimerSettings,
}

impl BackoffTimer {
    /// Start the timer in the dormant regime.
    pub fn start(settings: TimerSettings) -> Result<(Self, mpsc::Receiver<Instant>), TickerError> {
        let (ticker, ticks) = FlexTicker::range(settings.idle_min, settings.idle_max)?;
        Ok((Self { ticker, settings }, ticks))
    }

    /// Exponential backoff from `backoff_min`. Restarts the sequence.
    pub fn activate(&self) {
        debug!("starting deferred timer");
        self.ticker.update_exp(self.settings.backoff_min, self.settings.backoff_max, self.settings.jitter);
    }

    /// Park on the idle range.
    pub fn deactivate(&self) {
        debug!("stopping deferred timer");
        self.ticker.update_range(self.settings.idle_min, self.settings.idle_max);
    }

    /// Fire once now; the regime is left alone.
    pub fn kick(&self) {
        self.ticker.tick_now();
    }

    pub fn regime(&self) -> Regime {
        self.ticker.regime()
    }

    pub async fn shutdown(&self) {
        self.ticker.shutdown().await;
    }
}
