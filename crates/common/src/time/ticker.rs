//! Reschedulable tick source
//!
//! [`FlexTicker`] owns a background task that emits ticks on a bounded
//! channel. Its cadence can be changed while it runs:
//!
//! - **range**: each interval is drawn uniformly from `[min, max]`
//! - **exponential**: intervals follow an [`ExponentialBackoff`], advancing
//!   one step per natural tick
//!
//! [`FlexTicker::tick_now`] emits a tick at once without touching the
//! cadence. Ticks that the consumer has not picked up yet are coalesced, so
//! a slow consumer sees at most one pending tick.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, Notify};
use tokio::task::JoinHandle;
use tokio::time::{sleep, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use super::backoff::{random_between, ExponentialBackoff};

/// Errors raised when creating a ticker
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TickerError {
    #[error("ticker requires a running Tokio runtime")]
    NoRuntime,
}

/// Coarse view of the ticker cadence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Regime {
    /// Range cadence; used with very long intervals to park the ticker
    Dormant,
    /// Exponential backoff cadence
    Active,
}

impl std::fmt::Display for Regime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Dormant => f.write_str("dormant"),
            Self::Active => f.write_str("active"),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Cadence {
    Range { min: Duration, max: Duration },
    Exponential { backoff: ExponentialBackoff, attempt: u32 },
}

impl Cadence {
    fn next_delay(&self) -> Duration {
        match *self {
            Self::Range { min, max } => random_between(min, max),
            Self::Exponential { backoff, attempt } => backoff.delay(attempt),
        }
    }

    fn regime(&self) -> Regime {
        match self {
            Self::Range { .. } => Regime::Dormant,
            Self::Exponential { .. } => Regime::Active,
        }
    }
}

#[derive(Debug)]
struct TickerState {
    cadence: Cadence,
    /// Bumped on every cadence change
    generation: u64,
    kick: bool,
}

#[derive(Debug)]
struct Shared {
    state: Mutex<TickerState>,
    changed: Notify,
}

/// Tick source with switchable cadence
///
/// Dropping the ticker stops its task.
#[derive(Debug)]
pub struct FlexTicker {
    shared: Arc<Shared>,
    cancel: CancellationToken,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl FlexTicker {
    /// Start a ticker with a range cadence.
    ///
    /// Returns the ticker and the receiving end of its tick channel.
    ///
    /// # Errors
    /// Returns [`TickerError::NoRuntime`] when called outside a Tokio
    /// runtime.
    pub fn range(min: Duration, max: Duration) -> Result<(Self, mpsc::Receiver<Instant>), TickerError> {
        Self::spawn(Cadence::Range { min, max: max.max(min) })
    }

    /// Start a ticker with an exponential cadence.
    ///
    /// # Errors
    /// Returns [`TickerError::NoRuntime`] when called outside a Tokio
    /// runtime.
    pub fn exponential(
        min: Duration,
        max: Duration,
        jitter: f64,
    ) -> Result<(Self, mpsc::Receiver<Instant>), TickerError> {
        Self::spawn(Cadence::Exponential {
            backoff: ExponentialBackoff::new(min, max, jitter),
            attempt: 0,
        })
    }

    fn spawn(cadence: Cadence) -> Result<(Self, mpsc::Receiver<Instant>), TickerError> {
        let handle = Handle::try_current().map_err(|_| TickerError::NoRuntime)?;

        let shared = Arc::new(Shared {
            state: Mutex::new(TickerState { cadence, generation: 0, kick: false }),
            changed: Notify::new(),
        });
        let cancel = CancellationToken::new();
        let (tx, rx) = mpsc::channel(1);

        let task = handle.spawn(run(Arc::clone(&shared), cancel.clone(), tx));

        Ok((Self { shared, cancel, task: Mutex::new(Some(task)) }, rx))
    }

    /// Switch to an exponential cadence starting over from `min`.
    pub fn update_exp(&self, min: Duration, max: Duration, jitter: f64) {
        let backoff = ExponentialBackoff::new(min, max, jitter);
        self.set_cadence(Cadence::Exponential { backoff, attempt: 0 });
    }

    /// Switch to a range cadence.
    pub fn update_range(&self, min: Duration, max: Duration) {
        self.set_cadence(Cadence::Range { min, max: max.max(min) });
    }

    /// Emit a tick as soon as possible without changing the cadence.
    pub fn tick_now(&self) {
        self.shared.state.lock().kick = true;
        self.shared.changed.notify_one();
    }

    /// Current regime.
    pub fn regime(&self) -> Regime {
        self.shared.state.lock().cadence.regime()
    }

    /// Stop the ticker task and wait for it to exit.
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        let task = self.task.lock().take();
        if let Some(task) = task {
            if let Err(err) = task.await {
                debug!(error = %err, "ticker task ended abnormally");
            }
        }
    }

    fn set_cadence(&self, cadence: Cadence) {
        {
            let mut state = self.shared.state.lock();
            state.cadence = cadence;
            state.generation = state.generation.wrapping_add(1);
        }
        self.shared.changed.notify_one();
    }
}

impl Drop for FlexTicker {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn run(shared: Arc<Shared>, cancel: CancellationToken, tx: mpsc::Sender<Instant>) {
    loop {
        let (kicked, delay, armed) = {
            let mut state = shared.state.lock();
            let kicked = std::mem::take(&mut state.kick);
            (kicked, state.cadence.next_delay(), state.generation)
        };

        if kicked && !emit(&tx) {
            break;
        }

        trace!(delay_ms = delay.as_millis() as u64, "ticker armed");

        tokio::select! {
            () = cancel.cancelled() => break,
            () = shared.changed.notified() => {}
            () = sleep(delay) => {
                advance(&shared, armed);
                if !emit(&tx) {
                    break;
                }
            }
        }
    }
    debug!("ticker task stopped");
}

/// Step the exponential cadence after a natural fire, unless the cadence
/// was replaced after the sleep was armed.
fn advance(shared: &Shared, armed: u64) {
    let mut state = shared.state.lock();
    if state.generation != armed {
        return;
    }
    if let Cadence::Exponential { attempt, .. } = &mut state.cadence {
        *attempt = attempt.saturating_add(1);
    }
}

/// Send a tick unless one is already pending. Returns false once the
/// receiver is gone.
fn emit(tx: &mpsc::Sender<Instant>) -> bool {
    match tx.try_send(Instant::now()) {
        Ok(()) | Err(mpsc::error::TrySendError::Full(_)) => true,
        Err(mpsc::error::TrySendError::Closed(_)) => false,
    }
}
