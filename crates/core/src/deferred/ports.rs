//! Port interfaces for the deferred queue

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use deferq_domain::{Result, SendAttempt, SenderStatus, TracedRequest};

/// Everything the transmission primitive needs for one delivery attempt.
#[derive(Debug, Clone, Copy)]
pub struct SendRequest<'a> {
    pub destination: &'a str,
    pub payload: &'a [u8],
    /// Advertised size, independent of `payload.len()`
    pub size: u64,
    /// Rotation hint: which local interface to try first
    pub iteration: u64,
    /// Return a 4xx/5xx answer at once instead of trying other interfaces
    pub bail_on_http_error: bool,
    pub with_net_tracing: bool,
}

/// Delivers a payload to a destination over one or more local interfaces.
#[async_trait]
pub trait Transmitter: Send + Sync {
    /// Attempt delivery. Transport failures are reported inside the
    /// returned [`SendAttempt`], never as a panic or a dropped future.
    async fn send(&self, request: SendRequest<'_>) -> SendAttempt;
}

/// Liveness reporting for the background loop.
#[async_trait]
pub trait LivenessRegistrar: Send + Sync {
    /// Register a watchdog entry for `name`.
    async fn register_watchdog(&self, name: &str) -> Result<()>;

    /// Report that the task called `name` is still making progress.
    async fn still_running(&self, name: &str, warning: Duration, error: Duration) -> Result<()>;

    /// Report how long one unit of work took against the budgets.
    fn check_max_time(
        &self,
        agent: &str,
        context: &str,
        elapsed: Duration,
        warning: Duration,
        error: Duration,
    );
}

/// Priority predicate over an item's classifier.
pub type PriorityCheck<C> = Arc<dyn Fn(&C) -> bool + Send + Sync>;

/// Completion callback: `(classifier, payload, status, traces)`.
pub type SentHandler<C> = Arc<dyn Fn(&C, &[u8], SenderStatus, &[TracedRequest]) + Send + Sync>;
