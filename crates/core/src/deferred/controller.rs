//! Deferred queue controller
//!
//! [`DeferredQueue`] is the handle producers use. It owns the background
//! task; dropping the handle cancels it. Share the handle with `Arc` when
//! several producers need it.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use deferq_core::{DeferredItem, DeferredQueue, LivenessRegistrar, Transmitter};
//! use deferq_domain::Result;
//!
//! # async fn example(
//! #     transmitter: Arc<dyn Transmitter>,
//! #     registrar: Arc<dyn LivenessRegistrar>,
//! # ) -> Result<()> {
//! let queue = DeferredQueue::<&'static str>::builder(transmitter, registrar)
//!     .agent_name("zedagent")
//!     .context_name("info")
//!     .priority(|class| *class == "app")
//!     .sent_handler(|class, _payload, status, _traces| {
//!         tracing::info!(%status, class, "deferred item handled");
//!     })
//!     .spawn()?;
//!
//! queue.set_deferred(DeferredItem::new("info:app1", b"...".to_vec(), "https://ctrl/api/v2/info", "app"));
//! queue.shutdown().await?;
//! # Ok(())
//! # }
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use deferq_common::Regime;
use deferq_domain::constants::WORKER_JOIN_TIMEOUT;
use deferq_domain::{DeferqError, DeferredConfig, Result, SenderStatus, TracedRequest};
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::dispatch::{run_round, RoundContext};
use super::item::DeferredItem;
use super::metrics::{DeferredMetrics, DeferredMetricsSnapshot};
use super::ports::{LivenessRegistrar, PriorityCheck, SentHandler, Transmitter};
use super::store::{ItemStore, Upsert};
use super::timer::{BackoffTimer, TimerSettings};
use super::worker;

/// Liveness identity and budgets of the background loop
pub(crate) struct Liveness {
    pub(crate) registrar: Arc<dyn LivenessRegistrar>,
    pub(crate) agent_name: String,
    pub(crate) context_name: String,
    pub(crate) warning_time: Duration,
    pub(crate) error_time: Duration,
    pub(crate) still_running_interval: Duration,
}

impl Liveness {
    pub(crate) fn watchdog_name(&self) -> String {
        format!("{}{}", self.agent_name, self.context_name)
    }
}

/// State shared between the handle and the background task
pub(crate) struct Shared<C> {
    store: Mutex<ItemStore<C>>,
    timer: BackoffTimer,
    predicates: Vec<PriorityCheck<C>>,
    sent_handler: Option<SentHandler<C>>,
    transmitter: Arc<dyn Transmitter>,
    iteration: AtomicU64,
    metrics: DeferredMetrics,
    /// Keeps rounds (timer-driven or manual) from interleaving their sends
    round_guard: tokio::sync::Mutex<()>,
    pub(crate) liveness: Liveness,
}

impl<C: Send + Sync + 'static> Shared<C> {
    #[instrument(skip_all, fields(agent = %self.liveness.agent_name, context = %self.liveness.context_name))]
    pub(crate) async fn handle_deferred(&self) -> bool {
        let _round = self.round_guard.lock().await;

        let batch = self.store.lock().take_all();
        if batch.is_empty() {
            return true;
        }
        self.metrics.record_round();

        let ctx = RoundContext {
            transmitter: self.transmitter.as_ref(),
            predicates: &self.predicates,
            sent_handler: self.sent_handler.as_ref(),
            iteration: &self.iteration,
            metrics: &self.metrics,
        };
        let outcome = run_round(&ctx, batch).await;
        debug!(
            attempted = outcome.attempted,
            sent = outcome.sent,
            halted = outcome.halted,
            "deferred round finished"
        );

        let all_sent = outcome.all_sent();
        self.metrics.record_requeued(outcome.not_sent.len());

        let mut store = self.store.lock();
        store.merge_back(outcome.not_sent);
        if store.is_empty() {
            self.timer.deactivate();
        } else if self.timer.regime() == Regime::Dormant {
            // A remove during the round parked the timer
            self.timer.activate();
        }

        all_sent
    }
}

/// Builder for [`DeferredQueue`]
pub struct DeferredQueueBuilder<C> {
    transmitter: Arc<dyn Transmitter>,
    registrar: Arc<dyn LivenessRegistrar>,
    agent_name: String,
    context_name: String,
    warning_time: Duration,
    error_time: Duration,
    still_running_interval: Duration,
    timer: TimerSettings,
    join_timeout: Duration,
    sent_handler: Option<SentHandler<C>>,
    predicates: Vec<PriorityCheck<C>>,
}

impl<C: Send + Sync + 'static> DeferredQueueBuilder<C> {
    fn new(transmitter: Arc<dyn Transmitter>, registrar: Arc<dyn LivenessRegistrar>) -> Self {
        let defaults = DeferredConfig::default();
        Self {
            transmitter,
            registrar,
            agent_name: String::new(),
            context_name: String::new(),
            warning_time: defaults.warning_time(),
            error_time: defaults.error_time(),
            still_running_interval: defaults.still_running_interval(),
            timer: TimerSettings::from(&defaults),
            join_timeout: WORKER_JOIN_TIMEOUT,
            sent_handler: None,
            predicates: Vec::new(),
        }
    }

    pub fn agent_name(mut self, name: impl Into<String>) -> Self {
        self.agent_name = name.into();
        self
    }

    pub fn context_name(mut self, name: impl Into<String>) -> Self {
        self.context_name = name.into();
        self
    }

    pub fn warning_time(mut self, warning: Duration) -> Self {
        self.warning_time = warning;
        self
    }

    pub fn error_time(mut self, error: Duration) -> Self {
        self.error_time = error;
        self
    }

    pub fn still_running_interval(mut self, interval: Duration) -> Self {
        self.still_running_interval = interval;
        self
    }

    pub fn timer_settings(mut self, settings: TimerSettings) -> Self {
        self.timer = settings;
        self
    }

    pub fn join_timeout(mut self, timeout: Duration) -> Self {
        self.join_timeout = timeout;
        self
    }

    /// Apply every timing knob from a config section.
    pub fn config(self, config: &DeferredConfig) -> Self {
        self.timer_settings(TimerSettings::from(config))
            .still_running_interval(config.still_running_interval())
            .warning_time(config.warning_time())
            .error_time(config.error_time())
    }

    /// Callback invoked for every attempt and for every item left unsent.
    pub fn sent_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(&C, &[u8], SenderStatus, &[TracedRequest]) + Send + Sync + 'static,
    {
        self.sent_handler = Some(Arc::new(handler));
        self
    }

    /// Add a priority predicate. Predicates run in the order added; an
    /// accept-all predicate always runs last.
    pub fn priority<F>(mut self, check: F) -> Self
    where
        F: Fn(&C) -> bool + Send + Sync + 'static,
    {
        self.predicates.push(Arc::new(check));
        self
    }

    /// Start the background task and return the queue handle.
    ///
    /// # Errors
    /// - `DeferqError::InvalidInput` for an empty agent name, a zero backoff
    ///   minimum or a zero liveness interval
    /// - `DeferqError::Internal` when called outside a Tokio runtime
    pub fn spawn(self) -> Result<DeferredQueue<C>> {
        if self.agent_name.trim().is_empty() {
            return Err(DeferqError::InvalidInput("agent name must not be empty".into()));
        }
        if self.timer.backoff_min.is_zero() {
            return Err(DeferqError::InvalidInput("backoff minimum must be positive".into()));
        }
        if self.still_running_interval.is_zero() {
            return Err(DeferqError::InvalidInput("still-running interval must be positive".into()));
        }

        let runtime = Handle::try_current().map_err(|_| {
            DeferqError::Internal("deferred queue requires a running Tokio runtime".into())
        })?;
        let (timer, ticks) =
            BackoffTimer::start(self.timer).map_err(|e| DeferqError::Internal(e.to_string()))?;

        let mut predicates = self.predicates;
        predicates.push(Arc::new(|_: &C| true));

        let shared = Arc::new(Shared {
            store: Mutex::new(ItemStore::new()),
            timer,
            predicates,
            sent_handler: self.sent_handler,
            transmitter: self.transmitter,
            iteration: AtomicU64::new(0),
            metrics: DeferredMetrics::new(),
            round_guard: tokio::sync::Mutex::new(()),
            liveness: Liveness {
                registrar: self.registrar,
                agent_name: self.agent_name,
                context_name: self.context_name,
                warning_time: self.warning_time,
                error_time: self.error_time,
                still_running_interval: self.still_running_interval,
            },
        });

        let cancel = CancellationToken::new();
        let task = runtime.spawn(worker::run(Arc::clone(&shared), ticks, cancel.clone()));

        info!(
            agent = %shared.liveness.agent_name,
            context = %shared.liveness.context_name,
            "deferred queue started"
        );

        Ok(DeferredQueue {
            shared,
            cancel,
            task: Mutex::new(Some(task)),
            join_timeout: self.join_timeout,
        })
    }
}

/// Store-and-forward queue for one logical message channel
pub struct DeferredQueue<C> {
    shared: Arc<Shared<C>>,
    cancel: CancellationToken,
    task: Mutex<Option<JoinHandle<()>>>,
    join_timeout: Duration,
}

impl<C: Send + Sync + 'static> DeferredQueue<C> {
    pub fn builder(
        transmitter: Arc<dyn Transmitter>,
        registrar: Arc<dyn LivenessRegistrar>,
    ) -> DeferredQueueBuilder<C> {
        DeferredQueueBuilder::new(transmitter, registrar)
    }

    /// Queue `item`, replacing any pending item with the same key, and kick
    /// the timer. Never waits on I/O.
    pub fn set_deferred(&self, item: DeferredItem<C>) {
        let shared = &self.shared;
        let mut store = shared.store.lock();
        debug!(key = %item.key, size = item.size, items = store.len(), "set deferred");

        if store.is_empty() {
            shared.timer.activate();
        }
        let upsert = store.upsert(item);
        shared.metrics.record_upsert(upsert == Upsert::Replaced);

        shared.timer.kick();
    }

    /// Drop the pending item with `key`, if any.
    pub fn remove_deferred(&self, key: &str) {
        let shared = &self.shared;
        let mut store = shared.store.lock();
        debug!(key = %key, items = store.len(), "remove deferred");

        if store.remove(key).is_some() {
            shared.metrics.record_removal();
        }
        if store.is_empty() {
            shared.timer.deactivate();
        }
    }

    /// Run a round as soon as the background task is free.
    pub fn kick_timer(&self) {
        self.shared.timer.kick();
    }

    /// Run one round on the caller's task.
    ///
    /// Returns true when nothing is left to send.
    pub async fn handle_deferred(&self) -> bool {
        self.shared.handle_deferred().await
    }

    pub fn pending_count(&self) -> usize {
        self.shared.store.lock().len()
    }

    pub fn pending_keys(&self) -> Vec<String> {
        self.shared.store.lock().keys()
    }

    /// Copy of the pending item with `key`.
    pub fn pending_item(&self, key: &str) -> Option<DeferredItem<C>>
    where
        C: Clone,
    {
        self.shared.store.lock().get(key).cloned()
    }

    pub fn timer_regime(&self) -> Regime {
        self.shared.timer.regime()
    }

    /// Number of send attempts made so far.
    pub fn iteration(&self) -> u64 {
        self.shared.iteration.load(Ordering::Relaxed)
    }

    pub fn metrics(&self) -> DeferredMetricsSnapshot {
        self.shared.metrics.snapshot(self.pending_count())
    }

    pub fn is_running(&self) -> bool {
        self.task.lock().as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Stop the background task and wait for it to finish.
    ///
    /// A round in flight is allowed to complete within the join timeout.
    ///
    /// # Errors
    /// `DeferqError::Internal` if the task panicked or did not stop in time.
    #[instrument(skip(self), fields(agent = %self.shared.liveness.agent_name))]
    pub async fn shutdown(&self) -> Result<()> {
        info!("stopping deferred queue");
        self.cancel.cancel();

        let task = self.task.lock().take();
        if let Some(task) = task {
            match tokio::time::timeout(self.join_timeout, task).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    warn!(error = %e, "deferred queue task panicked");
                    return Err(DeferqError::Internal("deferred queue task panicked".into()));
                }
                Err(_) => {
                    warn!("deferred queue task did not complete within timeout");
                    return Err(DeferqError::Internal("deferred queue task timeout".into()));
                }
            }
        }
        self.shared.timer.shutdown().await;

        info!(pending = self.pending_count(), "deferred queue stopped");
        Ok(())
    }
}

impl<C> Drop for DeferredQueue<C> {
    fn drop(&mut self) {
        if !self.cancel.is_cancelled() {
            debug!("deferred queue dropped while running; cancelling task");
            self.cancel.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use deferq_domain::SendAttempt;

    use super::super::ports::SendRequest;
    use super::*;

    struct AlwaysDelivered;

    #[async_trait]
    impl Transmitter for AlwaysDelivered {
        async fn send(&self, _request: SendRequest<'_>) -> SendAttempt {
            SendAttempt::delivered(200)
        }
    }

    struct Silent;

    #[async_trait]
    impl LivenessRegistrar for Silent {
        async fn register_watchdog(&self, _name: &str) -> Result<()> {
            Ok(())
        }

        async fn still_running(&self, _name: &str, _w: Duration, _e: Duration) -> Result<()> {
            Ok(())
        }

        fn check_max_time(&self, _a: &str, _c: &str, _el: Duration, _w: Duration, _e: Duration) {}
    }

    fn builder() -> DeferredQueueBuilder<()> {
        DeferredQueue::builder(Arc::new(AlwaysDelivered), Arc::new(Silent))
    }

    #[test]
    fn spawn_outside_runtime_fails() {
        let err = builder().agent_name("zedagent").spawn().err();
        assert!(matches!(err, Some(DeferqError::Internal(_))));
    }

    #[tokio::test]
    async fn spawn_rejects_bad_input() {
        assert!(matches!(builder().spawn().err(), Some(DeferqError::InvalidInput(_))));

        let zero_backoff = TimerSettings { backoff_min: Duration::ZERO, ..TimerSettings::default() };
        let err = builder().agent_name("a").timer_settings(zero_backoff).spawn().err();
        assert!(matches!(err, Some(DeferqError::InvalidInput(_))));

        let err = builder().agent_name("a").still_running_interval(Duration::ZERO).spawn().err();
        assert!(matches!(err, Some(DeferqError::InvalidInput(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn upsert_and_remove_drive_timer_regime() {
        let queue = builder().agent_name("zedagent").spawn().unwrap();
        assert_eq!(queue.timer_regime(), Regime::Dormant);

        // Remove on an empty store keeps the timer parked
        queue.remove_deferred("missing");
        assert_eq!(queue.timer_regime(), Regime::Dormant);

        queue.shared.store.lock().upsert(DeferredItem::new("a", b"x".to_vec(), "d", ()));
        queue.shared.timer.activate();
        assert_eq!(queue.timer_regime(), Regime::Active);

        queue.remove_deferred("a");
        assert_eq!(queue.timer_regime(), Regime::Dormant);
        assert_eq!(queue.metrics().removals, 1);

        queue.shutdown().await.unwrap();
        assert!(!queue.is_running());
    }

    #[test]
    fn watchdog_name_concatenates() {
        let liveness = Liveness {
            registrar: Arc::new(Silent),
            agent_name: "zedagent".into(),
            context_name: "metrics".into(),
            warning_time: Duration::from_secs(1),
            error_time: Duration::from_secs(2),
            still_running_interval: Duration::from_secs(3),
        };
        assert_eq!(liveness.watchdog_name(), "zedagentmetrics");
    }
}
