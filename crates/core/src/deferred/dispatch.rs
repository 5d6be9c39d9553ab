//! Dispatch round
//!
//! One round walks the batch once per priority predicate, in store order,
//! and attempts every item the predicate accepts. A failure that is not
//! ignored halts the whole round; everything not delivered by then is handed
//! back for requeueing.

use std::sync::atomic::{AtomicU64, Ordering};

use deferq_domain::{SendAttempt, SenderStatus, TracedRequest};
use tracing::{debug, info};

use super::item::DeferredItem;
use super::metrics::DeferredMetrics;
use super::ports::{PriorityCheck, SendRequest, SentHandler, Transmitter};

/// How an attempt turned out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// 4xx/5xx on an item that bails on HTTP errors; final, counts as sent
    TerminalAccepted,
    /// The transport reported an error
    Failure,
    /// No error, but the status is not `None`
    Unexpected,
    Success,
}

impl Verdict {
    pub fn is_failure(self) -> bool {
        matches!(self, Self::Failure | Self::Unexpected)
    }
}

/// Verdict plus the status reported to the completion handler
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub verdict: Verdict,
    pub status: SenderStatus,
}

impl Classification {
    /// Whether this outcome stops the round for an item with the given
    /// `ignore_errors` flag.
    pub fn halts(&self, ignore_errors: bool) -> bool {
        self.verdict.is_failure() && !ignore_errors
    }
}

/// Classify an attempt. The HTTP code check comes first so that a message
/// the controller rejected does not stop the round.
pub fn classify(bail_on_http_error: bool, attempt: &SendAttempt) -> Classification {
    let status = attempt.outcome.status;

    if bail_on_http_error && attempt.outcome.is_client_or_server_error() {
        return Classification { verdict: Verdict::TerminalAccepted, status };
    }
    if attempt.is_error() {
        let status = if status.is_none() { SenderStatus::Failed } else { status };
        return Classification { verdict: Verdict::Failure, status };
    }
    if !status.is_none() {
        return Classification { verdict: Verdict::Unexpected, status };
    }
    Classification { verdict: Verdict::Success, status }
}

/// Per-item state within a round
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Pending,
    /// Delivered, terminally accepted, or failed with errors ignored
    Disposed,
    /// Empty payload, skipped
    Empty,
}

/// Collaborators a round needs
pub struct RoundContext<'a, C> {
    pub transmitter: &'a dyn Transmitter,
    pub predicates: &'a [PriorityCheck<C>],
    pub sent_handler: Option<&'a SentHandler<C>>,
    pub iteration: &'a AtomicU64,
    pub metrics: &'a DeferredMetrics,
}

/// What a round left behind
#[derive(Debug)]
pub struct RoundOutcome<C> {
    pub not_sent: Vec<DeferredItem<C>>,
    pub attempted: usize,
    pub sent: usize,
    pub halted: bool,
}

impl<C> RoundOutcome<C> {
    pub fn all_sent(&self) -> bool {
        self.not_sent.is_empty()
    }
}

/// Run one round over `batch`.
///
/// If nothing at all was sent the whole batch comes back, empty items
/// included. Otherwise only the items still pending come back.
pub async fn run_round<C>(ctx: &RoundContext<'_, C>, batch: Vec<DeferredItem<C>>) -> RoundOutcome<C>
where
    C: Send + Sync,
{
    if batch.is_empty() {
        return RoundOutcome { not_sent: batch, attempted: 0, sent: 0, halted: false };
    }

    debug!(items = batch.len(), "handling deferred items");

    let mut slots = vec![Slot::Pending; batch.len()];
    let mut attempted = 0usize;
    let mut sent = 0usize;
    let mut halted = false;

    'round: for check in ctx.predicates {
        for (idx, item) in batch.iter().enumerate() {
            if !check(&item.classifier) || slots[idx] == Slot::Disposed {
                continue;
            }
            debug!(key = %item.key, "trying to send deferred item");
            if !item.has_payload() {
                debug!(key = %item.key, "zero length deferred item");
                slots[idx] = Slot::Empty;
                continue;
            }

            let iteration = ctx.iteration.load(Ordering::Relaxed);
            let attempt = ctx
                .transmitter
                .send(SendRequest {
                    destination: &item.destination,
                    payload: &item.payload,
                    size: item.size,
                    iteration,
                    bail_on_http_error: item.bail_on_http_error,
                    with_net_tracing: item.with_net_tracing,
                })
                .await;
            ctx.metrics.record_attempt();
            attempted += 1;

            let classification = classify(item.bail_on_http_error, &attempt);
            log_outcome(item, &attempt, &classification);
            if classification.verdict.is_failure() {
                ctx.metrics.record_failure();
            }

            if let Some(handler) = ctx.sent_handler {
                handler(&item.classifier, &item.payload, classification.status, &attempt.outcome.traces);
            }

            // Next attempt starts on another interface
            ctx.iteration.fetch_add(1, Ordering::Relaxed);

            if classification.halts(item.ignore_errors) {
                halted = true;
                break 'round;
            }
            slots[idx] = Slot::Disposed;
            sent += 1;
            ctx.metrics.record_sent();
        }
    }

    let not_sent: Vec<DeferredItem<C>> = if sent == 0 {
        batch
    } else {
        batch
            .into_iter()
            .zip(slots)
            .filter(|(_, slot)| *slot == Slot::Pending)
            .map(|(item, _)| item)
            .collect()
    };

    if !not_sent.is_empty() {
        info!(remaining = not_sent.len(), "deferred items left to be sent");
        if let Some(handler) = ctx.sent_handler {
            let no_traces: &[TracedRequest] = &[];
            for item in &not_sent {
                handler(&item.classifier, &item.payload, SenderStatus::Debug, no_traces);
            }
        }
    }

    RoundOutcome { not_sent, attempted, sent, halted }
}

fn log_outcome<C>(item: &DeferredItem<C>, attempt: &SendAttempt, classification: &Classification) {
    match classification.verdict {
        Verdict::TerminalAccepted => debug!(
            key = %item.key,
            http_status = attempt.outcome.http_status.unwrap_or_default(),
            "ignoring controller answer"
        ),
        Verdict::Failure => debug!(
            key = %item.key,
            status = %classification.status,
            error = %attempt.error.as_ref().map(ToString::to_string).unwrap_or_default(),
            "deferred send failed"
        ),
        Verdict::Unexpected => debug!(
            key = %item.key,
            status = %classification.status,
            "deferred send received unexpected status"
        ),
        Verdict::Success => debug!(key = %item.key, "deferred item sent"),
    }
}
