use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};

use serde::{Deserialize, Serialize};

/// Deferred queue counters
#[derive(Debug, Default)]
pub struct DeferredMetrics {
    pub rounds: AtomicU64,
    pub attempts: AtomicU64,
    pub sent: AtomicU64,
    pub failed: AtomicU64,
    pub requeued: AtomicU64,
    pub upserts: AtomicU64,
    pub replacements: AtomicU64,
    pub removals: AtomicU64,
}

impl DeferredMetrics {
    /// Create new metrics instance
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a non-empty dispatch round
    pub fn record_round(&self) {
        self.rounds.fetch_add(1, AtomicOrdering::Relaxed);
    }

    /// Record one call into the transmitter
    pub fn record_attempt(&self) {
        self.attempts.fetch_add(1, AtomicOrdering::Relaxed);
    }

    /// Record an item that left the queue through a round
    pub fn record_sent(&self) {
        self.sent.fetch_add(1, AtomicOrdering::Relaxed);
    }

    /// Record a failed or unexpected outcome
    pub fn record_failure(&self) {
        self.failed.fetch_add(1, AtomicOrdering::Relaxed);
    }

    /// Record items written back after a round
    pub fn record_requeued(&self, count: usize) {
        self.requeued.fetch_add(count as u64, AtomicOrdering::Relaxed);
    }

    /// Record an upsert; `replaced` when an existing key was overwritten
    pub fn record_upsert(&self, replaced: bool) {
        self.upserts.fetch_add(1, AtomicOrdering::Relaxed);
        if replaced {
            self.replacements.fetch_add(1, AtomicOrdering::Relaxed);
        }
    }

    /// Record a remove that found its key
    pub fn record_removal(&self) {
        self.removals.fetch_add(1, AtomicOrdering::Relaxed);
    }

    /// Get a snapshot of metrics
    pub fn snapshot(&self, pending: usize) -> DeferredMetricsSnapshot {
        DeferredMetricsSnapshot {
            rounds: self.rounds.load(AtomicOrdering::Relaxed),
            attempts: self.attempts.load(AtomicOrdering::Relaxed),
            sent: self.sent.load(AtomicOrdering::Relaxed),
            failed: self.failed.load(AtomicOrdering::Relaxed),
            requeued: self.requeued.load(AtomicOrdering::Relaxed),
            upserts: self.upserts.load(AtomicOrdering::Relaxed),
            replacements: self.replacements.load(AtomicOrdering::Relaxed),
            removals: self.removals.load(AtomicOrdering::Relaxed),
            pending,
        }
    }
}

/// Point-in-time view of [`DeferredMetrics`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DeferredMetricsSnapshot {
    pub rounds: u64,
    pub attempts: u64,
    pub sent: u64,
    pub failed: u64,
    pub requeued: u64,
    pub upserts: u64,
    pub replacements: u64,
    pub removals: u64,
    pub pending: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_reflects_counters() {
        let metrics = DeferredMetrics::new();
        metrics.record_upsert(false);
        metrics.record_upsert(true);
        metrics.record_round();
        metrics.record_attempt();
        metrics.record_attempt();
        metrics.record_sent();
        metrics.record_failure();
        metrics.record_requeued(1);
        metrics.record_removal();

        let snapshot = metrics.snapshot(1);
        assert_eq!(
            snapshot,
            DeferredMetricsSnapshot {
                rounds: 1,
                attempts: 2,
                sent: 1,
                failed: 1,
                requeued: 1,
                upserts: 2,
                replacements: 1,
                removals: 1,
                pending: 1,
            }
        );

        let json = serde_json::to_value(snapshot).unwrap();
        assert_eq!(json["replacements"], 1);
    }
}
