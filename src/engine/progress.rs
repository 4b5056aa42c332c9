//! Progress publication for running batches.
//!
//! The aggregator pushes [`Progress`] snapshots into a `tokio::sync::watch`
//! channel; any number of [`ProgressWatcher`]s (a CLI logger, the
//! dashboard, a test) observe the latest value. Intermediate values may be
//! coalesced, but the published value never moves backwards within a batch.

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

/// Counters describing how far a batch has got.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    pub total: u64,
    pub completed: u64,
    pub failed: u64,
    pub skipped: u64,
}

impl Progress {
    pub fn new(total: u64) -> Self {
        Self {
            total,
            ..Self::default()
        }
    }

    /// `completed / total` in [0, 1]. An empty batch counts as done.
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            return 1.0;
        }
        (self.completed as f64 / self.total as f64).min(1.0)
    }

    /// Trials that have reached a final state, successful or not.
    pub fn settled(&self) -> u64 {
        self.completed + self.failed + self.skipped
    }

    pub fn is_finished(&self) -> bool {
        self.settled() >= self.total
    }

    /// Move each counter forward to `next` where it is ahead.
    /// Returns whether anything changed.
    fn advance_to(&mut self, next: &Progress) -> bool {
        let before = *self;
        self.completed = self.completed.max(next.completed);
        self.failed = self.failed.max(next.failed);
        self.skipped = self.skipped.max(next.skipped);
        *self != before
    }
}

// ---------------------------------------------------------------------------
// Publisher
// ---------------------------------------------------------------------------

/// Sending half, owned by the aggregator and shared with its workers.
#[derive(Debug)]
pub struct ProgressReporter {
    tx: watch::Sender<Progress>,
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressReporter {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(Progress::default());
        Self { tx }
    }

    pub fn subscribe(&self) -> ProgressWatcher {
        ProgressWatcher {
            rx: self.tx.subscribe(),
        }
    }

    /// Start a new batch of `total` trials.
    pub fn reset(&self, total: u64) {
        self.tx.send_replace(Progress::new(total));
    }

    /// Publish a snapshot. Stale snapshots (from a worker that lost the
    /// race to a faster one) are ignored. Returns whether watchers were
    /// notified.
    pub fn publish(&self, next: Progress) -> bool {
        self.tx.send_if_modified(|current| current.advance_to(&next))
    }

    /// Publish the final snapshot of a batch and always notify watchers.
    pub fn finish(&self, last: Progress) {
        self.tx.send_modify(|current| {
            current.advance_to(&last);
        });
    }

    pub fn latest(&self) -> Progress {
        *self.tx.borrow()
    }
}

// ---------------------------------------------------------------------------
// Subscriber
// ---------------------------------------------------------------------------

/// Receiving half handed to whoever drives a progress indicator.
#[derive(Debug, Clone)]
pub struct ProgressWatcher {
    rx: watch::Receiver<Progress>,
}

impl ProgressWatcher {
    /// Most recent value without waiting.
    pub fn latest(&self) -> Progress {
        *self.rx.borrow()
    }

    /// Wait for the next published value. `None` once the reporter is gone.
    pub async fn changed(&mut self) -> Option<Progress> {
        self.rx.changed().await.ok()?;
        Some(*self.rx.borrow_and_update())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn progress(total: u64, completed: u64, failed: u64) -> Progress {
        Progress {
            total,
            completed,
            failed,
            skipped: 0,
        }
    }

    #[test]
    fn test_fraction_bounds() {
        assert_eq!(Progress::new(0).fraction(), 1.0);
        assert_eq!(progress(4, 0, 0).fraction(), 0.0);
        assert_eq!(progress(4, 2, 0).fraction(), 0.5);
        assert_eq!(progress(4, 4, 0).fraction(), 1.0);
    }

    #[test]
    fn test_finished_counts_failures() {
        assert!(!progress(4, 2, 1).is_finished());
        assert!(progress(4, 2, 2).is_finished());
    }

    #[test]
    fn test_publish_ignores_stale_values() {
        let reporter = ProgressReporter::new();
        reporter.reset(10);
        assert!(reporter.publish(progress(10, 6, 0)));
        assert!(!reporter.publish(progress(10, 5, 0)));
        assert_eq!(reporter.latest().completed, 6);
    }

    #[test]
    fn test_publish_merges_counters() {
        let reporter = ProgressReporter::new();
        reporter.reset(10);
        reporter.publish(progress(10, 3, 0));
        reporter.publish(progress(10, 2, 1));
        let latest = reporter.latest();
        assert_eq!(latest.completed, 3);
        assert_eq!(latest.failed, 1);
    }

    #[test]
    fn test_reset_starts_over() {
        let reporter = ProgressReporter::new();
        reporter.reset(10);
        reporter.publish(progress(10, 10, 0));
        reporter.reset(3);
        assert_eq!(reporter.latest(), Progress::new(3));
    }

    #[tokio::test]
    async fn test_watcher_sees_updates() {
        let reporter = ProgressReporter::new();
        let mut watcher = reporter.subscribe();
        reporter.reset(2);
        reporter.publish(progress(2, 1, 0));

        let seen = watcher.changed().await.unwrap();
        assert_eq!(seen.completed, 1);
        assert_eq!(watcher.latest().fraction(), 0.5);
    }

    #[tokio::test]
    async fn test_watcher_ends_when_reporter_dropped() {
        let reporter = ProgressReporter::new();
        let mut watcher = reporter.subscribe();
        drop(reporter);
        assert!(watcher.changed().await.is_none());
    }
}
