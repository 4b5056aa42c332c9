//! Shared outcome counters for a running batch.
//!
//! Every worker records into the same [`Tally`] through atomic
//! fetch-and-add, so concurrent completions never lose or duplicate a
//! count. No locking, no allocation on the hot path.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::engine::progress::Progress;
use crate::types::{AggregateScore, TrialOutcome};

/// Lock-free win/loss/draw counters plus failure diagnostics.
#[derive(Debug, Default)]
pub struct Tally {
    wins: AtomicU64,
    losses: AtomicU64,
    draws: AtomicU64,
    completed: AtomicU64,
    failed: AtomicU64,
    skipped: AtomicU64,
}

impl Tally {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one successful trial. Returns the completed count including it.
    pub fn record(&self, outcome: TrialOutcome) -> u64 {
        let counter = match outcome {
            TrialOutcome::Win => &self.wins,
            TrialOutcome::Loss => &self.losses,
            TrialOutcome::Draw => &self.draws,
        };
        // Outcome first: a reader never sees `completed` ahead of the outcomes.
        counter.fetch_add(1, Ordering::AcqRel);
        self.completed.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Count one trial that errored or panicked.
    pub fn record_failure(&self) -> u64 {
        self.failed.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Count trials abandoned before they started.
    pub fn record_skipped(&self, n: u64) {
        self.skipped.fetch_add(n, Ordering::AcqRel);
    }

    pub fn completed(&self) -> u64 {
        self.completed.load(Ordering::Acquire)
    }

    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Acquire)
    }

    pub fn skipped(&self) -> u64 {
        self.skipped.load(Ordering::Acquire)
    }

    /// Consistent view of the outcome counters.
    ///
    /// `completed` is derived from the three outcome loads, so the snapshot
    /// satisfies `wins + losses + draws == completed` even while workers
    /// are still recording.
    pub fn snapshot(&self) -> AggregateScore {
        AggregateScore::from_counts(
            self.wins.load(Ordering::Acquire),
            self.losses.load(Ordering::Acquire),
            self.draws.load(Ordering::Acquire),
        )
    }

    /// Progress view for a batch of `total` trials.
    pub fn progress(&self, total: u64) -> Progress {
        Progress {
            total,
            completed: self.completed(),
            failed: self.failed(),
            skipped: self.skipped(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_record_each_outcome() {
        let tally = Tally::new();
        assert_eq!(tally.record(TrialOutcome::Win), 1);
        assert_eq!(tally.record(TrialOutcome::Loss), 2);
        assert_eq!(tally.record(TrialOutcome::Draw), 3);
        assert_eq!(tally.snapshot(), AggregateScore::from_counts(1, 1, 1));
    }

    #[test]
    fn test_failures_do_not_touch_outcomes() {
        let tally = Tally::new();
        tally.record_failure();
        tally.record_failure();
        tally.record_skipped(5);
        let score = tally.snapshot();
        assert_eq!(score.completed, 0);
        assert_eq!(tally.failed(), 2);
        assert_eq!(tally.skipped(), 5);
    }

    #[test]
    fn test_progress_view() {
        let tally = Tally::new();
        tally.record(TrialOutcome::Win);
        tally.record_failure();
        let p = tally.progress(4);
        assert_eq!(p.total, 4);
        assert_eq!(p.completed, 1);
        assert_eq!(p.failed, 1);
        assert_eq!(p.fraction(), 0.25);
    }

    #[test]
    fn test_concurrent_recording_loses_nothing() {
        let tally = Arc::new(Tally::new());
        let threads: Vec<_> = (0..8u64)
            .map(|t| {
                let tally = Arc::clone(&tally);
                std::thread::spawn(move || {
                    for i in 0..1_000u64 {
                        let outcome = match (t + i) % 3 {
                            0 => TrialOutcome::Win,
                            1 => TrialOutcome::Loss,
                            _ => TrialOutcome::Draw,
                        };
                        tally.record(outcome);
                    }
                })
            })
            .collect();
        for t in threads {
            t.join().unwrap();
        }

        let score = tally.snapshot();
        assert_eq!(score.completed, 8_000);
        assert_eq!(tally.completed(), 8_000);
        assert!(score.is_consistent());
    }
}
