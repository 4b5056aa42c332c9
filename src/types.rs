//! Shared types for the AUTORESOLVE estimator.
//!
//! These types form the data model used across all modules: the
//! categorical trial outcome, the aggregate score, the batch request
//! handed to the aggregator and the report it hands back.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Trial outcome
// ---------------------------------------------------------------------------

/// Result of one simulated battle, from the point of view of the player side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TrialOutcome {
    Win,
    Loss,
    Draw,
}

impl fmt::Display for TrialOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrialOutcome::Win => write!(f, "WIN"),
            TrialOutcome::Loss => write!(f, "LOSS"),
            TrialOutcome::Draw => write!(f, "DRAW"),
        }
    }
}

// ---------------------------------------------------------------------------
// Aggregate score
// ---------------------------------------------------------------------------

/// Point-in-time view of the outcome counters of a batch.
///
/// `wins + losses + draws == completed` always holds for a snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateScore {
    pub wins: u64,
    pub losses: u64,
    pub draws: u64,
    pub completed: u64,
}

impl AggregateScore {
    /// Build a score from outcome counts; `completed` is their sum.
    pub fn from_counts(wins: u64, losses: u64, draws: u64) -> Self {
        Self {
            wins,
            losses,
            draws,
            completed: wins + losses + draws,
        }
    }

    pub fn count(&self, outcome: TrialOutcome) -> u64 {
        match outcome {
            TrialOutcome::Win => self.wins,
            TrialOutcome::Loss => self.losses,
            TrialOutcome::Draw => self.draws,
        }
    }

    /// `wins * 100 / completed`, or `None` when nothing completed.
    pub fn win_percentage(&self) -> Option<f64> {
        self.percentage_of(TrialOutcome::Win)
    }

    pub fn percentage_of(&self, outcome: TrialOutcome) -> Option<f64> {
        if self.completed == 0 {
            return None;
        }
        Some(self.count(outcome) as f64 * 100.0 / self.completed as f64)
    }

    /// Whether the outcome counters add up to `completed`.
    pub fn is_consistent(&self) -> bool {
        self.wins + self.losses + self.draws == self.completed
    }
}

impl fmt::Display for AggregateScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "W{}/L{}/D{} ({} completed)",
            self.wins, self.losses, self.draws, self.completed
        )
    }
}

// ---------------------------------------------------------------------------
// Batch request
// ---------------------------------------------------------------------------

/// Number of workers to use when the caller does not specify one.
pub fn default_concurrency() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// Immutable input to [`crate::engine::aggregator::TrialAggregator::run`].
#[derive(Debug, Clone)]
pub struct BatchRequest<P> {
    /// How many independent trials to run.
    pub trial_count: u64,
    /// Simulation parameters, opaque to the aggregator.
    pub params: P,
    /// Upper bound on trials running at the same time (at least 1).
    pub concurrency: usize,
    /// Base seed; trial `i` is seeded with `seed + i` (wrapping).
    pub seed: Option<u64>,
}

impl<P> BatchRequest<P> {
    pub fn new(trial_count: u64, params: P) -> Self {
        Self {
            trial_count,
            params,
            concurrency: default_concurrency(),
            seed: None,
        }
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Seed for trial `index`, if the batch is seeded.
    pub fn trial_seed(&self, index: u64) -> Option<u64> {
        self.seed.map(|s| s.wrapping_add(index))
    }

    /// Move the params behind an `Arc` so every worker can borrow them.
    pub fn share(self) -> BatchRequest<Arc<P>> {
        BatchRequest {
            trial_count: self.trial_count,
            params: Arc::new(self.params),
            concurrency: self.concurrency,
            seed: self.seed,
        }
    }
}

// ---------------------------------------------------------------------------
// Batch report
// ---------------------------------------------------------------------------

/// Final result of a batch, including diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    pub batch_id: Uuid,
    /// Trial count originally requested.
    pub requested: u64,
    pub score: AggregateScore,
    /// Trials that returned an error or panicked.
    pub failed: u64,
    /// Trials never started because the batch was cancelled.
    pub skipped: u64,
    pub cancelled: bool,
    pub workers: usize,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub elapsed_ms: u64,
    /// Elapsed time divided by the number of trial "waves" (`requested / workers`, floored at 1).
    pub time_per_run_ms: f64,
}

impl BatchReport {
    /// Time-per-run diagnostic: `elapsed / max(1, requested / workers)`.
    pub fn time_per_run(elapsed_ms: u64, requested: u64, workers: usize) -> f64 {
        let waves = (requested / workers.max(1) as u64).max(1);
        elapsed_ms as f64 / waves as f64
    }

    pub fn win_percentage(&self) -> Option<f64> {
        self.score.win_percentage()
    }

    /// Whether at least one trial produced an outcome.
    pub fn has_results(&self) -> bool {
        self.score.completed > 0
    }

    /// User-facing summary, or [`AutoResolveError::NoResults`] when no
    /// trial succeeded.
    pub fn summary(&self) -> Result<Summary, AutoResolveError> {
        if !self.has_results() {
            return Err(AutoResolveError::NoResults {
                requested: self.requested,
                failed: self.failed,
            });
        }
        let pct = |o| self.score.percentage_of(o).unwrap_or(0.0);
        Ok(Summary {
            completed: self.score.completed,
            requested: self.requested,
            win_pct: pct(TrialOutcome::Win),
            loss_pct: pct(TrialOutcome::Loss),
            draw_pct: pct(TrialOutcome::Draw),
        })
    }
}

impl fmt::Display for BatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "batch {} | {} of {} | failed={} skipped={} | workers={} | {}ms ({:.2}ms/run){}",
            self.batch_id,
            self.score,
            self.requested,
            self.failed,
            self.skipped,
            self.workers,
            self.elapsed_ms,
            self.time_per_run_ms,
            if self.cancelled { " | CANCELLED" } else { "" },
        )
    }
}

/// Win/loss/draw percentages of a batch that produced results.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Summary {
    pub completed: u64,
    pub requested: u64,
    pub win_pct: f64,
    pub loss_pct: f64,
    pub draw_pct: f64,
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Win {:.1}% | Loss {:.1}% | Draw {:.1}% ({} of {} simulations)",
            self.win_pct, self.loss_pct, self.draw_pct, self.completed, self.requested,
        )
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Domain-specific error types for AUTORESOLVE.
#[derive(Debug, thiserror::Error)]
pub enum AutoResolveError {
    #[error("Could not compute an auto-resolve chance: no simulation produced a result ({failed} of {requested} failed)")]
    NoResults { requested: u64, failed: u64 },

    #[error("Invalid scenario: {0}")]
    InvalidScenario(String),

    #[error("Runtime error: {0}")]
    Runtime(String),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
