//! Parallel trial aggregator.
//!
//! Runs a batch of independent simulation trials on tokio's blocking pool,
//! at most `concurrency` at a time, tallies their outcomes into a shared
//! lock-free [`Tally`], and publishes progress as trials settle. A failing
//! or panicking trial is logged and left out of the tally; the batch keeps
//! going. `run` returns only after every submitted trial has settled.
//!
//! Progress and cancellation belong to one batch: each run consumes its own
//! [`BatchControl`], so concurrent batches on one aggregator never share a
//! progress channel or a cancel flag.

use chrono::Utc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::engine::progress::{ProgressReporter, ProgressWatcher};
use crate::engine::tally::Tally;
use crate::simulation::{Simulator, TrialContext};
use crate::types::{AutoResolveError, BatchReport, BatchRequest};

// ---------------------------------------------------------------------------
// Per-batch control
// ---------------------------------------------------------------------------

/// Cooperative stop signal for one batch.
///
/// Checked before each trial is submitted; trials already running finish
/// normally.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle {
    flag: Arc<AtomicBool>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}

/// Progress channel and cancel flag of a single batch.
///
/// Hand out watchers and cancel handles first, then pass the control to
/// [`TrialAggregator::run_with`], which consumes it. Not `Clone`: one
/// control drives exactly one batch.
#[derive(Debug, Default)]
pub struct BatchControl {
    progress: Arc<ProgressReporter>,
    cancel: CancelHandle,
}

impl BatchControl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> ProgressWatcher {
        self.progress.subscribe()
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }
}

// ---------------------------------------------------------------------------
// Aggregator
// ---------------------------------------------------------------------------

pub struct TrialAggregator<S: Simulator> {
    simulator: Arc<S>,
}

impl<S: Simulator> TrialAggregator<S> {
    pub fn new(simulator: S) -> Self {
        Self::from_shared(Arc::new(simulator))
    }

    pub fn from_shared(simulator: Arc<S>) -> Self {
        Self { simulator }
    }

    /// Run a batch nobody watches or cancels.
    pub async fn run(&self, request: BatchRequest<S::Params>) -> BatchReport {
        self.run_with(request, BatchControl::new()).await
    }

    /// Run every trial of `request` and return the aggregated report,
    /// publishing progress to and honouring cancellation from `control`.
    ///
    /// A trial count of zero returns an empty report without invoking the
    /// simulator. Only returns once all submitted trials have settled.
    pub async fn run_with(
        &self,
        request: BatchRequest<S::Params>,
        control: BatchControl,
    ) -> BatchReport {
        let batch_id = Uuid::new_v4();
        let started_at = Utc::now();
        let clock = Instant::now();
        let total = request.trial_count;
        let workers = request.concurrency.max(1);
        let tally = Arc::new(Tally::new());
        let BatchControl { progress, cancel } = control;

        progress.reset(total);

        if total == 0 {
            info!(%batch_id, "Empty batch requested, nothing to simulate");
        } else {
            info!(
                %batch_id,
                trials = total,
                workers,
                seeded = request.seed.is_some(),
                "Starting batch"
            );
        }

        let request = request.share();
        let mut in_flight = JoinSet::new();
        let mut cancelled = false;

        for index in 0..total {
            // Keep at most `workers` trials alive; reap one before submitting.
            if in_flight.len() >= workers {
                if let Some(joined) = in_flight.join_next().await {
                    settle(joined, &tally, &progress, total);
                }
            }

            if cancel.is_cancelled() {
                let skipped = total - index;
                tally.record_skipped(skipped);
                warn!(%batch_id, submitted = index, skipped, "Batch cancelled, abandoning remaining trials");
                cancelled = true;
                break;
            }

            let ctx = TrialContext {
                index,
                seed: request.trial_seed(index),
            };
            let simulator = Arc::clone(&self.simulator);
            let params = Arc::clone(&request.params);
            let tally = Arc::clone(&tally);
            let progress = Arc::clone(&progress);

            in_flight.spawn_blocking(move || {
                match simulator.run_trial(&params, ctx) {
                    Ok(outcome) => {
                        tally.record(outcome);
                        debug!(trial = ctx.index, %outcome, "Trial complete");
                    }
                    Err(e) => {
                        tally.record_failure();
                        warn!(trial = ctx.index, error = %e, "Trial failed");
                    }
                }
                progress.publish(tally.progress(total));
            });
        }

        while let Some(joined) = in_flight.join_next().await {
            settle(joined, &tally, &progress, total);
        }

        let score = tally.snapshot();
        progress.finish(tally.progress(total));

        let elapsed_ms = clock.elapsed().as_millis() as u64;
        let report = BatchReport {
            batch_id,
            requested: total,
            score,
            failed: tally.failed(),
            skipped: tally.skipped(),
            cancelled,
            workers,
            started_at,
            finished_at: Utc::now(),
            elapsed_ms,
            time_per_run_ms: BatchReport::time_per_run(elapsed_ms, total, workers),
        };

        if total > 0 {
            info!(
                %batch_id,
                wins = score.wins,
                losses = score.losses,
                draws = score.draws,
                completed = score.completed,
                failed = report.failed,
                skipped = report.skipped,
                elapsed_ms,
                time_per_run_ms = format!("{:.2}", report.time_per_run_ms),
                "Batch complete"
            );
        }
        if total > 0 && !report.has_results() {
            warn!(%batch_id, "No trial produced a result");
        }

        report
    }

    /// Blocking wrapper around [`run`](Self::run) for callers without a
    /// tokio runtime. Must not be called from inside one.
    pub fn run_blocking(
        &self,
        request: BatchRequest<S::Params>,
    ) -> Result<BatchReport, AutoResolveError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| AutoResolveError::Runtime(e.to_string()))?;
        Ok(runtime.block_on(self.run(request)))
    }
}

/// Account for a joined worker. Panicked workers never reached the
/// tally, so they are counted as failures here.
fn settle(joined: Result<(), JoinError>, tally: &Tally, progress: &ProgressReporter, total: u64) {
    if let Err(e) = joined {
        tally.record_failure();
        if e.is_panic() {
            warn!(error = %e, "Trial panicked");
        } else {
            warn!(error = %e, "Trial task aborted");
        }
        progress.publish(tally.progress(total));
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
