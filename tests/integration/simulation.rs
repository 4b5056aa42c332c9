//! Batch-level properties of the parallel aggregator.
//!
//! Runs full batches through `TrialAggregator` with scripted and real
//! skirmish simulators and checks the tally invariants, failure
//! handling, progress behaviour, and reproducibility.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tokio_test::{assert_err, assert_ok};

use autoresolve::engine::aggregator::{BatchControl, TrialAggregator};
use autoresolve::simulation::skirmish::{Skirmish, SkirmishSimulator};
use autoresolve::types::{AutoResolveError, BatchRequest};

use crate::mock_simulator::{Script, ScriptedSimulator};

fn aggregator(script: Script) -> (Arc<ScriptedSimulator>, TrialAggregator<ScriptedSimulator>) {
    let sim = Arc::new(ScriptedSimulator::new(script));
    let agg = TrialAggregator::from_shared(Arc::clone(&sim));
    (sim, agg)
}

#[tokio::test]
async fn test_tally_invariant_for_various_sizes() {
    for n in [0u64, 1, 2, 7, 64, 257] {
        let (sim, agg) = aggregator(Script::default());
        let report = agg.run(BatchRequest::new(n, ()).with_concurrency(4)).await;

        let s = report.score;
        assert_eq!(s.wins + s.losses + s.draws, s.completed, "n={n}");
        assert!(s.completed <= n, "n={n}");
        assert_eq!(s.completed, n, "n={n}");
        assert_eq!(sim.calls(), n);
    }
}

#[tokio::test]
async fn test_every_trial_runs_exactly_once() {
    let (sim, agg) = aggregator(Script::default());
    agg.run(BatchRequest::new(500, ()).with_concurrency(8)).await;
    assert_eq!(sim.calls(), 500);
    assert_eq!(sim.distinct_indices(), 500);
}

#[tokio::test]
async fn test_no_lost_counts_under_jittered_scheduling() {
    // Random slow/fast interleavings, repeated: the count must never drift.
    for round in 0..5 {
        let (_, agg) = aggregator(Script {
            max_latency: Duration::from_millis(3),
            ..Script::default()
        });
        let report = agg.run(BatchRequest::new(120, ()).with_concurrency(6)).await;
        assert_eq!(report.score.completed, 120, "round {round}");
        assert!(report.score.is_consistent());
    }
}

#[tokio::test]
async fn test_all_failures_surface_no_results() {
    let (_, agg) = aggregator(Script {
        failure_rate: 1.0,
        ..Script::default()
    });
    let report = agg.run(BatchRequest::new(40, ()).with_concurrency(4)).await;

    assert_eq!(report.score.completed, 0);
    assert_eq!(report.failed, 40);
    assert_eq!(report.win_percentage(), None);
    assert_err!(report.summary());
    assert!(matches!(
        report.summary(),
        Err(AutoResolveError::NoResults { requested: 40, failed: 40 })
    ));
}

#[tokio::test]
async fn test_partial_failures_and_panics_are_tolerated() {
    let (_, agg) = aggregator(Script {
        failure_rate: 0.3,
        panic_on: HashSet::from([5, 17, 99]),
        ..Script::default()
    });
    let report = agg
        .run(BatchRequest::new(200, ()).with_concurrency(4).with_seed(11))
        .await;

    assert!(report.failed >= 3);
    assert_eq!(report.score.completed + report.failed, 200);
    assert!(report.score.is_consistent());
    assert_ok!(report.summary());
}

#[tokio::test]
async fn test_progress_is_monotonic_and_bounded() {
    let (_, agg) = aggregator(Script {
        max_latency: Duration::from_millis(1),
        failure_rate: 0.1,
        ..Script::default()
    });
    let control = BatchControl::new();
    let mut watcher = control.subscribe();

    let observer = tokio::spawn(async move {
        let mut seen = Vec::new();
        while let Some(p) = watcher.changed().await {
            seen.push(p);
            if p.is_finished() && p.total == 150 {
                break;
            }
        }
        seen
    });

    let report = agg
        .run_with(
            BatchRequest::new(150, ()).with_concurrency(4).with_seed(3),
            control,
        )
        .await;
    let seen = observer.await.unwrap();

    let mut last = 0.0;
    for p in seen.iter().filter(|p| p.total == 150) {
        let f = p.fraction();
        assert!((0.0..=1.0).contains(&f));
        assert!(f >= last, "progress went backwards: {last} -> {f}");
        last = f;
    }
    let expected = report.score.completed as f64 / 150.0;
    assert_eq!(last, expected);
}

#[tokio::test]
async fn test_seeded_skirmish_batches_are_reproducible() {
    let agg = TrialAggregator::new(SkirmishSimulator);
    let request = || {
        BatchRequest::new(300, Skirmish::sample())
            .with_concurrency(4)
            .with_seed(2024)
    };

    let first = agg.run(request()).await;
    let second = agg.run(request()).await;

    assert_eq!(first.score, second.score);
    assert_eq!(first.score.completed, 300);
    assert_ne!(first.batch_id, second.batch_id);
}

#[tokio::test]
async fn test_invalid_skirmish_produces_no_results() {
    let mut scenario = Skirmish::sample();
    scenario.player.clear();

    let agg = TrialAggregator::new(SkirmishSimulator);
    let report = agg.run(BatchRequest::new(10, scenario).with_concurrency(2)).await;

    assert_eq!(report.failed, 10);
    assert!(report.summary().is_err());
}

#[tokio::test]
async fn test_sample_skirmish_is_contested() {
    // Evenly matched lances: neither side should win every battle.
    let agg = TrialAggregator::new(SkirmishSimulator);
    let report = agg
        .run(BatchRequest::new(2_000, Skirmish::sample()).with_seed(7))
        .await;

    let pct = report.win_percentage().unwrap();
    assert!(pct > 5.0 && pct < 95.0, "win pct {pct}");
}
