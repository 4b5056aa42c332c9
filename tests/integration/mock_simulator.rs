//! Scripted simulator for integration testing.
//!
//! Provides a deterministic-per-seed `Simulator` implementation with
//! controllable outcome mix, failure rate, panics, and artificial
//! latency, and records how it was called. All state is in-memory.

use anyhow::{bail, Result};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use autoresolve::simulation::{Simulator, TrialContext};
use autoresolve::types::TrialOutcome;

/// How a scripted trial behaves.
#[derive(Debug, Clone)]
pub struct Script {
    /// Relative weights of WIN / LOSS / DRAW.
    pub weights: [u32; 3],
    /// Probability in [0, 1] that a trial returns an error.
    pub failure_rate: f64,
    /// Trial indices that panic instead of returning.
    pub panic_on: HashSet<u64>,
    /// Upper bound on the random per-trial sleep.
    pub max_latency: Duration,
}

impl Default for Script {
    fn default() -> Self {
        Self {
            weights: [1, 1, 1],
            failure_rate: 0.0,
            panic_on: HashSet::new(),
            max_latency: Duration::ZERO,
        }
    }
}

/// A mock simulator whose behaviour is fully controlled by a [`Script`].
pub struct ScriptedSimulator {
    script: Script,
    calls: AtomicU64,
    seen: Mutex<HashSet<u64>>,
}

impl ScriptedSimulator {
    pub fn new(script: Script) -> Self {
        Self {
            script,
            calls: AtomicU64::new(0),
            seen: Mutex::new(HashSet::new()),
        }
    }

    /// Number of times `run_trial` was entered.
    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }

    /// Distinct trial indices that were run.
    pub fn distinct_indices(&self) -> usize {
        self.seen.lock().unwrap().len()
    }
}

impl Simulator for ScriptedSimulator {
    type Params = ();

    fn run_trial(&self, _params: &(), ctx: TrialContext) -> Result<TrialOutcome> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().insert(ctx.index);

        let mut rng = match ctx.seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_entropy(),
        };

        if !self.script.max_latency.is_zero() {
            let micros = rng.gen_range(0..=self.script.max_latency.as_micros() as u64);
            std::thread::sleep(Duration::from_micros(micros));
        }

        if self.script.panic_on.contains(&ctx.index) {
            panic!("scripted panic on trial {}", ctx.index);
        }
        if rng.gen_bool(self.script.failure_rate) {
            bail!("scripted failure on trial {}", ctx.index);
        }

        let [w, l, d] = self.script.weights;
        let roll = rng.gen_range(0..(w + l + d).max(1));
        Ok(if roll < w {
            TrialOutcome::Win
        } else if roll < w + l {
            TrialOutcome::Loss
        } else {
            TrialOutcome::Draw
        })
    }
}
