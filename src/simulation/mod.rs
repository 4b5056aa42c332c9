//! Simulation collaborators.
//!
//! Defines the `Simulator` trait the aggregator drives, plus the
//! reference skirmish model used by the batch driver.

pub mod skirmish;

use anyhow::Result;
use std::marker::PhantomData;

use crate::types::TrialOutcome;

/// Per-trial information handed to the simulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrialContext {
    /// Position of the trial within its batch (0-based).
    pub index: u64,
    /// Deterministic seed when the batch is seeded.
    pub seed: Option<u64>,
}

/// Runs one independent trial and classifies it.
///
/// Implementations must be side-effect free with respect to other trials:
/// the aggregator calls `run_trial` from many worker threads at once, in
/// no particular order. Returning an error (or panicking) marks only that
/// trial as failed.
pub trait Simulator: Send + Sync + 'static {
    /// Scenario parameters. Opaque to the aggregator.
    type Params: Send + Sync + 'static;

    fn run_trial(&self, params: &Self::Params, ctx: TrialContext) -> Result<TrialOutcome>;
}

/// Adapter turning a closure into a [`Simulator`].
pub struct FnSimulator<P, F> {
    f: F,
    _params: PhantomData<fn(&P)>,
}

/// Wrap `f` as a simulator over parameters of type `P`.
pub fn from_fn<P, F>(f: F) -> FnSimulator<P, F>
where
    P: Send + Sync + 'static,
    F: Fn(&P, TrialContext) -> Result<TrialOutcome> + Send + Sync + 'static,
{
    FnSimulator {
        f,
        _params: PhantomData,
    }
}

impl<P, F> Simulator for FnSimulator<P, F>
where
    P: Send + Sync + 'static,
    F: Fn(&P, TrialContext) -> Result<TrialOutcome> + Send + Sync + 'static,
{
    type Params = P;

    fn run_trial(&self, params: &P, ctx: TrialContext) -> Result<TrialOutcome> {
        (self.f)(params, ctx)
    }
}
