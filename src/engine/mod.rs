//! Core engine — parallel trial execution, tallying, and progress.

pub mod aggregator;
pub mod progress;
pub mod tally;

pub use aggregator::{BatchControl, CancelHandle, TrialAggregator};
pub use progress::{Progress, ProgressReporter, ProgressWatcher};
pub use tally::Tally;
