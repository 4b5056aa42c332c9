//! Integration test target: batch properties over scripted simulators.

mod mock_simulator;
mod simulation;
