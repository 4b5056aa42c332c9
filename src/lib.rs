//! AUTORESOLVE — parallel Monte Carlo auto-resolve chance estimator.
//!
//! Library crate exposing all modules for use by integration tests
//! and the binary entry point.

pub mod config;
pub mod types;
pub mod simulation;
pub mod engine;
pub mod storage;
pub mod dashboard;
