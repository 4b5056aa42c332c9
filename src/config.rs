//! Configuration loading from TOML with environment variable overrides.
//!
//! Reads `config.toml` and deserializes into strongly-typed structs.
//! The config path and the trial count can be overridden from the
//! environment (`AUTORESOLVE_CONFIG`, `AUTORESOLVE_TRIALS`).

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;

use crate::simulation::skirmish::Skirmish;
use crate::types::{default_concurrency, BatchRequest};

/// Default config file, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub batch: BatchConfig,
    pub scenario: Skirmish,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub dashboard: DashboardConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BatchConfig {
    pub trials: u64,
    /// Worker count; defaults to the number of available CPU cores.
    #[serde(default)]
    pub concurrency: Option<usize>,
    #[serde(default)]
    pub seed: Option<u64>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    pub save_reports: bool,
    pub report_dir: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            save_reports: false,
            report_dir: crate::storage::DEFAULT_REPORT_DIR.to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct DashboardConfig {
    pub enabled: bool,
    pub port: u16,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            port: 8080,
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        Self::parse(&contents).with_context(|| format!("Failed to parse config file: {path}"))
    }

    pub fn parse(contents: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(contents)?;
        Ok(config)
    }

    /// Config path from `AUTORESOLVE_CONFIG`, falling back to the default.
    pub fn path_from_env() -> String {
        std::env::var("AUTORESOLVE_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string())
    }

    /// Replace the configured trial count with `raw` (typically the value
    /// of `AUTORESOLVE_TRIALS`), if present.
    pub fn apply_trials_override(&mut self, raw: Option<String>) -> Result<()> {
        if let Some(raw) = raw {
            let trials = raw
                .trim()
                .parse::<u64>()
                .with_context(|| format!("AUTORESOLVE_TRIALS is not a trial count: {raw}"))?;
            self.batch.trials = trials;
        }
        Ok(())
    }

    /// Effective worker count.
    pub fn concurrency(&self) -> usize {
        self.batch
            .concurrency
            .unwrap_or_else(default_concurrency)
            .max(1)
    }

    /// Build the batch request for the configured scenario.
    pub fn batch_request(&self) -> BatchRequest<Skirmish> {
        let request = BatchRequest::new(self.batch.trials, self.scenario.clone())
            .with_concurrency(self.concurrency());
        match self.batch.seed {
            Some(seed) => request.with_seed(seed),
            None => request,
        }
    }
}
