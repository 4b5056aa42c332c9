//! Persistence layer.
//!
//! Saves and loads batch reports as pretty-printed JSON files, one per
//! batch, named `<batch_id>.json` inside a report directory.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::types::BatchReport;

/// Default report directory.
pub const DEFAULT_REPORT_DIR: &str = "reports";

fn report_path(dir: &str, batch_id: Uuid) -> PathBuf {
    Path::new(dir).join(format!("{batch_id}.json"))
}

/// Save a report, creating the directory if needed. Returns the file path.
pub fn save_report(report: &BatchReport, dir: Option<&str>) -> Result<PathBuf> {
    let dir = dir.unwrap_or(DEFAULT_REPORT_DIR);
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create report directory {dir}"))?;

    let path = report_path(dir, report.batch_id);
    let json = serde_json::to_string_pretty(report)
        .context("Failed to serialise batch report")?;
    std::fs::write(&path, &json)
        .with_context(|| format!("Failed to write report to {}", path.display()))?;

    debug!(path = %path.display(), batch_id = %report.batch_id, "Report saved");
    Ok(path)
}

/// Load a single report. Returns None if it doesn't exist.
pub fn load_report(batch_id: Uuid, dir: Option<&str>) -> Result<Option<BatchReport>> {
    let path = report_path(dir.unwrap_or(DEFAULT_REPORT_DIR), batch_id);
    if !path.exists() {
        return Ok(None);
    }

    let json = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read report from {}", path.display()))?;
    let report: BatchReport = serde_json::from_str(&json)
        .with_context(|| format!("Failed to parse report from {}", path.display()))?;
    Ok(Some(report))
}

/// Load every report in the directory, oldest first.
/// Unreadable files are skipped with a warning.
pub fn list_reports(dir: Option<&str>) -> Result<Vec<BatchReport>> {
    let dir = dir.unwrap_or(DEFAULT_REPORT_DIR);
    if !Path::new(dir).exists() {
        info!(dir, "No report directory found");
        return Ok(Vec::new());
    }

    let mut reports = Vec::new();
    for entry in std::fs::read_dir(dir).with_context(|| format!("Failed to list {dir}"))? {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }
        let parsed = std::fs::read_to_string(&path)
            .map_err(anyhow::Error::from)
            .and_then(|json| serde_json::from_str::<BatchReport>(&json).map_err(Into::into));
        match parsed {
            Ok(report) => reports.push(report),
            Err(e) => warn!(path = %path.display(), error = %e, "Skipping unreadable report"),
        }
    }

    reports.sort_by_key(|r| r.started_at);
    Ok(reports)
}

/// Delete a report (no-op if it doesn't exist).
pub fn delete_report(batch_id: Uuid, dir: Option<&str>) -> Result<()> {
    let path = report_path(dir.unwrap_or(DEFAULT_REPORT_DIR), batch_id);
    if path.exists() {
        std::fs::remove_file(&path)
            .with_context(|| format!("Failed to delete report {}", path.display()))?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
