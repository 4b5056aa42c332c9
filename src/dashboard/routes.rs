//! Dashboard API route handlers.
//!
//! All endpoints return JSON. State is shared via `Arc<DashboardState>`.

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::engine::progress::ProgressWatcher;
use crate::types::BatchReport;

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

/// Shared state accessible by all route handlers.
pub struct DashboardState {
    pub progress: ProgressWatcher,
    pub last_report: RwLock<Option<BatchReport>>,
}

impl DashboardState {
    pub fn new(progress: ProgressWatcher) -> Self {
        Self {
            progress,
            last_report: RwLock::new(None),
        }
    }

    /// Publish a finished batch to the `/api/report` and `/api/summary` endpoints.
    pub async fn set_report(&self, report: BatchReport) {
        *self.last_report.write().await = Some(report);
    }
}

pub type AppState = Arc<DashboardState>;

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct ProgressResponse {
    pub total: u64,
    pub completed: u64,
    pub failed: u64,
    pub skipped: u64,
    pub fraction: f64,
    pub finished: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SummaryResponse {
    pub available: bool,
    pub message: String,
    pub win_pct: Option<f64>,
    pub loss_pct: Option<f64>,
    pub draw_pct: Option<f64>,
    pub completed: u64,
    pub requested: u64,
}

// ---------------------------------------------------------------------------
// Route handlers
// ---------------------------------------------------------------------------

/// GET /api/progress
pub async fn get_progress(State(state): State<AppState>) -> Json<ProgressResponse> {
    let p = state.progress.latest();
    Json(ProgressResponse {
        total: p.total,
        completed: p.completed,
        failed: p.failed,
        skipped: p.skipped,
        fraction: p.fraction(),
        finished: p.is_finished(),
    })
}

/// GET /api/report
pub async fn get_report(
    State(state): State<AppState>,
) -> Result<Json<BatchReport>, StatusCode> {
    let report = state.last_report.read().await;
    report.clone().map(Json).ok_or(StatusCode::NOT_FOUND)
}

/// GET /api/summary
pub async fn get_summary(
    State(state): State<AppState>,
) -> Result<Json<SummaryResponse>, StatusCode> {
    let guard = state.last_report.read().await;
    let report = guard.as_ref().ok_or(StatusCode::NOT_FOUND)?;

    let resp = match report.summary() {
        Ok(s) => SummaryResponse {
            available: true,
            message: s.to_string(),
            win_pct: Some(s.win_pct),
            loss_pct: Some(s.loss_pct),
            draw_pct: Some(s.draw_pct),
            completed: s.completed,
            requested: s.requested,
        },
        Err(e) => SummaryResponse {
            available: false,
            message: e.to_string(),
            win_pct: None,
            loss_pct: None,
            draw_pct: None,
            completed: report.score.completed,
            requested: report.requested,
        },
    };
    Ok(Json(resp))
}

/// GET /health
pub async fn health() -> StatusCode {
    StatusCode::OK
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
