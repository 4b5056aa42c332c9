//! AUTORESOLVE — headless batch driver.
//!
//! Entry point. Loads configuration, initialises structured logging,
//! runs one batch of skirmish simulations in parallel while logging
//! progress, then prints the win/loss/draw summary and saves the report.

use anyhow::Result;
use std::sync::Arc;
use tracing::{error, info, warn};

use autoresolve::config;
use autoresolve::dashboard::{self, routes::DashboardState};
use autoresolve::engine::aggregator::{BatchControl, TrialAggregator};
use autoresolve::engine::progress::ProgressWatcher;
use autoresolve::simulation::skirmish::SkirmishSimulator;
use autoresolve::storage;
use autoresolve::types::BatchReport;

const BANNER: &str = r#"
    _   _   _ _____ ___  ___ ___ ___  ___  _ __   _____
   /_\ | | | |_   _/ _ \| _ \ __/ __|/ _ \| |\ \ / / __|
  / _ \| |_| | | || (_) |   / _|\__ \ (_) | |_\ V /| _|
 /_/ \_\\___/  |_| \___/|_|_\___|___/\___/|____\_/ |___|

  Parallel Monte Carlo auto-resolve chance estimator
  v0.1.0
"#;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    let config_path = config::AppConfig::path_from_env();
    let mut cfg = config::AppConfig::load(&config_path)?;
    cfg.apply_trials_override(std::env::var("AUTORESOLVE_TRIALS").ok())?;

    init_logging();

    println!("{BANNER}");
    info!(
        config = %config_path,
        trials = cfg.batch.trials,
        workers = cfg.concurrency(),
        seed = ?cfg.batch.seed,
        player_units = cfg.scenario.player.len(),
        opponent_units = cfg.scenario.opponent.len(),
        "AUTORESOLVE starting up"
    );

    // Every trial would fail on a broken scenario; say so once, up front.
    cfg.scenario.validate()?;

    let aggregator = TrialAggregator::new(SkirmishSimulator);
    let control = BatchControl::new();

    // -- Optional dashboard ----------------------------------------------

    let dashboard_state = if cfg.dashboard.enabled {
        let state = Arc::new(DashboardState::new(control.subscribe()));
        dashboard::spawn_dashboard(state.clone(), cfg.dashboard.port).await?;
        Some(state)
    } else {
        None
    };

    // -- Progress logging and Ctrl+C cancellation --------------------------

    let progress_task = tokio::spawn(log_progress(control.subscribe()));

    let cancel = control.cancel_handle();
    let cancel_task = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Shutdown signal received, finishing running trials");
            cancel.cancel();
        }
    });

    // -- Run the batch ---------------------------------------------------

    let report = aggregator.run_with(cfg.batch_request(), control).await;

    cancel_task.abort();
    progress_task.abort();

    print_summary(&report);

    if cfg.storage.save_reports {
        match storage::save_report(&report, Some(&cfg.storage.report_dir)) {
            Ok(path) => info!(path = %path.display(), "Report saved"),
            Err(e) => error!(error = %e, "Failed to save report"),
        }
    }

    if let Some(state) = dashboard_state {
        state.set_report(report).await;
        info!("Dashboard still serving. Press Ctrl+C to exit.");
        tokio::signal::ctrl_c().await?;
    }

    info!("AUTORESOLVE shut down cleanly.");
    Ok(())
}

/// Log progress every time another tenth of the batch completes.
async fn log_progress(mut watcher: ProgressWatcher) {
    let mut last_decile = 0;
    while let Some(p) = watcher.changed().await {
        let decile = (p.fraction() * 10.0).floor() as u32;
        if decile > last_decile {
            last_decile = decile;
            info!(
                completed = p.completed,
                failed = p.failed,
                total = p.total,
                percent = format!("{:.0}%", p.fraction() * 100.0),
                "Progress"
            );
        }
    }
}

/// Print the user-facing result of a batch.
fn print_summary(report: &BatchReport) {
    info!(%report, "Batch finished");
    match report.summary() {
        Ok(summary) => println!("\nAuto-resolve chance: {summary}\n"),
        Err(e) => {
            warn!(error = %e, "No summary available");
            println!("\n{e}\n");
        }
    }
}

/// Initialise the `tracing` subscriber.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("autoresolve=info"));

    let json_logging = std::env::var("AUTORESOLVE_LOG_JSON").is_ok();

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .init();
    } else {
        fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    }
}
