//! MUDLAG - Drilling Lag-Time Tracker
//!
//! Loads per-sample parameter tables, estimates lag time for each, and
//! tracks the countdowns until the cuttings surface, appending every state
//! change to the per-sample audit log.
//!
//! # Usage
//!
//! ```bash
//! # Track everything under data/params, poll once per second
//! cargo run --release
//!
//! # Drive the control surface from a console or supervising process
//! cargo run --release -- --stdin-control
//!
//! # Point at a different deployment layout
//! cargo run --release -- --params-dir /rig/params --results-dir /rig/results
//! ```
//!
//! # Environment Variables
//!
//! - `MUDLAG_CONFIG`: Path to a TOML config file (default: ./mudlag.toml)
//! - `RUST_LOG`: Logging level (default: info)

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use mudlag::config::TrackerConfig;
use mudlag::engine::{LagEngine, TrackingStore};
use mudlag::pipeline::{NullSource, StdinSource, TrackerLoop};
use mudlag::storage::{CsvResultsLog, ParameterBook, ResultRow, ResultSink};

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "mudlag")]
#[command(about = "Drilling lag-time estimation and cuttings sample tracker")]
#[command(version)]
struct CliArgs {
    /// Path to a TOML config file (overrides the MUDLAG_CONFIG search order)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory of per-sample parameter tables
    #[arg(long)]
    params_dir: Option<PathBuf>,

    /// Directory of per-sample append-only result tables
    #[arg(long)]
    results_dir: Option<PathBuf>,

    /// Read control commands (JSON lines) from stdin
    #[arg(long)]
    stdin_control: bool,

    /// Countdown poll interval in seconds
    #[arg(long)]
    tick_interval: Option<u64>,

    /// Wipe the results directory before starting.
    /// WARNING: This deletes the audit log and cannot be undone!
    #[arg(long)]
    reset: bool,
}

// ============================================================================
// Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = CliArgs::parse();

    let mut config = match &args.config {
        Some(path) => TrackerConfig::load_from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => TrackerConfig::load(),
    };
    if let Some(dir) = args.params_dir {
        config.files.params_dir = dir;
    }
    if let Some(dir) = args.results_dir {
        config.files.results_dir = dir;
    }
    if let Some(secs) = args.tick_interval {
        config.engine.tick_interval_secs = secs;
    }

    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    info!("  MUDLAG — Drilling Lag-Time Tracker");
    info!("  Well: {} | Rig: {}", config.well.name, config.well.rig);
    info!(
        "  Params: {} | Results: {}",
        config.files.params_dir.display(),
        config.files.results_dir.display()
    );
    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    if args.reset {
        reset_results_directory(&config.files.results_dir)?;
    }

    // Load the input tables and open the audit log.
    let book = ParameterBook::load(&config.files.params_dir, config.engine.pump_coefficient)
        .context("Failed to load parameter tables")?;
    let mut sink = CsvResultsLog::open(&config.files.results_dir)
        .context("Failed to open results log")?;

    let mut engine = LagEngine::new();
    let mut store = TrackingStore::new();

    restore_session(&mut engine, &mut store, &book, &sink)?;
    start_new_samples(&mut engine, &mut store, &book, &mut sink)?;

    if store.is_empty() && !args.stdin_control {
        warn!("No samples to track and no control surface attached — nothing to do");
        return Ok(());
    }

    // Ctrl-C flips the cancellation token; the loop drains and exits.
    let cancel_token = CancellationToken::new();
    let signal_token = cancel_token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            signal_token.cancel();
        }
    });

    let tick_interval = Duration::from_secs(config.engine.tick_interval_secs.max(1));
    let stats = if args.stdin_control {
        TrackerLoop::new(
            engine,
            store,
            book,
            Box::new(sink),
            StdinSource::new(),
            cancel_token,
        )
        .with_tick_interval(tick_interval)
        .run()
        .await
    } else {
        TrackerLoop::new(
            engine,
            store,
            book,
            Box::new(sink),
            NullSource,
            cancel_token,
        )
        .with_tick_interval(tick_interval)
        .with_exit_when_done(true)
        .run()
        .await
    };

    info!(
        "Tracker exited: {} arrivals, {} rows written",
        stats.arrivals, stats.rows_written
    );
    Ok(())
}

// ============================================================================
// Session Restore
// ============================================================================

/// Rebuild tracked samples from the last audit row of each result table.
///
/// Completed samples come back completed; running ones resume their
/// countdown from `published_at`, folding in downtime on the first tick.
fn restore_session(
    engine: &mut LagEngine,
    store: &mut TrackingStore,
    book: &ParameterBook,
    sink: &CsvResultsLog,
) -> Result<()> {
    let rows = sink.last_rows().context("Failed to read results log")?;
    for row in rows {
        let Some(params) = book.get(&row.sample_name) else {
            warn!(
                sample = %row.sample_name,
                "Result table has no matching parameter table — not restoring"
            );
            continue;
        };
        let completed = row.is_at_surface;
        match engine.resume(
            store,
            &row.sample_name,
            params.clone(),
            row.to_result(),
            completed,
        ) {
            Ok(state) => info!(
                sample = %state.name,
                status = %state.status,
                "Restored sample from results log"
            ),
            Err(e) => warn!(sample = %row.sample_name, "Failed to restore sample: {}", e),
        }
    }
    Ok(())
}

/// Start tracking any parameter table that has no audit history yet, and
/// publish its first result row.
fn start_new_samples(
    engine: &mut LagEngine,
    store: &mut TrackingStore,
    book: &ParameterBook,
    sink: &mut CsvResultsLog,
) -> Result<()> {
    let now = chrono::Local::now().naive_local();
    for (name, params) in book.iter() {
        if store.contains(name) {
            continue;
        }
        match engine.start(store, name, params.clone(), now) {
            Ok(state) => {
                let row = ResultRow::from_state(state);
                if let Err(e) = sink.append(&row) {
                    warn!(sample = %name, "Failed to persist first result row: {}", e);
                }
            }
            Err(e) => warn!(sample = %name, "Failed to start tracking: {}", e),
        }
    }
    Ok(())
}

// ============================================================================
// Results Reset
// ============================================================================

/// Safely remove the results directory and all its contents.
fn reset_results_directory(dir: &std::path::Path) -> Result<()> {
    if !dir.exists() {
        info!("Results directory does not exist, nothing to reset");
        return Ok(());
    }

    warn!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    warn!("  --reset — WIPING THE RESULTS AUDIT LOG");
    warn!("  Removing: {}", dir.display());
    warn!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    std::fs::remove_dir_all(dir).context("Failed to remove results directory")?;
    Ok(())
}
