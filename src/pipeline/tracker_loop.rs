//! Unified tracking loop: tick countdowns, drain commands, persist changes.
//!
//! One cooperative loop owns the engine, the store, and the persistence
//! handles. Progress advances only when the interval fires — suspension is
//! caller-driven, never preemptive — and every state change is followed by
//! a synchronous append to the results log before the loop moves on.

use std::time::Duration;

use chrono::NaiveDateTime;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::commands::{CommandEvent, CommandSource, ControlCommand};
use crate::engine::{LagEngine, TrackingStore};
use crate::storage::{ParameterBook, ResultRow, ResultSink};

// ============================================================================
// Statistics
// ============================================================================

/// Counters reported when the loop exits.
#[derive(Debug, Clone, Copy, Default)]
pub struct TrackerStats {
    pub ticks: u64,
    pub arrivals: u64,
    pub revisions: u64,
    pub samples_added: u64,
    pub rows_written: u64,
    pub persistence_failures: u64,
}

// ============================================================================
// Tracker Loop
// ============================================================================

/// Owns all state needed for the tracking loop.
///
/// Built with [`new()`](TrackerLoop::new), tuned with the `with_*`
/// builders, then consumed by [`run()`](TrackerLoop::run).
pub struct TrackerLoop<S: CommandSource> {
    engine: LagEngine,
    store: TrackingStore,
    book: ParameterBook,
    sink: Box<dyn ResultSink>,
    source: S,
    cancel_token: CancellationToken,
    tick_interval: Duration,
    /// Exit once every tracked sample has surfaced (set when no control
    /// surface is attached — nothing further can change).
    exit_when_done: bool,
    stats: TrackerStats,
}

impl<S: CommandSource> TrackerLoop<S> {
    pub fn new(
        engine: LagEngine,
        store: TrackingStore,
        book: ParameterBook,
        sink: Box<dyn ResultSink>,
        source: S,
        cancel_token: CancellationToken,
    ) -> Self {
        Self {
            engine,
            store,
            book,
            sink,
            source,
            cancel_token,
            tick_interval: Duration::from_secs(1),
            exit_when_done: false,
            stats: TrackerStats::default(),
        }
    }

    /// Set the countdown poll interval.
    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;
        self
    }

    /// Exit once every tracked sample has surfaced.
    pub fn with_exit_when_done(mut self, exit: bool) -> Self {
        self.exit_when_done = exit;
        self
    }

    /// Run until cancellation (or, with `exit_when_done`, until every
    /// sample has surfaced). Returns final statistics.
    pub async fn run(mut self) -> TrackerStats {
        let mut interval = tokio::time::interval(self.tick_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        let mut source_done = false;

        info!(
            "⏱  Tracking {} samples ({} running) from {} commands...",
            self.store.len(),
            self.store.running_count(),
            self.source.source_name()
        );

        loop {
            tokio::select! {
                _ = self.cancel_token.cancelled() => {
                    info!("[Tracker] Shutdown signal received");
                    break;
                }
                _ = interval.tick() => {
                    self.stats.ticks += 1;
                    let now = wall_clock();
                    let arrivals = self.engine.tick(&mut self.store, now);
                    for arrival in arrivals {
                        info!("🎯 Cuttings for {} have reached the surface", arrival.name);
                        self.stats.arrivals += 1;
                        self.persist(&arrival.name);
                    }
                    if self.exit_when_done
                        && !self.store.is_empty()
                        && self.store.all_completed()
                    {
                        info!("[Tracker] All samples have surfaced");
                        break;
                    }
                }
                result = self.source.next_command(), if !source_done => {
                    match result {
                        Ok(CommandEvent::Command(command)) => self.handle_command(command),
                        Ok(CommandEvent::Eof) => {
                            info!("[Tracker] Command source closed");
                            source_done = true;
                        }
                        Err(e) => {
                            warn!("[Tracker] Command source error: {}", e);
                            source_done = true;
                        }
                    }
                }
            }
        }

        self.log_final_stats();
        self.stats
    }

    // ------------------------------------------------------------------
    // Command Handling
    // ------------------------------------------------------------------

    fn handle_command(&mut self, command: ControlCommand) {
        let now = wall_clock();
        match command {
            ControlCommand::UpdatePumpSpeed { speed, at } => {
                let summaries =
                    self.engine
                        .update_pump_speed(&mut self.store, speed, &at, now);
                for summary in &summaries {
                    self.stats.revisions += 1;
                    self.append_params(&summary.name);
                    self.persist(&summary.name);
                    info!(
                        "   {} → {} at depth {:.2} ft",
                        summary.name, summary.lag, summary.cutting_depth
                    );
                }
                info!(
                    "Pump speed set to {:.2} spm across {} samples",
                    speed,
                    summaries.len()
                );
            }

            ControlCommand::AddSample { name, depth, at } => {
                match self
                    .engine
                    .add_sample_from_template(&mut self.store, name, depth, &at, now)
                {
                    Ok(name) => {
                        self.stats.samples_added += 1;
                        self.append_params(&name);
                        self.persist(&name);
                        info!("Added new depth sample {}", name);
                    }
                    Err(e) => warn!("Failed to add sample: {}", e),
                }
            }

            ControlCommand::StartTracking { name, params } => {
                match self.engine.start(&mut self.store, &name, params, now) {
                    Ok(_) => {
                        self.append_params(&name);
                        self.persist(&name);
                    }
                    Err(e) => warn!(sample = %name, "Failed to start tracking: {}", e),
                }
            }

            ControlCommand::View => self.log_snapshot(),
        }
    }

    // ------------------------------------------------------------------
    // Persistence (synchronous, after each state change)
    // ------------------------------------------------------------------

    /// Append the sample's current result to the audit log.
    ///
    /// A failure is surfaced and counted, never fatal: the in-memory state
    /// is already fully committed, so the next state change retries with a
    /// fresh row.
    fn persist(&mut self, name: &str) {
        let Some(state) = self.store.get(name) else {
            return;
        };
        let row = ResultRow::from_state(state);
        match self.sink.append(&row) {
            Ok(()) => self.stats.rows_written += 1,
            Err(e) => {
                self.stats.persistence_failures += 1;
                warn!(sample = %name, "Failed to persist result row: {}", e);
            }
        }
    }

    /// Write the sample's current input snapshot back to its parameter
    /// table so the inputs stay an audit trail too.
    fn append_params(&mut self, name: &str) {
        let Some(state) = self.store.get(name) else {
            return;
        };
        if let Err(e) = self.book.append(name, &state.params) {
            warn!(sample = %name, "Failed to append parameter row: {}", e);
        }
    }

    // ------------------------------------------------------------------
    // Logging
    // ------------------------------------------------------------------

    fn log_snapshot(&self) {
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
        info!("📋 TRACKED SAMPLES");
        for snapshot in self.store.snapshot() {
            let progress = snapshot
                .progress_percent
                .map_or_else(|| "  —".to_string(), |p| format!("{p:3}%"));
            info!(
                "   {:<20} {:<9} remaining {:>8} | {} | depth {:.2} ft | pump {:.2} bbl/min",
                snapshot.name,
                snapshot.status.short_code(),
                snapshot.remaining_display,
                progress,
                snapshot.cutting_depth,
                snapshot.pump_output,
            );
        }
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    }

    fn log_final_stats(&self) {
        info!("");
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
        info!("📊 FINAL STATISTICS");
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
        info!("   Samples Tracked:       {}", self.store.len());
        info!("   Samples Surfaced:      {}", self.store.completed_count());
        info!("   Ticks:                 {}", self.stats.ticks);
        info!("   Revisions:             {}", self.stats.revisions);
        info!("   Samples Added:         {}", self.stats.samples_added);
        info!("   Result Rows Written:   {}", self.stats.rows_written);
        info!("   Persistence Failures:  {}", self.stats.persistence_failures);
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    }
}

/// The single place the host reads the wall clock. The engine itself never
/// does — `now` always arrives as an argument.
fn wall_clock() -> NaiveDateTime {
    chrono::Local::now().naive_local()
}
