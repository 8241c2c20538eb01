//! LagEngine — start / tick / revise operations over a TrackingStore
//!
//! State machine per sample:
//!
//! ```text
//! Running --(remaining == 0)--> Completed   (terminal)
//! Running --(revise)----------> Running     (baseline reset)
//! ```
//!
//! Completion fires an arrival event exactly once; re-ticking a completed
//! sample is a no-op.

use chrono::NaiveDateTime;
use tracing::{info, warn};

use super::TrackingStore;
use crate::physics::{self, round2};
use crate::types::{
    LagTime, LagTimeResult, SampleStatus, SampleTrackingState, WellGeometryParameters,
    TIMESTAMP_FORMAT,
};

// ============================================================================
// Errors
// ============================================================================

/// Engine operation errors.
#[derive(Debug, thiserror::Error)]
pub enum LagError {
    #[error("invalid geometry input: {0}")]
    Validation(String),
    #[error("sample '{0}' is already tracked")]
    DuplicateSample(String),
    #[error("unknown sample '{0}'")]
    UnknownSample(String),
    #[error("sample '{0}' has already surfaced")]
    SampleCompleted(String),
    #[error("no tracked sample to copy parameters from")]
    NoTemplate,
}

/// A malformed wall-clock string.
///
/// Never fatal: the depth-adjustment step that needed the timestamp is
/// skipped and the prior depth kept, with this surfaced to the caller.
#[derive(Debug, Clone, thiserror::Error)]
#[error("malformed timestamp '{input}' (expected {TIMESTAMP_FORMAT}): {reason}")]
pub struct TimestampParseError {
    pub input: String,
    pub reason: String,
}

/// Parse a wall-clock string in the fixed local-time format.
pub fn parse_timestamp(input: &str) -> Result<NaiveDateTime, TimestampParseError> {
    NaiveDateTime::parse_from_str(input.trim(), TIMESTAMP_FORMAT).map_err(|e| {
        TimestampParseError {
            input: input.to_string(),
            reason: e.to_string(),
        }
    })
}

// ============================================================================
// Operation Outputs
// ============================================================================

/// Fired exactly once when a sample's cuttings reach the surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArrivalEvent {
    pub name: String,
    pub at: NaiveDateTime,
}

/// What a revision did to one sample.
#[derive(Debug, Clone)]
pub struct ReviseSummary {
    pub name: String,
    /// Lag estimate of the superseding result
    pub lag: LagTime,
    /// Cuttings depth the new baseline was computed at (ft)
    pub cutting_depth: f64,
    /// Whether the elapsed-time depth credit was applied
    pub depth_adjusted: bool,
    /// Set when the change-time string could not be parsed
    pub timestamp_warning: Option<TimestampParseError>,
}

// ============================================================================
// Engine
// ============================================================================

/// The lag-time countdown engine.
///
/// Holds only the engine-wide pump speed; all per-sample state lives in the
/// [`TrackingStore`] passed into each operation.
#[derive(Debug, Default)]
pub struct LagEngine {
    /// Pump speed currently applied rig-wide (spm). Countdowns rescale
    /// against it when it diverges from a sample's baseline speed.
    current_pump_speed: f64,
}

impl LagEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current_pump_speed(&self) -> f64 {
        self.current_pump_speed
    }

    /// Begin tracking a named sample.
    ///
    /// Fails with [`LagError::DuplicateSample`] if the name is already
    /// tracked (prior state untouched) and [`LagError::Validation`] on bad
    /// geometry. A sample whose pump output is zero starts `Running` with
    /// its countdown frozen in the awaiting-pump state.
    pub fn start<'s>(
        &mut self,
        store: &'s mut TrackingStore,
        name: &str,
        params: WellGeometryParameters,
        now: NaiveDateTime,
    ) -> Result<&'s SampleTrackingState, LagError> {
        params.validate().map_err(LagError::Validation)?;
        if store.contains(name) {
            return Err(LagError::DuplicateSample(name.to_string()));
        }

        let estimate = physics::compute(&params);
        let result = LagTimeResult {
            lag: estimate.lag,
            pump_output: estimate.pump_output,
            segments: estimate.segments,
            volumes: estimate.volumes,
            cutting_depth: round2(params.hole_depth),
            published_at: now,
        };

        let state = SampleTrackingState {
            name: name.to_string(),
            initial_lag_secs: estimate.lag.seconds().unwrap_or(0),
            initial_pump_speed: params.pump_speed,
            start_time: now,
            remaining_secs: estimate.lag.seconds(),
            status: SampleStatus::Running,
            result,
            params,
        };

        info!(
            sample = %name,
            lag = %state.result.lag,
            pump_output = state.result.pump_output,
            "Started tracking sample"
        );

        self.current_pump_speed = state.initial_pump_speed;
        Ok(store.insert(state))
    }

    /// Restore a sample from a persisted result plus its input snapshot.
    ///
    /// The countdown baseline is the persisted `published_at`; the next
    /// `tick` folds in however much wall-clock time passed while the
    /// session was down.
    pub fn resume<'s>(
        &mut self,
        store: &'s mut TrackingStore,
        name: &str,
        params: WellGeometryParameters,
        result: LagTimeResult,
        completed: bool,
    ) -> Result<&'s SampleTrackingState, LagError> {
        params.validate().map_err(LagError::Validation)?;
        if store.contains(name) {
            return Err(LagError::DuplicateSample(name.to_string()));
        }

        let pump_speed = params.pump_speed;
        let state = SampleTrackingState {
            name: name.to_string(),
            initial_lag_secs: result.lag.seconds().unwrap_or(0),
            initial_pump_speed: pump_speed,
            start_time: result.published_at,
            remaining_secs: if completed {
                Some(0)
            } else {
                result.lag.seconds()
            },
            status: if completed {
                SampleStatus::Completed
            } else {
                SampleStatus::Running
            },
            result,
            params,
        };

        if !completed {
            self.current_pump_speed = pump_speed;
        }
        Ok(store.insert(state))
    }

    /// Advance every running countdown to `now`.
    ///
    /// Remaining time is rescaled, not linearly subtracted, when the
    /// engine-wide pump speed differs from a sample's baseline speed:
    ///
    /// `remaining = max(0, initial_lag × (initial_speed / current_speed) − elapsed)`
    ///
    /// so a pump-speed bump mid-run accelerates arrival proportionally.
    /// At zero current speed the fluid is stationary and every countdown
    /// freezes at its last value. Arrival is reported exactly once.
    pub fn tick(&mut self, store: &mut TrackingStore, now: NaiveDateTime) -> Vec<ArrivalEvent> {
        let mut arrivals = Vec::new();
        let current_speed = self.current_pump_speed;

        for state in store.iter_mut() {
            if state.status != SampleStatus::Running {
                continue;
            }
            // Awaiting pump output — nothing is moving yet.
            if state.remaining_secs.is_none() || state.initial_pump_speed <= 0.0 {
                continue;
            }
            // Pump stopped — freeze at the last computed value.
            if current_speed <= 0.0 {
                continue;
            }

            let elapsed = (now - state.start_time).num_seconds().max(0);
            let rescaled_lag =
                state.initial_lag_secs as f64 * (state.initial_pump_speed / current_speed);
            let remaining = (rescaled_lag - elapsed as f64).max(0.0) as i64;
            state.remaining_secs = Some(remaining);

            if remaining == 0 {
                state.status = SampleStatus::Completed;
                state.result = LagTimeResult {
                    lag: LagTime::Seconds(0),
                    published_at: now,
                    ..state.result.clone()
                };
                info!(sample = %state.name, "Cuttings have reached the surface");
                arrivals.push(ArrivalEvent {
                    name: state.name.clone(),
                    at: now,
                });
            }
        }

        arrivals
    }

    /// Revise a sample after a mid-run pump-speed or depth edit.
    ///
    /// Credits the distance the cuttings travelled since the last published
    /// estimate (`depth × elapsed / initial_lag`, only meaningful when the
    /// prior estimate had positive lag and pump output), recomputes
    /// geometry at the updated depth with the new parameters, and
    /// re-baselines the countdown on the superseding result — revision
    /// resets the baseline rather than adjusting the rate, so repeated
    /// edits cannot accumulate drift.
    ///
    /// A malformed `change_time` skips only the depth credit; the anomaly
    /// is logged and surfaced in the returned summary.
    pub fn revise(
        &mut self,
        store: &mut TrackingStore,
        name: &str,
        new_params: WellGeometryParameters,
        change_time: &str,
        now: NaiveDateTime,
    ) -> Result<ReviseSummary, LagError> {
        new_params.validate().map_err(LagError::Validation)?;

        let state = store
            .get_mut(name)
            .ok_or_else(|| LagError::UnknownSample(name.to_string()))?;
        if state.status == SampleStatus::Completed {
            return Err(LagError::SampleCompleted(name.to_string()));
        }

        let parsed = parse_timestamp(change_time);

        let mut params = new_params;
        let mut depth = state.result.cutting_depth;
        let mut depth_adjusted = false;
        let mut timestamp_warning = None;

        if state.initial_lag_secs > 0 && state.result.pump_output > 0.0 {
            match &parsed {
                Ok(change_dt) => {
                    let elapsed = (*change_dt - state.result.published_at).num_seconds() as f64;
                    let travelled = round2(depth * elapsed / state.initial_lag_secs as f64);
                    depth = round2((depth - travelled).max(0.0));
                    depth_adjusted = true;
                }
                Err(e) => {
                    warn!(sample = %name, error = %e, "Keeping prior cutting depth");
                    timestamp_warning = Some(e.clone());
                }
            }
        }

        params.hole_depth = depth;
        let estimate = physics::compute(&params);
        let published_at = parsed.ok().unwrap_or(now);

        state.result = LagTimeResult {
            lag: estimate.lag,
            pump_output: estimate.pump_output,
            segments: estimate.segments,
            volumes: estimate.volumes,
            cutting_depth: depth,
            published_at,
        };
        state.initial_lag_secs = estimate.lag.seconds().unwrap_or(0);
        state.initial_pump_speed = params.pump_speed;
        state.start_time = published_at;
        state.remaining_secs = estimate.lag.seconds();
        state.params = params;

        self.current_pump_speed = state.initial_pump_speed;

        info!(
            sample = %name,
            lag = %state.result.lag,
            depth = depth,
            depth_adjusted,
            "Revised sample baseline"
        );

        Ok(ReviseSummary {
            name: name.to_string(),
            lag: state.result.lag,
            cutting_depth: depth,
            depth_adjusted,
            timestamp_warning,
        })
    }

    /// Apply a new rig-wide pump speed to every non-completed sample.
    ///
    /// Each running sample goes through a full [`revise`](Self::revise) so
    /// its baseline reflects the new speed; completed samples are skipped.
    pub fn update_pump_speed(
        &mut self,
        store: &mut TrackingStore,
        new_speed: f64,
        change_time: &str,
        now: NaiveDateTime,
    ) -> Vec<ReviseSummary> {
        let new_speed = round2(new_speed);
        let names: Vec<String> = store
            .iter()
            .map(|s| (s.name.clone(), s.status))
            .filter_map(|(name, status)| {
                if status == SampleStatus::Completed {
                    info!(sample = %name, "Skipping pump-speed update - already completed");
                    None
                } else {
                    Some(name)
                }
            })
            .collect();

        let mut summaries = Vec::with_capacity(names.len());
        for name in names {
            let Some(state) = store.get(&name) else { continue };
            let mut params = state.params.clone();
            params.pump_speed = new_speed;
            match self.revise(store, &name, params, change_time, now) {
                Ok(summary) => summaries.push(summary),
                Err(e) => warn!(sample = %name, error = %e, "Pump-speed revision failed"),
            }
        }

        self.current_pump_speed = new_speed;
        summaries
    }

    /// Add a new depth sample by copying the most recently published
    /// sample's parameters.
    ///
    /// The sample is named `sample_<depth>` unless an explicit name is
    /// given. A malformed `change_time` falls back to `now`.
    pub fn add_sample_from_template(
        &mut self,
        store: &mut TrackingStore,
        name: Option<String>,
        new_depth: f64,
        change_time: &str,
        now: NaiveDateTime,
    ) -> Result<String, LagError> {
        let template = store
            .iter()
            .max_by_key(|s| s.result.published_at)
            .ok_or(LagError::NoTemplate)?;

        let mut params = template.params.clone();
        params.hole_depth = round2(new_depth);

        let name = name.unwrap_or_else(|| sample_name_for_depth(new_depth));
        let at = match parse_timestamp(change_time) {
            Ok(t) => t,
            Err(e) => {
                warn!(sample = %name, error = %e, "Using current time for new sample");
                now
            }
        };

        self.start(store, &name, params, at)?;
        Ok(name)
    }
}

/// Canonical name for a depth-derived sample (`sample_3000`).
pub(crate) fn sample_name_for_depth(depth: f64) -> String {
    format!("sample_{}", depth as i64)
}
