//! Sample tracking types: lag estimates, countdown state, persisted rows

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::{AnnularVolumes, SegmentLengths, WellGeometryParameters};

/// Wall-clock timestamp format used everywhere a time crosses the boundary
/// (parameter tables, result rows, control commands).
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Placeholder written to the HH:MM:SS column while pump output is zero.
pub const AWAITING_PUMP_PLACEHOLDER: &str = "read";

/// Convert whole seconds to an `HH:MM:SS` string.
pub fn seconds_to_hms(seconds: i64) -> String {
    let seconds = seconds.max(0);
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;
    format!("{hours:02}:{minutes:02}:{secs:02}")
}

// ============================================================================
// Lag Time
// ============================================================================

/// A lag-time estimate.
///
/// `AwaitingPump` is the sentinel for zero pump output — lag time is
/// undefined while the fluid column is stationary. It is deliberately
/// distinct from `Seconds(0)`, which means the cuttings have surfaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LagTime {
    /// Estimated seconds for cuttings to travel bit → surface
    Seconds(i64),
    /// Pump output is zero; no estimate can be made yet
    AwaitingPump,
}

impl LagTime {
    /// Numeric seconds, if an estimate exists.
    pub fn seconds(&self) -> Option<i64> {
        match self {
            LagTime::Seconds(s) => Some(*s),
            LagTime::AwaitingPump => None,
        }
    }

    /// `HH:MM:SS` rendering for the persisted audit row.
    pub fn hms(&self) -> String {
        match self {
            LagTime::Seconds(s) => seconds_to_hms(*s),
            LagTime::AwaitingPump => AWAITING_PUMP_PLACEHOLDER.to_string(),
        }
    }
}

impl std::fmt::Display for LagTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LagTime::Seconds(s) => write!(f, "{} ({}s)", seconds_to_hms(*s), s),
            LagTime::AwaitingPump => write!(f, "awaiting pump speed"),
        }
    }
}

// ============================================================================
// Published Result
// ============================================================================

/// One published lag-time estimate for a sample.
///
/// Created from a [`WellGeometryParameters`] snapshot; superseded (never
/// mutated) whenever inputs change — the superseding result carries a fresh
/// `published_at` and the countdown re-baselines from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LagTimeResult {
    /// The estimate itself
    pub lag: LagTime,
    /// Pump output (bbl/min) the estimate was computed at
    pub pump_output: f64,
    /// Drill string partition the volumes were computed from
    pub segments: SegmentLengths,
    /// Annular volumes per zone (bbl)
    pub volumes: AnnularVolumes,
    /// Depth the tracked cuttings slug currently sits at (ft)
    pub cutting_depth: f64,
    /// Wall-clock time this estimate was computed / last revised
    pub published_at: NaiveDateTime,
}

// ============================================================================
// Sample Status
// ============================================================================

/// Countdown status of a tracked sample.
///
/// `Completed` is terminal: there is no transition out of it.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default, Hash)]
pub enum SampleStatus {
    /// Cuttings are in transit (or frozen while pump output is zero)
    #[default]
    Running,
    /// Cuttings have reached the surface
    Completed,
}

impl SampleStatus {
    /// Get short code for logging
    pub fn short_code(&self) -> &'static str {
        match self {
            SampleStatus::Running => "RUN",
            SampleStatus::Completed => "DONE",
        }
    }
}

impl std::fmt::Display for SampleStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SampleStatus::Running => write!(f, "Running"),
            SampleStatus::Completed => write!(f, "Completed"),
        }
    }
}

// ============================================================================
// Tracking State
// ============================================================================

/// Per-sample countdown state, owned exclusively by the engine.
///
/// One instance per unique sample name. Never destroyed during a session —
/// completed samples stay in the store for audit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleTrackingState {
    /// Unique sample name (e.g. `sample_3000`)
    pub name: String,
    /// Lag estimate at the current baseline (seconds; 0 while awaiting pump)
    pub initial_lag_secs: i64,
    /// Pump speed at the current baseline (spm)
    pub initial_pump_speed: f64,
    /// Wall-clock time the current baseline was set
    pub start_time: NaiveDateTime,
    /// Remaining seconds to surface; `None` while awaiting pump output
    pub remaining_secs: Option<i64>,
    /// Countdown status
    pub status: SampleStatus,
    /// Latest published estimate (superseded wholesale on revision)
    pub result: LagTimeResult,
    /// Latest input snapshot, kept for revisions and template copies
    pub params: WellGeometryParameters,
}

impl SampleTrackingState {
    /// Fraction of the countdown already elapsed, 0.0–1.0.
    ///
    /// `None` while awaiting pump output or when the baseline lag is zero.
    pub fn progress(&self) -> Option<f64> {
        if self.status == SampleStatus::Completed {
            return Some(1.0);
        }
        let remaining = self.remaining_secs? as f64;
        if self.initial_lag_secs <= 0 {
            return None;
        }
        let ratio = remaining / self.initial_lag_secs as f64;
        Some((1.0 - ratio).clamp(0.0, 1.0))
    }
}

/// Read-only view of one tracked sample for the control surface.
#[derive(Debug, Clone, Serialize)]
pub struct SampleSnapshot {
    pub name: String,
    pub status: SampleStatus,
    /// Remaining seconds; `None` while awaiting pump output
    pub remaining_secs: Option<i64>,
    /// Display form: `HH:MM:SS`, or `—` while awaiting pump output
    pub remaining_display: String,
    /// Percent of the countdown elapsed, when known
    pub progress_percent: Option<u8>,
    /// Depth the cuttings slug currently sits at (ft)
    pub cutting_depth: f64,
    /// Pump output of the current baseline (bbl/min)
    pub pump_output: f64,
}

impl SampleSnapshot {
    pub fn from_state(state: &SampleTrackingState) -> Self {
        let remaining_display = match (state.status, state.remaining_secs) {
            (SampleStatus::Completed, _) => seconds_to_hms(0),
            (SampleStatus::Running, Some(s)) => seconds_to_hms(s),
            (SampleStatus::Running, None) => "—".to_string(),
        };
        Self {
            name: state.name.clone(),
            status: state.status,
            remaining_secs: state.remaining_secs,
            remaining_display,
            progress_percent: state.progress().map(|p| (p * 100.0).round() as u8),
            cutting_depth: state.result.cutting_depth,
            pump_output: state.result.pump_output,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hms_renders_zero_padded() {
        assert_eq!(seconds_to_hms(0), "00:00:00");
        assert_eq!(seconds_to_hms(2409), "00:40:09");
        assert_eq!(seconds_to_hms(3661), "01:01:01");
        assert_eq!(seconds_to_hms(-5), "00:00:00");
    }

    #[test]
    fn awaiting_pump_is_not_zero_seconds() {
        assert_ne!(LagTime::AwaitingPump, LagTime::Seconds(0));
        assert_eq!(LagTime::AwaitingPump.seconds(), None);
        assert_eq!(LagTime::AwaitingPump.hms(), AWAITING_PUMP_PLACEHOLDER);
        assert_eq!(LagTime::Seconds(0).hms(), "00:00:00");
    }
}
