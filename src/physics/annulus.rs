//! Annular geometry and lag-time calculation
//!
//! Key calculations for cuttings transport estimation:
//! - Drill string partition (collar/pipe vs. cased/open hole)
//! - Annular volume per zone
//! - Pump output and estimated lag time
//!
//! Every derived step is rounded to 2 decimal places before it feeds the
//! next step, matching the hand calculation a mudlogger does on the 2-dp
//! figures of a tally sheet. The compounding changes totals at the cents
//! level — round only at the end and the numbers drift from the audit log.

use serde::{Deserialize, Serialize};

use crate::types::{AnnularVolumes, LagTime, SegmentLengths, WellGeometryParameters};

/// Annular capacity constant: bbl of fluid per ft of length per in² of
/// annular area difference.
pub const ANNULAR_CAPACITY: f64 = 0.000971;

/// Round to 2 decimal places, half away from zero.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Output of one calculator pass: the partition, the volumes, and the
/// resulting pump output / lag estimate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LagEstimate {
    pub segments: SegmentLengths,
    pub volumes: AnnularVolumes,
    /// Pump output (bbl/min) = pump speed × pump coefficient
    pub pump_output: f64,
    pub lag: LagTime,
}

/// Partition the hole into collar/pipe × cased/open segments.
///
/// `casing_below_surface = casing_shoe_depth − surface_length` may come out
/// negative when the shoe is configured above the surface section; it is
/// propagated as-is because the downstream subtractions are clamped.
pub fn partition_segments(params: &WellGeometryParameters) -> SegmentLengths {
    let casing_below_surface = round2(params.casing_shoe_depth - params.surface_length);
    let casing_length = round2(casing_below_surface + params.surface_length);

    let open_hole = round2((params.hole_depth - casing_length).max(0.0));
    let pipe_in_open_hole = round2((open_hole - params.collar_length).max(0.0));
    let collar_in_casing = round2((params.collar_length - open_hole).max(0.0));
    let pipe_in_casing = round2(casing_below_surface - collar_in_casing);
    let collar_in_open_hole = round2(params.collar_length - collar_in_casing);

    SegmentLengths {
        casing_below_surface,
        open_hole,
        collar_in_open_hole,
        collar_in_casing,
        pipe_in_open_hole,
        pipe_in_casing,
    }
}

/// Annular volumes per zone (bbl).
///
/// Volume per segment = `0.000971 × length × (OD² − ID²)`, with the squared
/// diameters rounded before use and each zone total rounded once.
pub fn annular_volumes(
    params: &WellGeometryParameters,
    segments: &SegmentLengths,
) -> AnnularVolumes {
    let open_hole_sq = round2(params.open_hole_diameter * params.open_hole_diameter);
    let collar_sq = round2(params.collar_od * params.collar_od);
    let pipe_sq = round2(params.pipe_od * params.pipe_od);
    let casing_sq = round2(params.casing_id * params.casing_id);
    let riser_sq = round2(params.riser_id * params.riser_id);

    let open_hole = round2(
        ANNULAR_CAPACITY
            * (segments.collar_in_open_hole * (open_hole_sq - collar_sq)
                + segments.pipe_in_open_hole * (open_hole_sq - pipe_sq)),
    );
    let cased_hole = round2(
        ANNULAR_CAPACITY
            * (segments.collar_in_casing * (casing_sq - collar_sq)
                + segments.pipe_in_casing * (casing_sq - pipe_sq)),
    );
    let surface = round2(ANNULAR_CAPACITY * (params.surface_length * (riser_sq - pipe_sq)));

    AnnularVolumes {
        open_hole,
        cased_hole,
        surface,
    }
}

/// Run the full calculator: partition → volumes → pump output → lag time.
///
/// Formula: `lag_minutes = total annular volume / pump_output` where
/// `pump_output = pump_speed × pump_coefficient` (bbl/min). Lag seconds is
/// the minutes figure truncated to whole seconds.
///
/// `pump_output == 0` makes the lag time undefined — the estimate carries
/// [`LagTime::AwaitingPump`] rather than a numeric zero, which is reserved
/// for a finished countdown.
pub fn compute(params: &WellGeometryParameters) -> LagEstimate {
    let segments = partition_segments(params);
    let volumes = annular_volumes(params, &segments);

    let pump_output = round2(params.pump_coefficient * params.pump_speed);

    let lag = if pump_output > 0.0 {
        let lag_minutes = round2(volumes.total() / pump_output);
        LagTime::Seconds((lag_minutes * 60.0) as i64)
    } else {
        LagTime::AwaitingPump
    };

    LagEstimate {
        segments,
        volumes,
        pump_output,
        lag,
    }
}
