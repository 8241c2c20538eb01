//! Well geometry input and derived segment/volume types

use serde::{Deserialize, Serialize};

/// Default pump coefficient (bbl/stroke) when the parameter table omits one.
pub const DEFAULT_PUMP_COEFFICIENT: f64 = 0.1372;

/// Well geometry snapshot for a single lag-time calculation.
///
/// Immutable per calculation call: a revision builds a fresh snapshot rather
/// than mutating the one a result was published from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WellGeometryParameters {
    // === Diameters (inches) ===
    /// External diameter of HWDP / drill pipe
    pub pipe_od: f64,
    /// External diameter of drill collar
    pub collar_od: f64,
    /// Internal diameter of riser
    pub riser_id: f64,
    /// Internal diameter of last casing string
    pub casing_id: f64,
    /// Diameter of open hole below the casing shoe
    pub open_hole_diameter: f64,

    // === Lengths (feet) ===
    /// Surface / wellhead-and-riser section length
    pub surface_length: f64,
    /// Measured depth of the last casing shoe
    pub casing_shoe_depth: f64,
    /// Drill collar string length above the bit
    pub collar_length: f64,
    /// Current hole depth
    pub hole_depth: f64,

    // === Pump ===
    /// Pump speed (strokes per minute)
    pub pump_speed: f64,
    /// Pump capacity coefficient (bbl/stroke)
    #[serde(default = "default_pump_coefficient")]
    pub pump_coefficient: f64,
}

fn default_pump_coefficient() -> f64 {
    DEFAULT_PUMP_COEFFICIENT
}

impl Default for WellGeometryParameters {
    fn default() -> Self {
        Self {
            pipe_od: 5.0,
            collar_od: 6.75,
            riser_id: 19.5,
            casing_id: 9.625,
            open_hole_diameter: 8.5, // Common default
            surface_length: 0.0,
            casing_shoe_depth: 0.0,
            collar_length: 0.0,
            hole_depth: 0.0,
            pump_speed: 0.0,
            pump_coefficient: DEFAULT_PUMP_COEFFICIENT,
        }
    }
}

impl WellGeometryParameters {
    /// Validate the snapshot before it reaches the calculator.
    ///
    /// Every diameter and length must be non-negative and the pump
    /// coefficient positive. Returns the first offending field.
    /// Collar length may exceed the hole depth: a revision tracks the
    /// cuttings slug at depths above the collar string.
    pub fn validate(&self) -> Result<(), String> {
        let non_negative = [
            ("pipe_od", self.pipe_od),
            ("collar_od", self.collar_od),
            ("riser_id", self.riser_id),
            ("casing_id", self.casing_id),
            ("open_hole_diameter", self.open_hole_diameter),
            ("surface_length", self.surface_length),
            ("casing_shoe_depth", self.casing_shoe_depth),
            ("collar_length", self.collar_length),
            ("hole_depth", self.hole_depth),
            ("pump_speed", self.pump_speed),
        ];

        for (field, value) in non_negative {
            if !value.is_finite() {
                return Err(format!("{field} is not a finite number ({value})"));
            }
            if value < 0.0 {
                return Err(format!("{field} must be non-negative (got {value})"));
            }
        }

        if !self.pump_coefficient.is_finite() || self.pump_coefficient <= 0.0 {
            return Err(format!(
                "pump_coefficient must be positive (got {})",
                self.pump_coefficient
            ));
        }

        Ok(())
    }
}

/// Drill string partition derived from [`WellGeometryParameters`].
///
/// `casing_below_surface` may be negative when the shoe depth is configured
/// above the surface section; it feeds later clamped subtractions and is
/// propagated as-is.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SegmentLengths {
    /// Casing length below the surface section (ft)
    pub casing_below_surface: f64,
    /// Open-hole length below the casing shoe (ft)
    pub open_hole: f64,
    /// Drill collar inside open hole (ft)
    pub collar_in_open_hole: f64,
    /// Drill collar inside casing (ft)
    pub collar_in_casing: f64,
    /// Drill pipe inside open hole (ft)
    pub pipe_in_open_hole: f64,
    /// Drill pipe inside casing (ft)
    pub pipe_in_casing: f64,
}

/// Annular volumes per zone (bbl), each ≥ 0 for valid geometry.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct AnnularVolumes {
    /// Open hole vs. collar/pipe OD
    pub open_hole: f64,
    /// Casing ID vs. collar/pipe OD
    pub cased_hole: f64,
    /// Riser ID vs. pipe OD over the surface length
    pub surface: f64,
}

impl AnnularVolumes {
    /// Total annular volume from bit to surface (bbl).
    pub fn total(&self) -> f64 {
        self.open_hole + self.cased_hole + self.surface
    }
}
