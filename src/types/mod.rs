//! Shared data structures for lag-time estimation and sample tracking
//!
//! - Geometry: WellGeometryParameters (calculator input), SegmentLengths,
//!   AnnularVolumes (calculator output)
//! - Tracking: LagTime, LagTimeResult (published estimates),
//!   SampleTrackingState / SampleSnapshot (countdown state)

mod geometry;
mod sample;

pub use geometry::*;
pub use sample::*;
