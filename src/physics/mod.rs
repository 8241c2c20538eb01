//! Lag-time physics: annular geometry and volumetric conversion
//!
//! Pure, deterministic calculations — no side effects, no clock, no config
//! lookups. The countdown engine consumes [`compute`] output; everything
//! time-dependent lives there.

mod annulus;

pub use annulus::*;
