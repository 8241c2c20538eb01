//! Lag-time countdown engine
//!
//! Owns the time-dependent half of the system: per-sample countdown state,
//! the recomputation rules for pump-speed and depth edits, and the
//! Running → Completed transition. The engine is synchronous and
//! scheduling-free — a host loop decides when [`LagEngine::tick`] runs and
//! performs persistence after each state change.

mod store;
mod tracker;

pub use store::TrackingStore;
pub use tracker::{
    parse_timestamp, ArrivalEvent, LagEngine, LagError, ReviseSummary, TimestampParseError,
};
