//! MUDLAG: Drilling Lag-Time Estimation & Sample Tracking
//!
//! Estimates the lag time for drilled cuttings to travel from the bit to
//! the surface through the annular fluid column, and tracks any number of
//! named depth samples as live countdowns that survive pump-speed and
//! depth edits mid-flight.
//!
//! ## Architecture
//!
//! - **Physics**: pure geometry → annular volume → lag-time conversion
//! - **Engine**: countdown state machine (start / tick / revise) over an
//!   explicit [`TrackingStore`]
//! - **Storage**: per-sample CSV parameter tables in, append-only result
//!   audit tables out
//! - **Pipeline**: cooperative host loop that decides tick cadence and
//!   drains control commands

pub mod config;
pub mod engine;
pub mod physics;
pub mod pipeline;
pub mod storage;
pub mod types;

// Re-export configuration
pub use config::TrackerConfig;

// Re-export commonly used types
pub use types::{
    AnnularVolumes, LagTime, LagTimeResult, SampleSnapshot, SampleStatus, SampleTrackingState,
    SegmentLengths, WellGeometryParameters,
};

// Re-export engine components
pub use engine::{ArrivalEvent, LagEngine, LagError, ReviseSummary, TrackingStore};

// Re-export storage
pub use storage::{
    CsvResultsLog, MemorySink, ParameterBook, PersistenceError, ResultRow, ResultSink,
};
