//! Host loop and control surface
//!
//! The engine only computes; this module decides cadence. A single
//! cooperative loop polls `tick(now)` on a fixed interval, drains control
//! commands, and performs persistence synchronously after each state
//! change. There is no background thread and nothing here blocks on I/O
//! inside an engine operation.

pub mod commands;
pub mod tracker_loop;

pub use commands::{CommandEvent, CommandSource, ControlCommand, NullSource, StdinSource};
pub use tracker_loop::{TrackerLoop, TrackerStats};
