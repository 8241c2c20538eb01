//! Persistence: parameter tables in, append-only result rows out
//!
//! Both sides are plain CSV so the files stay readable next to the
//! spreadsheet tooling the rig crews already use:
//! - `params`: one table per sample with its historical input estimates;
//!   the engine consumes the last row as current state.
//! - `results`: one append-only audit table per sample; every published
//!   estimate adds a row, nothing is ever overwritten.

pub mod params;
pub mod results;

pub use params::ParameterBook;
pub use results::{CsvResultsLog, MemorySink, ResultRow, ResultSink};

use std::path::PathBuf;

/// Persistence errors.
///
/// An append failure leaves engine state valid in memory — the caller may
/// retry persistence independently.
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed row in {path}: {reason}")]
    Malformed { path: PathBuf, reason: String },
}
