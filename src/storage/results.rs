//! Append-only per-sample result tables
//!
//! One CSV file per sample under the results directory. Every published
//! estimate (initial, revision, arrival) appends exactly one row; prior
//! rows are never rewritten, so each table is a complete audit trail of
//! the sample's countdown.

use std::fs::OpenOptions;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use tracing::warn;

use super::PersistenceError;
use crate::types::{
    AnnularVolumes, LagTime, LagTimeResult, SampleStatus, SampleTrackingState, SegmentLengths,
    AWAITING_PUMP_PLACEHOLDER, TIMESTAMP_FORMAT,
};

/// Column order of a result table. Kept in one place so the writer, the
/// parser, and the tests cannot drift apart.
pub const RESULT_COLUMNS: [&str; 16] = [
    "sample_name",
    "estimated_lag_time_seconds",
    "estimated_lag_time_hms",
    "pump_output",
    "av_surface",
    "av_cased_hole",
    "av_open_hole",
    "casing_below_surface",
    "open_hole_length",
    "collar_in_open_hole",
    "collar_in_casing",
    "pipe_in_open_hole",
    "pipe_in_casing",
    "cutting_depth",
    "is_at_surface",
    "published_at",
];

/// One persisted state-change row.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultRow {
    pub sample_name: String,
    pub lag_secs: i64,
    pub lag_hms: String,
    pub pump_output: f64,
    pub av_surface: f64,
    pub av_cased_hole: f64,
    pub av_open_hole: f64,
    pub casing_below_surface: f64,
    pub open_hole_length: f64,
    pub collar_in_open_hole: f64,
    pub collar_in_casing: f64,
    pub pipe_in_open_hole: f64,
    pub pipe_in_casing: f64,
    pub cutting_depth: f64,
    pub is_at_surface: bool,
    pub published_at: NaiveDateTime,
}

impl ResultRow {
    /// Flatten a tracked sample's current result into a row.
    pub fn from_state(state: &SampleTrackingState) -> Self {
        let result = &state.result;
        Self {
            sample_name: state.name.clone(),
            lag_secs: result.lag.seconds().unwrap_or(0),
            lag_hms: result.lag.hms(),
            pump_output: result.pump_output,
            av_surface: result.volumes.surface,
            av_cased_hole: result.volumes.cased_hole,
            av_open_hole: result.volumes.open_hole,
            casing_below_surface: result.segments.casing_below_surface,
            open_hole_length: result.segments.open_hole,
            collar_in_open_hole: result.segments.collar_in_open_hole,
            collar_in_casing: result.segments.collar_in_casing,
            pipe_in_open_hole: result.segments.pipe_in_open_hole,
            pipe_in_casing: result.segments.pipe_in_casing,
            cutting_depth: result.cutting_depth,
            is_at_surface: state.status == SampleStatus::Completed,
            published_at: result.published_at,
        }
    }

    /// The lag estimate this row recorded.
    ///
    /// A zero pump output (or the awaiting placeholder in the HMS column)
    /// means the estimate was never made, not that it was zero.
    pub fn lag(&self) -> LagTime {
        if self.lag_hms == AWAITING_PUMP_PLACEHOLDER || self.pump_output <= 0.0 {
            LagTime::AwaitingPump
        } else {
            LagTime::Seconds(self.lag_secs)
        }
    }

    /// Rebuild the published result this row was flattened from.
    pub fn to_result(&self) -> LagTimeResult {
        LagTimeResult {
            lag: if self.is_at_surface {
                LagTime::Seconds(0)
            } else {
                self.lag()
            },
            pump_output: self.pump_output,
            segments: SegmentLengths {
                casing_below_surface: self.casing_below_surface,
                open_hole: self.open_hole_length,
                collar_in_open_hole: self.collar_in_open_hole,
                collar_in_casing: self.collar_in_casing,
                pipe_in_open_hole: self.pipe_in_open_hole,
                pipe_in_casing: self.pipe_in_casing,
            },
            volumes: AnnularVolumes {
                open_hole: self.av_open_hole,
                cased_hole: self.av_cased_hole,
                surface: self.av_surface,
            },
            cutting_depth: self.cutting_depth,
            published_at: self.published_at,
        }
    }

    fn to_csv_line(&self) -> String {
        format!(
            "{},{},{},{:.2},{:.2},{:.2},{:.2},{:.2},{:.2},{:.2},{:.2},{:.2},{:.2},{:.2},{},{}",
            self.sample_name,
            self.lag_secs,
            self.lag_hms,
            self.pump_output,
            self.av_surface,
            self.av_cased_hole,
            self.av_open_hole,
            self.casing_below_surface,
            self.open_hole_length,
            self.collar_in_open_hole,
            self.collar_in_casing,
            self.pipe_in_open_hole,
            self.pipe_in_casing,
            self.cutting_depth,
            self.is_at_surface,
            self.published_at.format(TIMESTAMP_FORMAT),
        )
    }

    fn parse(line: &str, path: &Path) -> Result<Self, PersistenceError> {
        let malformed = |reason: String| PersistenceError::Malformed {
            path: path.to_path_buf(),
            reason,
        };

        let fields: Vec<&str> = line.split(',').map(str::trim).collect();
        if fields.len() != RESULT_COLUMNS.len() {
            return Err(malformed(format!(
                "expected {} fields, got {}",
                RESULT_COLUMNS.len(),
                fields.len()
            )));
        }

        let float = |idx: usize| -> Result<f64, PersistenceError> {
            fields[idx]
                .parse::<f64>()
                .map_err(|e| malformed(format!("{}: {e}", RESULT_COLUMNS[idx])))
        };

        Ok(Self {
            sample_name: fields[0].to_string(),
            lag_secs: fields[1]
                .parse::<i64>()
                .map_err(|e| malformed(format!("estimated_lag_time_seconds: {e}")))?,
            lag_hms: fields[2].to_string(),
            pump_output: float(3)?,
            av_surface: float(4)?,
            av_cased_hole: float(5)?,
            av_open_hole: float(6)?,
            casing_below_surface: float(7)?,
            open_hole_length: float(8)?,
            collar_in_open_hole: float(9)?,
            collar_in_casing: float(10)?,
            pipe_in_open_hole: float(11)?,
            pipe_in_casing: float(12)?,
            cutting_depth: float(13)?,
            is_at_surface: fields[14]
                .parse::<bool>()
                .map_err(|e| malformed(format!("is_at_surface: {e}")))?,
            published_at: NaiveDateTime::parse_from_str(fields[15], TIMESTAMP_FORMAT)
                .map_err(|e| malformed(format!("published_at: {e}")))?,
        })
    }
}

// ============================================================================
// Sink Trait
// ============================================================================

/// Pluggable destination for result rows.
///
/// The engine never writes rows itself; the host appends one after each
/// state change. Implementations must keep prior rows intact — the log is
/// an audit trail, not a cache.
pub trait ResultSink: Send {
    /// Append one row to the sample's table.
    fn append(&mut self, row: &ResultRow) -> Result<(), PersistenceError>;

    /// Latest row per sample, for session restore.
    fn last_rows(&self) -> Result<Vec<ResultRow>, PersistenceError>;

    /// Backend name for logging.
    fn backend_name(&self) -> &'static str;
}

// ============================================================================
// CSV File Backend
// ============================================================================

/// Append-only CSV tables, one file per sample.
pub struct CsvResultsLog {
    dir: PathBuf,
}

impl CsvResultsLog {
    /// Open (creating the directory if needed) a results log.
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self, PersistenceError> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir).map_err(|e| PersistenceError::Io {
            path: dir.clone(),
            source: e,
        })?;
        Ok(Self { dir })
    }

    fn table_path(&self, sample_name: &str) -> PathBuf {
        self.dir.join(format!("{sample_name}.csv"))
    }
}

impl ResultSink for CsvResultsLog {
    fn append(&mut self, row: &ResultRow) -> Result<(), PersistenceError> {
        let path = self.table_path(&row.sample_name);
        let io_err = |e: std::io::Error| PersistenceError::Io {
            path: path.clone(),
            source: e,
        };

        let is_new = !path.exists();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(io_err)?;
        let mut writer = BufWriter::new(file);

        if is_new {
            writeln!(writer, "{}", RESULT_COLUMNS.join(",")).map_err(io_err)?;
        }
        writeln!(writer, "{}", row.to_csv_line()).map_err(io_err)?;
        writer.flush().map_err(io_err)?;
        Ok(())
    }

    fn last_rows(&self) -> Result<Vec<ResultRow>, PersistenceError> {
        let entries = std::fs::read_dir(&self.dir).map_err(|e| PersistenceError::Io {
            path: self.dir.clone(),
            source: e,
        })?;

        let mut rows = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("csv") {
                continue;
            }
            let contents = std::fs::read_to_string(&path).map_err(|e| PersistenceError::Io {
                path: path.clone(),
                source: e,
            })?;

            // Last data line wins; malformed tails are skipped with a warning
            // rather than losing the whole session restore.
            let mut lines = contents.lines().filter(|l| !l.trim().is_empty());
            let header = lines.next();
            let last = match header {
                Some(_) => lines.next_back(),
                None => None,
            };
            match last {
                Some(line) => match ResultRow::parse(line, &path) {
                    Ok(row) => rows.push(row),
                    Err(e) => warn!(path = %path.display(), error = %e, "Skipping result table"),
                },
                None => warn!(path = %path.display(), "Result table has no data rows"),
            }
        }

        rows.sort_by(|a, b| a.published_at.cmp(&b.published_at));
        Ok(rows)
    }

    fn backend_name(&self) -> &'static str {
        "csv"
    }
}

// ============================================================================
// In-Memory Backend (tests, minimal deployments)
// ============================================================================

/// In-memory sink. Not durable — rows are lost on restart.
#[derive(Debug, Default)]
pub struct MemorySink {
    rows: Vec<ResultRow>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every appended row, in append order.
    pub fn rows(&self) -> &[ResultRow] {
        &self.rows
    }
}

impl ResultSink for MemorySink {
    fn append(&mut self, row: &ResultRow) -> Result<(), PersistenceError> {
        self.rows.push(row.clone());
        Ok(())
    }

    fn last_rows(&self) -> Result<Vec<ResultRow>, PersistenceError> {
        let mut latest: std::collections::BTreeMap<String, ResultRow> =
            std::collections::BTreeMap::new();
        for row in &self.rows {
            latest.insert(row.sample_name.clone(), row.clone());
        }
        let mut rows: Vec<ResultRow> = latest.into_values().collect();
        rows.sort_by(|a, b| a.published_at.cmp(&b.published_at));
        Ok(rows)
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
