//! Per-sample parameter tables
//!
//! One CSV table per sample under the params directory, each row one
//! historical input estimate. The engine consumes only the last row as the
//! sample's current parameters; edits made through the control surface are
//! appended so the input tables stay an audit trail too.

use std::collections::{BTreeMap, HashMap};
use std::fs::OpenOptions;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::warn;

use super::PersistenceError;
use crate::types::WellGeometryParameters;

/// Column order of a parameter table.
pub const PARAM_COLUMNS: [&str; 11] = [
    "pipe_od",
    "collar_od",
    "riser_id",
    "casing_id",
    "open_hole_diameter",
    "surface_length",
    "casing_shoe_depth",
    "collar_length",
    "hole_depth",
    "pump_speed",
    "pump_coefficient",
];

/// All parameter tables for a session, keyed by sample name (file stem).
#[derive(Debug)]
pub struct ParameterBook {
    dir: PathBuf,
    default_coefficient: f64,
    tables: BTreeMap<String, WellGeometryParameters>,
}

impl ParameterBook {
    /// Load every `*.csv` table under `dir`, keeping the last valid row of
    /// each. Unreadable tables are skipped with a warning; a missing
    /// directory is created empty.
    pub fn load<P: AsRef<Path>>(dir: P, default_coefficient: f64) -> Result<Self, PersistenceError> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir).map_err(|e| PersistenceError::Io {
            path: dir.clone(),
            source: e,
        })?;

        let mut tables = BTreeMap::new();
        let entries = std::fs::read_dir(&dir).map_err(|e| PersistenceError::Io {
            path: dir.clone(),
            source: e,
        })?;

        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("csv") {
                continue;
            }
            let Some(name) = path.file_stem().and_then(|s| s.to_str()).map(String::from) else {
                continue;
            };
            match read_last_row(&path, default_coefficient) {
                Ok(Some(params)) => {
                    tables.insert(name, params);
                }
                Ok(None) => warn!(path = %path.display(), "Parameter table has no valid rows"),
                Err(e) => warn!(path = %path.display(), error = %e, "Skipping parameter table"),
            }
        }

        Ok(Self {
            dir,
            default_coefficient,
            tables,
        })
    }

    /// Current parameters for one sample (last table row).
    pub fn get(&self, name: &str) -> Option<&WellGeometryParameters> {
        self.tables.get(name)
    }

    /// Iterate `(sample name, current parameters)` in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &WellGeometryParameters)> {
        self.tables.iter()
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Append one parameter row to a sample's table (creating it with a
    /// header when new) and update the in-memory view.
    pub fn append(
        &mut self,
        name: &str,
        params: &WellGeometryParameters,
    ) -> Result<(), PersistenceError> {
        let path = self.dir.join(format!("{name}.csv"));
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
            writeln!(writer, "{}", PARAM_COLUMNS.join(",")).map_err(io_err)?;
        }
        // `{}` keeps the shortest round-trip form — a 9.625" casing ID must
        // not come back as 9.63 on the next load.
        writeln!(
            writer,
            "{},{},{},{},{},{},{},{},{},{},{}",
            params.pipe_od,
            params.collar_od,
            params.riser_id,
            params.casing_id,
            params.open_hole_diameter,
            params.surface_length,
            params.casing_shoe_depth,
            params.collar_length,
            params.hole_depth,
            params.pump_speed,
            params.pump_coefficient,
        )
        .map_err(io_err)?;
        writer.flush().map_err(io_err)?;

        self.tables.insert(name.to_string(), params.clone());
        Ok(())
    }
}

/// Parse one table, returning its last valid data row.
fn read_last_row(
    path: &Path,
    default_coefficient: f64,
) -> Result<Option<WellGeometryParameters>, PersistenceError> {
    let contents = std::fs::read_to_string(path).map_err(|e| PersistenceError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;

    let mut lines = contents.lines().filter(|l| !l.trim().is_empty());
    let Some(header) = lines.next() else {
        return Ok(None);
    };

    let columns: HashMap<&str, usize> = header
        .split(',')
        .map(str::trim)
        .enumerate()
        .map(|(idx, col)| (col, idx))
        .collect();

    for required in PARAM_COLUMNS.iter().filter(|c| **c != "pump_coefficient") {
        if !columns.contains_key(required) {
            return Err(PersistenceError::Malformed {
                path: path.to_path_buf(),
                reason: format!("missing column '{required}'"),
            });
        }
    }

    let mut last = None;
    for (line_no, line) in lines.enumerate() {
        match parse_row(line, &columns, default_coefficient) {
            Ok(params) => last = Some(params),
            Err(reason) => {
                warn!(
                    path = %path.display(),
                    line = line_no + 2,
                    reason,
                    "Skipping malformed parameter row"
                );
            }
        }
    }

    Ok(last)
}

fn parse_row(
    line: &str,
    columns: &HashMap<&str, usize>,
    default_coefficient: f64,
) -> Result<WellGeometryParameters, String> {
    let fields: Vec<&str> = line.split(',').map(str::trim).collect();

    let float = |col: &str| -> Result<f64, String> {
        let idx = *columns.get(col).ok_or_else(|| format!("missing {col}"))?;
        let raw = fields.get(idx).ok_or_else(|| format!("short row at {col}"))?;
        raw.parse::<f64>().map_err(|e| format!("{col}: {e}"))
    };

    let pump_coefficient = match columns.get("pump_coefficient") {
        Some(&idx) => match fields.get(idx) {
            Some(raw) if !raw.is_empty() => raw
                .parse::<f64>()
                .map_err(|e| format!("pump_coefficient: {e}"))?,
            _ => default_coefficient,
        },
        None => default_coefficient,
    };

    Ok(WellGeometryParameters {
        pipe_od: float("pipe_od")?,
        collar_od: float("collar_od")?,
        riser_id: float("riser_id")?,
        casing_id: float("casing_id")?,
        open_hole_diameter: float("open_hole_diameter")?,
        surface_length: float("surface_length")?,
        casing_shoe_depth: float("casing_shoe_depth")?,
        collar_length: float("collar_length")?,
        hole_depth: float("hole_depth")?,
        pump_speed: float("pump_speed")?,
        pump_coefficient,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DEFAULT_PUMP_COEFFICIENT;

    fn write_table(dir: &Path, name: &str, contents: &str) {
        std::fs::write(dir.join(format!("{name}.csv")), contents).unwrap();
    }

    #[test]
    fn last_row_wins() {
        let dir = tempfile::tempdir().unwrap();
        write_table(
            dir.path(),
            "sample_5000",
            "pipe_od,collar_od,riser_id,casing_id,open_hole_diameter,surface_length,casing_shoe_depth,collar_length,hole_depth,pump_speed,pump_coefficient\n\
             5.00,6.75,19.50,9.63,8.50,100.00,4000.00,300.00,4800.00,55.00,0.1372\n\
             5.00,6.75,19.50,9.63,8.50,100.00,4000.00,300.00,5000.00,60.00,0.1372\n",
        );

        let book = ParameterBook::load(dir.path(), DEFAULT_PUMP_COEFFICIENT).unwrap();
        let params = book.get("sample_5000").unwrap();
        assert_eq!(params.hole_depth, 5000.0);
        assert_eq!(params.pump_speed, 60.0);
    }

    #[test]
    fn malformed_rows_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        write_table(
            dir.path(),
            "sample_5000",
            "pipe_od,collar_od,riser_id,casing_id,open_hole_diameter,surface_length,casing_shoe_depth,collar_length,hole_depth,pump_speed\n\
             5.00,6.75,19.50,9.63,8.50,100.00,4000.00,300.00,5000.00,60.00\n\
             not,a,valid,row,at,all,x,y,z,w\n",
        );

        let book = ParameterBook::load(dir.path(), DEFAULT_PUMP_COEFFICIENT).unwrap();
        let params = book.get("sample_5000").unwrap();
        // Last *valid* row wins; the pump coefficient falls back to default.
        assert_eq!(params.hole_depth, 5000.0);
        assert_eq!(params.pump_coefficient, DEFAULT_PUMP_COEFFICIENT);
    }

    #[test]
    fn missing_required_column_skips_table() {
        let dir = tempfile::tempdir().unwrap();
        write_table(dir.path(), "broken", "pipe_od,collar_od\n5.00,6.75\n");

        let book = ParameterBook::load(dir.path(), DEFAULT_PUMP_COEFFICIENT).unwrap();
        assert!(book.get("broken").is_none());
        assert!(book.is_empty());
    }

    #[test]
    fn append_creates_header_and_updates_view() {
        let dir = tempfile::tempdir().unwrap();
        let mut book = ParameterBook::load(dir.path(), DEFAULT_PUMP_COEFFICIENT).unwrap();

        let params = WellGeometryParameters {
            surface_length: 100.0,
            casing_shoe_depth: 4000.0,
            collar_length: 300.0,
            hole_depth: 5000.0,
            pump_speed: 60.0,
            ..WellGeometryParameters::default()
        };
        book.append("sample_5000", &params).unwrap();

        let contents =
            std::fs::read_to_string(dir.path().join("sample_5000.csv")).unwrap();
        assert!(contents.starts_with(&PARAM_COLUMNS.join(",")));
        assert_eq!(book.get("sample_5000"), Some(&params));

        // Reload round-trips.
        let reloaded = ParameterBook::load(dir.path(), DEFAULT_PUMP_COEFFICIENT).unwrap();
        assert_eq!(reloaded.get("sample_5000"), Some(&params));
    }
}
