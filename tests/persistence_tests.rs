//! Persistence Integration Tests
//!
//! Round-trips a tracking session through the on-disk layout: parameter
//! tables in, append-only result tables out, then a fresh session restore.

use chrono::{NaiveDate, NaiveDateTime};
use mudlag::engine::{LagEngine, TrackingStore};
use mudlag::storage::{CsvResultsLog, ParameterBook, ResultRow, ResultSink};
use mudlag::types::{SampleStatus, DEFAULT_PUMP_COEFFICIENT};

fn at(hms: &str) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 3, 5)
        .unwrap()
        .and_time(chrono::NaiveTime::parse_from_str(hms, "%H:%M:%S").unwrap())
}

const PARAM_HEADER: &str = "pipe_od,collar_od,riser_id,casing_id,open_hole_diameter,\
surface_length,casing_shoe_depth,collar_length,hole_depth,pump_speed,pump_coefficient";

fn write_param_table(dir: &std::path::Path, name: &str, rows: &[&str]) {
    let mut contents = String::from(PARAM_HEADER);
    contents.push('\n');
    for row in rows {
        contents.push_str(row);
        contents.push('\n');
    }
    std::fs::write(dir.join(format!("{name}.csv")), contents).unwrap();
}

#[test]
fn session_survives_a_restart() {
    let params_dir = tempfile::tempdir().unwrap();
    let results_dir = tempfile::tempdir().unwrap();

    write_param_table(
        params_dir.path(),
        "sample_5000",
        &["5.00,6.75,19.50,9.625,8.50,100.00,4000.00,300.00,5000.00,60.00,0.1372"],
    );

    // --- First session: start tracking and persist the first row.
    {
        let book = ParameterBook::load(params_dir.path(), DEFAULT_PUMP_COEFFICIENT).unwrap();
        let mut sink = CsvResultsLog::open(results_dir.path()).unwrap();
        let mut engine = LagEngine::new();
        let mut store = TrackingStore::new();

        let (name, params) = book.iter().next().map(|(n, p)| (n.clone(), p.clone())).unwrap();
        let state = engine.start(&mut store, &name, params, at("08:00:00")).unwrap();
        sink.append(&ResultRow::from_state(state)).unwrap();
    }

    // --- Second session: restore from disk and keep counting down.
    let book = ParameterBook::load(params_dir.path(), DEFAULT_PUMP_COEFFICIENT).unwrap();
    let sink = CsvResultsLog::open(results_dir.path()).unwrap();
    let mut engine = LagEngine::new();
    let mut store = TrackingStore::new();

    for row in sink.last_rows().unwrap() {
        let params = book.get(&row.sample_name).unwrap().clone();
        let completed = row.is_at_surface;
        engine
            .resume(&mut store, &row.sample_name, params, row.to_result(), completed)
            .unwrap();
    }

    let restored = store.get("sample_5000").unwrap();
    assert_eq!(restored.status, SampleStatus::Running);
    assert_eq!(restored.initial_lag_secs, 2409);
    assert_eq!(restored.start_time, at("08:00:00"));

    // 40 minutes of downtime: 2409 - 2400 = 9 seconds left.
    engine.tick(&mut store, at("08:40:00"));
    assert_eq!(store.get("sample_5000").unwrap().remaining_secs, Some(9));
}

#[test]
fn completed_samples_restore_as_completed() {
    let params_dir = tempfile::tempdir().unwrap();
    let results_dir = tempfile::tempdir().unwrap();

    write_param_table(
        params_dir.path(),
        "sample_5000",
        &["5.00,6.75,19.50,9.625,8.50,100.00,4000.00,300.00,5000.00,60.00,0.1372"],
    );

    {
        let book = ParameterBook::load(params_dir.path(), DEFAULT_PUMP_COEFFICIENT).unwrap();
        let mut sink = CsvResultsLog::open(results_dir.path()).unwrap();
        let mut engine = LagEngine::new();
        let mut store = TrackingStore::new();

        let params = book.get("sample_5000").unwrap().clone();
        let state = engine
            .start(&mut store, "sample_5000", params, at("08:00:00"))
            .unwrap();
        sink.append(&ResultRow::from_state(state)).unwrap();

        // Run the countdown to the end and persist the arrival row.
        let arrivals = engine.tick(&mut store, at("10:00:00"));
        assert_eq!(arrivals.len(), 1);
        let state = store.get("sample_5000").unwrap();
        sink.append(&ResultRow::from_state(state)).unwrap();
    }

    let book = ParameterBook::load(params_dir.path(), DEFAULT_PUMP_COEFFICIENT).unwrap();
    let sink = CsvResultsLog::open(results_dir.path()).unwrap();
    let mut engine = LagEngine::new();
    let mut store = TrackingStore::new();

    let rows = sink.last_rows().unwrap();
    assert_eq!(rows.len(), 1, "one sample, last row only");
    assert!(rows[0].is_at_surface);

    for row in rows {
        let params = book.get(&row.sample_name).unwrap().clone();
        engine
            .resume(&mut store, &row.sample_name, params, row.to_result(), true)
            .unwrap();
    }

    let restored = store.get("sample_5000").unwrap();
    assert_eq!(restored.status, SampleStatus::Completed);
    assert_eq!(restored.remaining_secs, Some(0));

    // Completion stays terminal across sessions.
    assert!(engine.tick(&mut store, at("12:00:00")).is_empty());

    // The audit file still holds both historical rows.
    let contents = std::fs::read_to_string(
        results_dir.path().join("sample_5000.csv"),
    )
    .unwrap();
    assert_eq!(contents.lines().count(), 3, "header + start row + arrival row");
}

#[test]
fn parameter_edits_append_to_the_input_table() {
    let params_dir = tempfile::tempdir().unwrap();

    write_param_table(
        params_dir.path(),
        "sample_5000",
        &["5.00,6.75,19.50,9.625,8.50,100.00,4000.00,300.00,5000.00,60.00,0.1372"],
    );

    let mut book = ParameterBook::load(params_dir.path(), DEFAULT_PUMP_COEFFICIENT).unwrap();
    let mut params = book.get("sample_5000").unwrap().clone();
    params.pump_speed = 90.0;
    book.append("sample_5000", &params).unwrap();

    let contents =
        std::fs::read_to_string(params_dir.path().join("sample_5000.csv")).unwrap();
    assert_eq!(contents.lines().count(), 3, "header + original + edit");

    // A reload sees the edit as the current row.
    let reloaded = ParameterBook::load(params_dir.path(), DEFAULT_PUMP_COEFFICIENT).unwrap();
    assert_eq!(reloaded.get("sample_5000").unwrap().pump_speed, 90.0);
}
