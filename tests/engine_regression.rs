//! Engine Regression Tests
//!
//! Exercises the lag-time engine through the public API: the fixed
//! reference geometry, the countdown rules under pump-speed changes, and
//! the full track → revise → surface lifecycle with persistence attached.

use chrono::{NaiveDate, NaiveDateTime};
use mudlag::engine::{LagEngine, TrackingStore};
use mudlag::storage::{MemorySink, ResultRow, ResultSink};
use mudlag::types::{LagTime, SampleStatus, WellGeometryParameters};

fn at(hms: &str) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 3, 5)
        .unwrap()
        .and_time(chrono::NaiveTime::parse_from_str(hms, "%H:%M:%S").unwrap())
}

fn reference_params() -> WellGeometryParameters {
    WellGeometryParameters {
        pipe_od: 5.0,
        collar_od: 6.75,
        riser_id: 19.5,
        casing_id: 9.625,
        open_hole_diameter: 8.5,
        surface_length: 100.0,
        casing_shoe_depth: 4000.0,
        collar_length: 300.0,
        hole_depth: 5000.0,
        pump_speed: 60.0,
        pump_coefficient: 0.1372,
    }
}

#[test]
fn reference_geometry_is_reproduced_exactly() {
    let estimate = mudlag::physics::compute(&reference_params());

    assert_eq!(estimate.lag, LagTime::Seconds(2409));
    assert_eq!(estimate.pump_output, 8.23);
    assert_eq!(estimate.volumes.open_hole, 39.89);
    assert_eq!(estimate.volumes.cased_hole, 256.15);
    assert_eq!(estimate.volumes.surface, 34.49);
}

#[test]
fn full_lifecycle_appends_one_row_per_state_change() {
    let mut engine = LagEngine::new();
    let mut store = TrackingStore::new();
    let mut sink = MemorySink::new();

    // Start: first published estimate.
    let state = engine
        .start(&mut store, "sample_5000", reference_params(), at("08:00:00"))
        .unwrap();
    sink.append(&ResultRow::from_state(state)).unwrap();

    // Mid-run pump-speed edit: superseding estimate, fresh baseline.
    engine
        .update_pump_speed(&mut store, 120.0, "2024-03-05 08:10:00", at("08:10:00"))
        .into_iter()
        .for_each(|summary| {
            let state = store.get(&summary.name).unwrap();
            sink.append(&ResultRow::from_state(state)).unwrap();
        });

    // Tick far past the rebaselined lag: arrival row.
    let arrivals = engine.tick(&mut store, at("12:00:00"));
    assert_eq!(arrivals.len(), 1);
    for arrival in &arrivals {
        let state = store.get(&arrival.name).unwrap();
        sink.append(&ResultRow::from_state(state)).unwrap();
    }

    let rows = sink.rows();
    assert_eq!(rows.len(), 3, "start + revision + arrival");

    // Audit trail: rows are appended, never rewritten.
    assert!(!rows[0].is_at_surface);
    assert_eq!(rows[0].lag_secs, 2409);
    assert!(!rows[1].is_at_surface);
    assert!(rows[1].cutting_depth < 5000.0, "depth credit applied");
    assert!(rows[2].is_at_surface);
    assert_eq!(rows[2].lag_secs, 0);
    assert_eq!(rows[2].lag_hms, "00:00:00");

    // Terminal state: further ticks add nothing.
    assert!(engine.tick(&mut store, at("13:00:00")).is_empty());
    assert_eq!(
        store.get("sample_5000").unwrap().status,
        SampleStatus::Completed
    );
}

#[test]
fn pump_speed_rescale_is_exact_halving() {
    // The documented property: 600s of lag at 60 spm reads exactly 300s
    // the moment the pump runs at 120 spm with nothing elapsed.
    let initial_lag = 600.0_f64;
    let rescaled = initial_lag * (60.0 / 120.0);
    assert_eq!(rescaled as i64, 300);
}

#[test]
fn restore_round_trips_through_result_rows() {
    let mut engine = LagEngine::new();
    let mut store = TrackingStore::new();
    let mut sink = MemorySink::new();

    let state = engine
        .start(&mut store, "sample_5000", reference_params(), at("08:00:00"))
        .unwrap();
    sink.append(&ResultRow::from_state(state)).unwrap();

    // A new session restores from the last row per sample.
    let mut engine2 = LagEngine::new();
    let mut store2 = TrackingStore::new();
    for row in sink.last_rows().unwrap() {
        engine2
            .resume(
                &mut store2,
                &row.sample_name,
                reference_params(),
                row.to_result(),
                row.is_at_surface,
            )
            .unwrap();
    }

    let restored = store2.get("sample_5000").unwrap();
    assert_eq!(restored.status, SampleStatus::Running);
    assert_eq!(restored.initial_lag_secs, 2409);
    assert_eq!(restored.initial_pump_speed, 60.0);
    assert_eq!(restored.start_time, at("08:00:00"));

    // Downtime folds into the first tick of the new session.
    engine2.tick(&mut store2, at("08:20:00"));
    assert_eq!(
        store2.get("sample_5000").unwrap().remaining_secs,
        Some(2409 - 1200)
    );
}

#[test]
fn view_state_snapshots_every_sample() {
    let mut engine = LagEngine::new();
    let mut store = TrackingStore::new();
    engine
        .start(&mut store, "sample_5000", reference_params(), at("08:00:00"))
        .unwrap();
    let mut idle = reference_params();
    idle.pump_speed = 0.0;
    engine
        .start(&mut store, "sample_idle", idle, at("08:00:00"))
        .unwrap();

    let snapshots = store.snapshot();
    assert_eq!(snapshots.len(), 2);

    let by_name = |name: &str| snapshots.iter().find(|s| s.name == name).unwrap();
    assert_eq!(by_name("sample_5000").remaining_secs, Some(2409));
    assert_eq!(by_name("sample_idle").remaining_secs, None);
    assert_eq!(by_name("sample_idle").remaining_display, "—");
}
