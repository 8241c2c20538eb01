//! TrackingStore — explicit owned home for all sample countdown state
//!
//! One shared in-memory structure with a defined lifecycle: `new()` for a
//! fresh session, populated from persistence at startup, `reset()` to drop
//! a session. Mutated only through engine operations on the single control
//! thread; nothing in here is process-global.

use std::collections::BTreeMap;

use crate::types::{SampleSnapshot, SampleStatus, SampleTrackingState};

/// All tracked samples for one session, keyed by unique sample name.
#[derive(Debug, Clone, Default)]
pub struct TrackingStore {
    samples: BTreeMap<String, SampleTrackingState>,
}

impl TrackingStore {
    /// Create an empty store for a fresh session.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.samples.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&SampleTrackingState> {
        self.samples.get(name)
    }

    pub(crate) fn get_mut(&mut self, name: &str) -> Option<&mut SampleTrackingState> {
        self.samples.get_mut(name)
    }

    /// Insert a freshly created sample and return a reference to it.
    pub(crate) fn insert(&mut self, state: SampleTrackingState) -> &SampleTrackingState {
        let name = state.name.clone();
        self.samples.insert(name.clone(), state);
        &self.samples[&name]
    }

    /// Iterate samples in name order.
    pub fn iter(&self) -> impl Iterator<Item = &SampleTrackingState> {
        self.samples.values()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut SampleTrackingState> {
        self.samples.values_mut()
    }

    /// Snapshot of every tracked sample for the control surface.
    pub fn snapshot(&self) -> Vec<SampleSnapshot> {
        self.samples.values().map(SampleSnapshot::from_state).collect()
    }

    pub fn running_count(&self) -> usize {
        self.samples
            .values()
            .filter(|s| s.status == SampleStatus::Running)
            .count()
    }

    pub fn completed_count(&self) -> usize {
        self.samples
            .values()
            .filter(|s| s.status == SampleStatus::Completed)
            .count()
    }

    /// True when every tracked sample has surfaced (vacuously true when
    /// nothing is tracked — callers decide what an empty session means).
    pub fn all_completed(&self) -> bool {
        self.samples
            .values()
            .all(|s| s.status == SampleStatus::Completed)
    }

    /// Drop every tracked sample, ending the session.
    pub fn reset(&mut self) {
        self.samples.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::LagEngine;
    use crate::types::WellGeometryParameters;
    use chrono::NaiveDate;

    fn start_one(store: &mut TrackingStore, name: &str, pump_speed: f64) {
        let params = WellGeometryParameters {
            surface_length: 100.0,
            casing_shoe_depth: 4000.0,
            collar_length: 300.0,
            hole_depth: 5000.0,
            pump_speed,
            ..WellGeometryParameters::default()
        };
        let now = NaiveDate::from_ymd_opt(2024, 3, 5)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap();
        LagEngine::new().start(store, name, params, now).unwrap();
    }

    #[test]
    fn counts_track_status() {
        let mut store = TrackingStore::new();
        assert!(store.is_empty());
        assert!(store.all_completed(), "vacuously true when empty");

        start_one(&mut store, "a", 60.0);
        start_one(&mut store, "b", 60.0);

        assert_eq!(store.len(), 2);
        assert_eq!(store.running_count(), 2);
        assert_eq!(store.completed_count(), 0);
        assert!(!store.all_completed());
    }

    #[test]
    fn reset_ends_the_session() {
        let mut store = TrackingStore::new();
        start_one(&mut store, "a", 60.0);
        store.reset();
        assert!(store.is_empty());
        assert!(!store.contains("a"));
    }

    #[test]
    fn snapshot_iterates_in_name_order() {
        let mut store = TrackingStore::new();
        start_one(&mut store, "sample_b", 60.0);
        start_one(&mut store, "sample_a", 60.0);

        let names: Vec<String> = store.snapshot().into_iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["sample_a", "sample_b"]);
    }
}
