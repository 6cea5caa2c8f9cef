// In-memory index of report locations answering radius queries.
//
// The map lives behind an `Arc` that writers replace copy-on-write, so a query
// takes a snapshot under the read lock and scans it after the lock is released.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use super::geo;
use super::model::{Coordinate, DisasterReport, ReportId};

#[derive(Default)]
pub struct ProximityIndex {
    reports: RwLock<Arc<HashMap<ReportId, DisasterReport>>>,
}

impl ProximityIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a report or replace the one with the same id.
    /// Returns the previous version, if any.
    pub fn upsert(&self, report: DisasterReport) -> Option<DisasterReport> {
        let mut guard = self.reports.write().unwrap_or_else(PoisonError::into_inner);
        Arc::make_mut(&mut *guard).insert(report.id.clone(), report)
    }

    pub fn remove(&self, id: &str) -> Option<DisasterReport> {
        let mut guard = self.reports.write().unwrap_or_else(PoisonError::into_inner);
        if !guard.contains_key(id) {
            return None;
        }
        Arc::make_mut(&mut *guard).remove(id)
    }

    /// Empty the index in one step; readers see either every report or none.
    pub fn clear(&self) {
        let mut guard = self.reports.write().unwrap_or_else(PoisonError::into_inner);
        *guard = Arc::new(HashMap::new());
    }

    pub fn get(&self, id: &str) -> Option<DisasterReport> {
        self.snapshot_map().get(id).cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.snapshot_map().contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.snapshot_map().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every report whose distance from `center` is at most `radius_meters`.
    /// Order is unspecified. A radius on the boundary counts as inside.
    pub fn query_radius(&self, center: Coordinate, radius_meters: f64) -> Vec<DisasterReport> {
        let reports = self.snapshot_map();
        reports
            .values()
            .filter(|report| geo::distance(center, report.location()) <= radius_meters)
            .cloned()
            .collect()
    }

    /// All indexed reports, oldest first.
    pub fn snapshot(&self) -> Vec<DisasterReport> {
        let mut all: Vec<DisasterReport> = self.snapshot_map().values().cloned().collect();
        all.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        all
    }

    /// Default center for an overview map: the oldest report's location.
    pub fn overview_center(&self) -> Option<Coordinate> {
        self.snapshot_map()
            .values()
            .min_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)))
            .map(DisasterReport::location)
    }

    fn snapshot_map(&self) -> Arc<HashMap<ReportId, DisasterReport>> {
        self.reports.read().unwrap_or_else(PoisonError::into_inner).clone()
    }
}
