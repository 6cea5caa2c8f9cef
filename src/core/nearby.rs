//! Geofence session around a focus report.
//!
//! Holds the user-adjustable radius and runs the proximity query. The zoom and
//! bounds reported for display always come from the radius of the query that
//! was actually applied, never from a radius that was only set.

use std::sync::Arc;

use serde::Serialize;

use super::error::{Error, Result};
use super::geo::{self, GeoBounds};
use super::model::{Coordinate, DisasterReport};
use super::proximity::ProximityIndex;

pub const DEFAULT_RADIUS_METERS: f64 = 10_000.0;

/// Result of one applied geofence query.
#[derive(Debug, Clone, Serialize)]
pub struct AppliedQuery {
    pub center: Coordinate,
    pub radius_meters: f64,
    pub matches: Vec<DisasterReport>,
    pub zoom: f64,
    pub bounds: GeoBounds,
}

pub struct NearbyQuerySession {
    index: Arc<ProximityIndex>,
    focus: DisasterReport,
    radius_meters: f64,
    applied: Option<AppliedQuery>,
}

impl NearbyQuerySession {
    pub fn new(index: Arc<ProximityIndex>, focus: DisasterReport) -> Self {
        Self {
            index,
            focus,
            radius_meters: DEFAULT_RADIUS_METERS,
            applied: None,
        }
    }

    /// Start a session focused on an indexed report.
    pub fn for_report(index: Arc<ProximityIndex>, id: &str) -> Result<Self> {
        let focus = index
            .get(id)
            .ok_or_else(|| Error::UnknownReport(id.to_string()))?;
        Ok(Self::new(index, focus))
    }

    pub fn focus(&self) -> &DisasterReport {
        &self.focus
    }

    /// Radius the next `apply` will use.
    pub fn radius_meters(&self) -> f64 {
        self.radius_meters
    }

    /// Set the radius in meters. Non-positive or non-finite values are rejected,
    /// the previous radius stays in place.
    pub fn set_radius(&mut self, radius_meters: f64) -> Result<()> {
        if !radius_meters.is_finite() || radius_meters <= 0.0 {
            return Err(Error::InvalidRadius(radius_meters));
        }
        self.radius_meters = radius_meters;
        Ok(())
    }

    pub fn set_radius_km(&mut self, radius_km: f64) -> Result<()> {
        self.set_radius(radius_km * 1000.0)
    }

    /// Query the index with the current radius, then derive the view from it.
    pub fn apply(&mut self) -> &AppliedQuery {
        let center = self.focus.location();
        let radius_meters = self.radius_meters;
        let matches = self.index.query_radius(center, radius_meters);
        log::debug!(
            "Nearby query around {} with radius {:.0} m: {} match(es)",
            self.focus.id,
            radius_meters,
            matches.len()
        );

        self.applied.insert(AppliedQuery {
            center,
            radius_meters,
            matches,
            zoom: geo::zoom_level(radius_meters),
            bounds: geo::bounds(center, radius_meters),
        })
    }

    pub fn last_applied(&self) -> Option<&AppliedQuery> {
        self.applied.as_ref()
    }

    /// Zoom for the last applied query, or for the current radius before the
    /// first apply.
    pub fn zoom(&self) -> f64 {
        match &self.applied {
            Some(applied) => applied.zoom,
            None => geo::zoom_level(self.radius_meters),
        }
    }
}
