// Great-circle distance and map zoom derivation.

use serde::Serialize;

use super::model::Coordinate;

/// Mean Earth radius (IUGG), meters.
pub const EARTH_RADIUS_METERS: f64 = 6_371_008.8;

pub const MIN_ZOOM: f64 = 1.0;
pub const MAX_ZOOM: f64 = 18.0;

/// Radius that maps to the reference zoom level.
const REFERENCE_RADIUS_METERS: f64 = 500.0;
const REFERENCE_ZOOM: f64 = 16.0;

/// Haversine distance between two coordinates, in meters.
pub fn distance(a: Coordinate, b: Coordinate) -> f64 {
    let dlat = (b.lat - a.lat).to_radians();
    let dlng = (b.lng - a.lng).to_radians();
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlng / 2.0).sin().powi(2);
    // Rounding can push h a hair above 1 for antipodal points
    2.0 * EARTH_RADIUS_METERS * h.min(1.0).sqrt().asin()
}

/// Map zoom level for a radius: `16 - log2(radius / 500)` clamped to [1, 18].
///
/// Non-increasing in `radius_meters`. Zero and negative radii give the closest zoom,
/// NaN gives the widest one, so the result is always in range.
pub fn zoom_level(radius_meters: f64) -> f64 {
    if radius_meters.is_nan() {
        return MIN_ZOOM;
    }
    if radius_meters <= 0.0 {
        return MAX_ZOOM;
    }
    let zoom = REFERENCE_ZOOM - (radius_meters / REFERENCE_RADIUS_METERS).log2();
    zoom.clamp(MIN_ZOOM, MAX_ZOOM)
}

/// Axis-aligned box around a circle, used to fit a map view.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GeoBounds {
    pub south_west: Coordinate,
    pub north_east: Coordinate,
}

impl GeoBounds {
    pub fn contains(&self, point: Coordinate) -> bool {
        point.lat >= self.south_west.lat
            && point.lat <= self.north_east.lat
            && point.lng >= self.south_west.lng
            && point.lng <= self.north_east.lng
    }
}

/// Bounding box of the circle of `radius_meters` around `center`.
/// Longitude spans are clamped to [-180, 180] rather than wrapped.
pub fn bounds(center: Coordinate, radius_meters: f64) -> GeoBounds {
    let radius = radius_meters.max(0.0);
    let dlat = (radius / EARTH_RADIUS_METERS).to_degrees();
    let cos_lat = center.lat.to_radians().cos();
    let dlng = if cos_lat.abs() < f64::EPSILON {
        180.0
    } else {
        (dlat / cos_lat).min(180.0)
    };

    GeoBounds {
        south_west: Coordinate::new((center.lat - dlat).max(-90.0), (center.lng - dlng).max(-180.0)),
        north_east: Coordinate::new((center.lat + dlat).min(90.0), (center.lng + dlng).min(180.0)),
    }
}
