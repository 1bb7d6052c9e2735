//! # Geographic Utilities
//!
//! Geometry primitives for telemetry analysis. Pure functions, no state.
//!
//! ## Overview
//!
//! | Function | Description |
//! |----------|-------------|
//! | [`haversine_meters`] | Great-circle distance between two coordinates |
//! | [`planar_distance_km`] | Flat-earth distance approximation for efficiency ratios |
//! | [`point_in_circle`] | Circular geofence membership test |
//! | [`point_in_polygon`] | Ray-casting polygonal geofence membership test |
//! | [`polyline_length`] | Total length of a telemetry track in meters |
//!
//! ## Algorithm Notes
//!
//! ### Haversine Formula
//!
//! The haversine formula calculates the great-circle distance between two
//! points on a sphere, accurate to within 0.3% for practical GPS work. It is
//! the metric used by circular geofence tests and trip distances.
//!
//! ### Planar Approximation
//!
//! [`planar_distance_km`] treats a degree as a flat 111 km step. It is a
//! deliberately lower-fidelity estimate used only by the route-efficiency
//! calculation, and must not be unified with the haversine metric: the two
//! are specified independently and produce different numbers.
//!
//! ### Coordinate System
//!
//! All functions expect WGS84 coordinates (latitude/longitude in degrees).

use crate::TelemetryPoint;
use geo::{Distance, Haversine, Point};

/// Kilometers spanned by one degree of latitude (flat-earth approximation).
const KM_PER_DEGREE: f64 = 111.0;

// =============================================================================
// Distance Functions
// =============================================================================

/// Calculate the great-circle distance between two coordinates in meters.
///
/// # Example
///
/// ```rust
/// use fleet_insights::geo_utils::haversine_meters;
///
/// // London to Paris is approximately 344 km
/// let dist = haversine_meters(51.5074, -0.1278, 48.8566, 2.3522);
/// assert!((dist - 343_560.0).abs() < 5000.0);
/// ```
#[inline]
pub fn haversine_meters(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    let p1 = Point::new(lng1, lat1);
    let p2 = Point::new(lng2, lat2);
    Haversine::distance(p1, p2)
}

/// Flat-earth distance between two coordinates in kilometers.
///
/// `sqrt(Δlat² + Δlng²) × 111`. Only the route-efficiency calculator uses
/// this metric; everything else uses [`haversine_meters`].
#[inline]
pub fn planar_distance_km(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    let dlat = lat2 - lat1;
    let dlng = lng2 - lng1;
    (dlat * dlat + dlng * dlng).sqrt() * KM_PER_DEGREE
}

/// Calculate the total length of a telemetry track in meters.
///
/// Sums the haversine distance between consecutive points. Empty or
/// single-point tracks return 0.0.
pub fn polyline_length(points: &[TelemetryPoint]) -> f64 {
    if points.len() < 2 {
        return 0.0;
    }

    points
        .windows(2)
        .map(|w| haversine_meters(w[0].latitude, w[0].longitude, w[1].latitude, w[1].longitude))
        .sum()
}

// =============================================================================
// Membership Predicates
// =============================================================================

/// Test whether a coordinate falls within a circular geofence.
///
/// True iff the great-circle distance from the point to the center is at most
/// `radius_meters`. Degenerate circles (non-finite center or non-positive /
/// non-finite radius) never match.
pub fn point_in_circle(
    lat: f64,
    lng: f64,
    center_lat: f64,
    center_lng: f64,
    radius_meters: f64,
) -> bool {
    if !center_lat.is_finite() || !center_lng.is_finite() {
        return false;
    }
    if !radius_meters.is_finite() || radius_meters <= 0.0 {
        return false;
    }
    haversine_meters(lat, lng, center_lat, center_lng) <= radius_meters
}

/// Test whether a coordinate falls within a polygonal geofence.
///
/// Standard ray casting over the ordered `(lat, lng)` edge list: an odd
/// number of edge crossings on a horizontal ray means inside. Polygons with
/// fewer than 3 vertices never match.
///
/// Boundary behavior is undefined: a point exactly on an edge or vertex may
/// test either way depending on floating-point rounding. Callers that need
/// edge-inclusive semantics should buffer the polygon instead.
pub fn point_in_polygon(lat: f64, lng: f64, vertices: &[(f64, f64)]) -> bool {
    if vertices.len() < 3 {
        return false;
    }

    let mut inside = false;
    let mut j = vertices.len() - 1;

    for i in 0..vertices.len() {
        let (lat_i, lng_i) = vertices[i];
        let (lat_j, lng_j) = vertices[j];

        let crosses = (lng_i > lng) != (lng_j > lng)
            && lat < (lat_j - lat_i) * (lng - lng_i) / (lng_j - lng_i) + lat_i;
        if crosses {
            inside = !inside;
        }
        j = i;
    }

    inside
}

// =============================================================================
// Unit Tests
// =============================================================================
