//! Route efficiency: the fraction of traveled distance spent inside any zone.
//!
//! Distances here use the flat-earth approximation
//! ([`crate::geo_utils::planar_distance_km`]), not the haversine metric the
//! trip segmenter uses. The two calculations are specified independently and
//! intentionally disagree; do not unify them.

use crate::{geo_utils::planar_distance_km, Geofence, TelemetryPoint};
use serde::Serialize;

/// Distance attribution summary for a telemetry track against a zone set.
///
/// All fields are zero when the track has fewer than two points.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteEfficiency {
    pub total_distance_km: f64,
    pub inside_distance_km: f64,
    pub outside_distance_km: f64,
    /// `round(inside / total × 100)`; 0 when total is 0.
    pub efficiency_pct: f64,
}

/// Walk consecutive point pairs and attribute each segment's distance to
/// "inside" or "outside" according to whether the pair's later point lies in
/// *any* supplied zone (union membership, not per-zone).
///
/// # Example
/// ```
/// use fleet_insights::{calculate_route_efficiency, Geofence, TelemetryPoint};
/// use chrono::{TimeZone, Utc};
///
/// let zone = Geofence::circle("depot", "Depot", 40.7128, -74.0060, 2000.0);
/// let t = |m| Utc.with_ymd_and_hms(2024, 3, 1, 10, m, 0).unwrap();
/// let points = vec![
///     TelemetryPoint::new(40.7128, -74.0060, t(0)),
///     TelemetryPoint::new(40.7130, -74.0062, t(1)), // inside
///     TelemetryPoint::new(40.80, -74.10, t(2)),     // outside
/// ];
///
/// let summary = calculate_route_efficiency(&points, std::slice::from_ref(&zone));
/// assert!(summary.inside_distance_km > 0.0);
/// assert!(summary.outside_distance_km > summary.inside_distance_km);
/// ```
pub fn calculate_route_efficiency(
    points: &[TelemetryPoint],
    fences: &[Geofence],
) -> RouteEfficiency {
    if points.len() < 2 {
        return RouteEfficiency::default();
    }

    let mut inside_km = 0.0;
    let mut outside_km = 0.0;

    for pair in points.windows(2) {
        let (from, to) = (&pair[0], &pair[1]);
        let segment_km =
            planar_distance_km(from.latitude, from.longitude, to.latitude, to.longitude);

        if fences.iter().any(|f| f.contains(to)) {
            inside_km += segment_km;
        } else {
            outside_km += segment_km;
        }
    }

    let total_km = inside_km + outside_km;
    let efficiency_pct = if total_km > 0.0 {
        (inside_km / total_km * 100.0).round()
    } else {
        0.0
    };

    RouteEfficiency {
        total_distance_km: total_km,
        inside_distance_km: inside_km,
        outside_distance_km: outside_km,
        efficiency_pct,
    }
}
