//! # Fleet Insights
//!
//! Geofencing and behavioral analytics for geolocated device telemetry.
//!
//! The engine consumes finite, already-collected batches of device samples
//! (latitude/longitude/speed/battery/signal, ISO-8601 timestamps) and derives
//! higher-level spatial and behavioral facts:
//!
//! - which geofences a device entered or left, and when ([`events`])
//! - how long it dwelled inside each zone ([`dwell`])
//! - whether it violated restricted-zone / required-zone / speed rules ([`violations`])
//! - where its movement segments ("trips") begin and end ([`trips`])
//! - what fraction of its traveled distance tracked defined zones ([`efficiency`])
//! - a render-friendly reduction of its path and markers ([`simplify`], [`markers`])
//! - how its speed is distributed and how clean the data is ([`speed`])
//! - a composite health/maintenance signal ([`health`])
//!
//! Everything is synchronous, single-threaded, and pure: every operation
//! consumes immutable input snapshots and returns new derived data. Repeated
//! calls with identical inputs produce identical outputs, and no state leaks
//! between invocations. Malformed domain data never panics the engine; it
//! degrades to `None`, empty collections, or zeroed summaries (see the module
//! docs for each component's documented defaults).
//!
//! ## Quick Start
//!
//! ```rust
//! use fleet_insights::{Geofence, TelemetryPoint, detect_geofence_events};
//! use chrono::{TimeZone, Utc};
//!
//! let zone = Geofence::circle("depot", "Depot", 40.7128, -74.0060, 1000.0);
//!
//! let points = vec![
//!     TelemetryPoint::new(40.70, -74.00, Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap()),
//!     TelemetryPoint::new(40.7128, -74.0060, Utc.with_ymd_and_hms(2024, 3, 1, 10, 1, 0).unwrap()),
//! ];
//!
//! let events = detect_geofence_events(&points, std::slice::from_ref(&zone));
//! assert_eq!(events.len(), 1); // one Entry as the device reaches the depot
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub mod geo_utils;
pub mod normalize;

pub mod events;
pub mod dwell;
pub mod violations;

pub mod trips;
pub mod efficiency;

pub mod simplify;
pub mod markers;

pub mod speed;
pub mod health;

pub use normalize::{normalize_record, normalize_telemetry, sort_by_time, RawTelemetryRecord};

pub use events::{detect_geofence_events, GeofenceEvent, GeofenceEventType};
pub use dwell::{calculate_dwell_time, format_duration, DwellSummary};
pub use violations::{detect_violations, Severity, Violation, ViolationRules, ViolationType};

pub use trips::{segment_trips, Trip, TripConfig};
pub use efficiency::{calculate_route_efficiency, RouteEfficiency};

pub use markers::{cluster_markers, Marker, MarkerLabel};
pub use simplify::simplify_path;

pub use speed::{
    assess_data_quality, calculate_speed_statistics, compute_speed_categories,
    extract_valid_speeds, DataQualityReport, FindingSeverity, QualityFinding, SpeedBand,
    SpeedBandSummary, SpeedStatistics,
};

pub use health::{
    calculate_health_score, predict_maintenance, HealthBreakdown, HealthConfig, HealthScore,
    HealthStatus, MaintenancePrediction, MaintenancePriority,
};

// ============================================================================
// Core Types
// ============================================================================

const MIN_LAT: f64 = -90.0;
const MAX_LAT: f64 = 90.0;
const MIN_LNG: f64 = -180.0;
const MAX_LNG: f64 = 180.0;

/// A single normalized telemetry sample.
///
/// Produced by [`normalize::normalize_telemetry`] and immutable from then on.
/// Coordinates are guaranteed finite and in range; optional numeric fields are
/// `None` when the raw record carried nothing usable, never `NaN`.
///
/// # Example
/// ```
/// use fleet_insights::TelemetryPoint;
/// use chrono::Utc;
///
/// let p = TelemetryPoint::new(51.5074, -0.1278, Utc::now()).with_speed(42.0);
/// assert!(p.has_valid_coords());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetryPoint {
    pub latitude: f64,
    pub longitude: f64,
    pub timestamp: DateTime<Utc>,
    pub speed_kmh: Option<f64>,
    pub battery_pct: Option<f64>,
    pub signal_pct: Option<f64>,
    pub device_id: String,
}

impl TelemetryPoint {
    /// Create a point with coordinates and a timestamp; optional fields start empty.
    pub fn new(latitude: f64, longitude: f64, timestamp: DateTime<Utc>) -> Self {
        Self {
            latitude,
            longitude,
            timestamp,
            speed_kmh: None,
            battery_pct: None,
            signal_pct: None,
            device_id: String::new(),
        }
    }

    /// Builder-style speed setter (handy in tests and fixtures).
    pub fn with_speed(mut self, kmh: f64) -> Self {
        self.speed_kmh = Some(kmh);
        self
    }

    /// Builder-style battery setter.
    pub fn with_battery(mut self, pct: f64) -> Self {
        self.battery_pct = Some(pct);
        self
    }

    /// Builder-style signal setter.
    pub fn with_signal(mut self, pct: f64) -> Self {
        self.signal_pct = Some(pct);
        self
    }

    /// Builder-style device id setter.
    pub fn with_device(mut self, device_id: &str) -> Self {
        self.device_id = device_id.to_string();
        self
    }

    /// Check that the coordinates are finite and within WGS84 range.
    pub fn has_valid_coords(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (MIN_LAT..=MAX_LAT).contains(&self.latitude)
            && (MIN_LNG..=MAX_LNG).contains(&self.longitude)
    }
}

/// A named spatial region used as a membership-test boundary.
///
/// Supplied externally by the zone definition store; identity is `id`.
/// Serialized with a `type` discriminator (`"circle"` / `"polygon"`), which is
/// the shape the zone store emits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Geofence {
    #[serde(rename_all = "camelCase")]
    Circle {
        id: String,
        name: String,
        center_lat: f64,
        center_lng: f64,
        radius_meters: f64,
    },
    #[serde(rename_all = "camelCase")]
    Polygon {
        id: String,
        name: String,
        /// Ordered (lat, lng) vertex list. Fewer than 3 vertices never matches.
        #[serde(rename = "coordinates")]
        vertices: Vec<(f64, f64)>,
    },
}

impl Geofence {
    /// Convenience constructor for a circular zone.
    pub fn circle(id: &str, name: &str, center_lat: f64, center_lng: f64, radius_meters: f64) -> Self {
        Self::Circle {
            id: id.to_string(),
            name: name.to_string(),
            center_lat,
            center_lng,
            radius_meters,
        }
    }

    /// Convenience constructor for a polygonal zone.
    pub fn polygon(id: &str, name: &str, vertices: Vec<(f64, f64)>) -> Self {
        Self::Polygon {
            id: id.to_string(),
            name: name.to_string(),
            vertices,
        }
    }

    /// Zone identity.
    pub fn id(&self) -> &str {
        match self {
            Self::Circle { id, .. } | Self::Polygon { id, .. } => id,
        }
    }

    /// Human-readable zone name.
    pub fn name(&self) -> &str {
        match self {
            Self::Circle { name, .. } | Self::Polygon { name, .. } => name,
        }
    }

    /// Membership test for a telemetry point.
    ///
    /// Degenerate shapes (non-positive or non-finite radius, polygons with
    /// fewer than 3 vertices) return `false` rather than erroring. Polygon
    /// boundary behavior is undefined: a point exactly on an edge may land on
    /// either side.
    pub fn contains(&self, point: &TelemetryPoint) -> bool {
        if !point.has_valid_coords() {
            return false;
        }
        match self {
            Self::Circle {
                center_lat,
                center_lng,
                radius_meters,
                ..
            } => geo_utils::point_in_circle(
                point.latitude,
                point.longitude,
                *center_lat,
                *center_lng,
                *radius_meters,
            ),
            Self::Polygon { vertices, .. } => {
                geo_utils::point_in_polygon(point.latitude, point.longitude, vertices)
            }
        }
    }
}

/// Bounding box for a telemetry track.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Bounds {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

impl Bounds {
    /// Create bounds from telemetry points. Returns `None` for empty input.
    pub fn from_points(points: &[TelemetryPoint]) -> Option<Self> {
        if points.is_empty() {
            return None;
        }
        let mut min_lat = f64::MAX;
        let mut max_lat = f64::MIN;
        let mut min_lng = f64::MAX;
        let mut max_lng = f64::MIN;

        for p in points {
            min_lat = min_lat.min(p.latitude);
            max_lat = max_lat.max(p.latitude);
            min_lng = min_lng.min(p.longitude);
            max_lng = max_lng.max(p.longitude);
        }

        Some(Self { min_lat, max_lat, min_lng, max_lng })
    }

    /// Center of the box as (lat, lng).
    pub fn center(&self) -> (f64, f64) {
        (
            (self.min_lat + self.max_lat) / 2.0,
            (self.min_lng + self.max_lng) / 2.0,
        )
    }

    /// Diagonal extent of the box in degree space.
    ///
    /// Used by the path simplifier to scale its tolerance to the track's
    /// geographic spread.
    pub fn diagonal_degrees(&self) -> f64 {
        let dlat = self.max_lat - self.min_lat;
        let dlng = self.max_lng - self.min_lng;
        (dlat * dlat + dlng * dlng).sqrt()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 10, min, 0).unwrap()
    }

    #[test]
    fn test_point_coord_validation() {
        assert!(TelemetryPoint::new(51.5074, -0.1278, ts(0)).has_valid_coords());
        assert!(!TelemetryPoint::new(91.0, 0.0, ts(0)).has_valid_coords());
        assert!(!TelemetryPoint::new(0.0, 181.0, ts(0)).has_valid_coords());
        assert!(!TelemetryPoint::new(f64::NAN, 0.0, ts(0)).has_valid_coords());
    }

    #[test]
    fn test_geofence_accessors() {
        let circle = Geofence::circle("z1", "Depot", 40.0, -74.0, 500.0);
        assert_eq!(circle.id(), "z1");
        assert_eq!(circle.name(), "Depot");

        let poly = Geofence::polygon("z2", "Yard", vec![(0.0, 0.0), (0.0, 1.0), (1.0, 0.0)]);
        assert_eq!(poly.id(), "z2");
        assert_eq!(poly.name(), "Yard");
    }

    #[test]
    fn test_geofence_contains_dispatch() {
        let circle = Geofence::circle("z1", "Depot", 40.7128, -74.0060, 1000.0);
        let inside = TelemetryPoint::new(40.7128, -74.0060, ts(0));
        let outside = TelemetryPoint::new(41.0, -74.0, ts(0));
        assert!(circle.contains(&inside));
        assert!(!circle.contains(&outside));
    }

    #[test]
    fn test_geofence_contains_rejects_invalid_point() {
        let circle = Geofence::circle("z1", "Depot", 40.7128, -74.0060, 1000.0);
        let bogus = TelemetryPoint::new(f64::NAN, -74.0060, ts(0));
        assert!(!circle.contains(&bogus));
    }

    #[test]
    fn test_geofence_deserializes_tagged_shape() {
        let json = r#"{
            "type": "circle",
            "id": "depot",
            "name": "Depot",
            "centerLat": 40.7128,
            "centerLng": -74.0060,
            "radiusMeters": 1000.0
        }"#;
        let fence: Geofence = serde_json::from_str(json).unwrap();
        assert_eq!(fence.id(), "depot");

        let json = r#"{
            "type": "polygon",
            "id": "yard",
            "name": "Yard",
            "coordinates": [[0.0, 0.0], [0.0, 1.0], [1.0, 1.0], [1.0, 0.0]]
        }"#;
        let fence: Geofence = serde_json::from_str(json).unwrap();
        assert_eq!(fence.name(), "Yard");
    }

    #[test]
    fn test_bounds_from_points() {
        let points = vec![
            TelemetryPoint::new(51.50, -0.13, ts(0)),
            TelemetryPoint::new(51.51, -0.12, ts(1)),
            TelemetryPoint::new(51.505, -0.125, ts(2)),
        ];
        let bounds = Bounds::from_points(&points).unwrap();
        assert_eq!(bounds.min_lat, 51.50);
        assert_eq!(bounds.max_lat, 51.51);
        assert_eq!(bounds.min_lng, -0.13);
        assert_eq!(bounds.max_lng, -0.12);

        let (clat, clng) = bounds.center();
        assert!((clat - 51.505).abs() < 1e-9);
        assert!((clng - (-0.125)).abs() < 1e-9);
    }

    #[test]
    fn test_bounds_empty_input() {
        assert!(Bounds::from_points(&[]).is_none());
    }
}
