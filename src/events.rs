//! Geofence entry/exit detection.
//!
//! Scans an ordered telemetry stream against a set of zones and emits one
//! event per inside/outside transition per zone. The per-zone "currently
//! inside" flags live in an explicit accumulator local to each call; no
//! state survives between invocations, and two calls with the same input
//! produce identical output.

use crate::{normalize::sort_by_time, Geofence, TelemetryPoint};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Kind of zone transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GeofenceEventType {
    Entry,
    Exit,
}

impl GeofenceEventType {
    /// Wire/string representation, as consumed by the alerting collaborator.
    pub fn as_str(&self) -> &'static str {
        match self {
            GeofenceEventType::Entry => "entry",
            GeofenceEventType::Exit => "exit",
        }
    }

    /// Parse from the wire representation.
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "entry" => Some(GeofenceEventType::Entry),
            "exit" => Some(GeofenceEventType::Exit),
            _ => None,
        }
    }
}

/// A single zone transition observed in a telemetry stream.
///
/// Produced only by [`detect_geofence_events`]; for any (device, zone) pair
/// the emitted sequence strictly alternates Entry/Exit starting from the
/// first observed transition.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeofenceEvent {
    /// Deterministic id: `{zoneId}-{entry|exit}-{epochMillis}`.
    pub id: String,
    pub event_type: GeofenceEventType,
    pub geofence_id: String,
    pub geofence_name: String,
    /// The sample that triggered the transition.
    pub point: TelemetryPoint,
    pub timestamp: DateTime<Utc>,
}

/// Detect entry/exit events for every zone across a telemetry batch.
///
/// The input need not be sorted; points are ordered by timestamp first
/// (stable with respect to equal timestamps). Each point is re-tested against
/// each zone; a false→true membership flip emits an Entry, true→false an
/// Exit. A device already inside a zone at the first sample produces no
/// synthetic initial Entry.
///
/// Zone identity is `id`: fences sharing an id share a single inside-flag,
/// so their transitions fold together. Supply unique ids per zone.
///
/// O(points × zones); both are bounded per analysis batch.
///
/// # Example
/// ```
/// use fleet_insights::{Geofence, TelemetryPoint, detect_geofence_events, GeofenceEventType};
/// use chrono::{TimeZone, Utc};
///
/// let zone = Geofence::circle("depot", "Depot", 40.7128, -74.0060, 1000.0);
/// let points = vec![
///     TelemetryPoint::new(40.70, -74.00, Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap()),
///     TelemetryPoint::new(40.7128, -74.0060, Utc.with_ymd_and_hms(2024, 3, 1, 10, 1, 0).unwrap()),
/// ];
///
/// let events = detect_geofence_events(&points, std::slice::from_ref(&zone));
/// assert_eq!(events.len(), 1);
/// assert_eq!(events[0].event_type, GeofenceEventType::Entry);
/// ```
pub fn detect_geofence_events(points: &[TelemetryPoint], fences: &[Geofence]) -> Vec<GeofenceEvent> {
    if points.is_empty() || fences.is_empty() {
        return vec![];
    }

    let sorted = sort_by_time(points);

    // Explicit per-zone state threaded through the scan; zones start "outside".
    let mut inside: HashMap<&str, bool> = fences.iter().map(|f| (f.id(), false)).collect();
    let mut events = Vec::new();

    for point in &sorted {
        if !point.has_valid_coords() {
            continue; // skipped without touching per-zone state
        }

        for fence in fences {
            let now_inside = fence.contains(point);
            let was_inside = inside[fence.id()];

            if now_inside != was_inside {
                let event_type = if now_inside {
                    GeofenceEventType::Entry
                } else {
                    GeofenceEventType::Exit
                };
                events.push(GeofenceEvent {
                    id: format!(
                        "{}-{}-{}",
                        fence.id(),
                        event_type.as_str(),
                        point.timestamp.timestamp_millis()
                    ),
                    event_type,
                    geofence_id: fence.id().to_string(),
                    geofence_name: fence.name().to_string(),
                    point: point.clone(),
                    timestamp: point.timestamp,
                });
                inside.insert(fence.id(), now_inside);
            }
        }
    }

    events
}
