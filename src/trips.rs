//! Trip segmentation.
//!
//! A threshold-driven state machine that partitions a telemetry stream into
//! contiguous movement segments. A trip opens on the first sample moving
//! faster than the start threshold and closes once the device has been at or
//! below the stop threshold for a confirmed number of consecutive samples
//! (debouncing brief halts at junctions or in traffic).
//!
//! A trip still open when the batch ends is discarded rather than finalized.
//! This mirrors the observed upstream behavior; it loses the final trip of a
//! batch that never idles, so stricter callers should append a trailing idle
//! period to the batch if they need that trip emitted.

use crate::{geo_utils::haversine_meters, normalize::sort_by_time, TelemetryPoint};
use chrono::{DateTime, Utc};
use log::debug;
use serde::Serialize;

/// Thresholds for the trip state machine.
#[derive(Debug, Clone)]
pub struct TripConfig {
    /// Speed that opens a trip, km/h. Default: 5.
    pub min_start_speed_kmh: f64,
    /// Speed at or below which a sample counts toward idle confirmation, km/h. Default: 2.
    pub min_stop_speed_kmh: f64,
    /// Consecutive idle samples required to close a trip. Default: 3.
    pub idle_confirm_count: u32,
}

impl Default for TripConfig {
    fn default() -> Self {
        Self {
            min_start_speed_kmh: 5.0,
            min_stop_speed_kmh: 2.0,
            idle_confirm_count: 3,
        }
    }
}

/// A finalized movement segment.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Trip {
    pub start_time: DateTime<Utc>,
    pub start_lat: f64,
    pub start_lng: f64,
    pub end_time: DateTime<Utc>,
    pub end_lat: f64,
    pub end_lng: f64,
    /// Cumulative haversine distance, rounded to millimeter precision.
    pub distance_km: f64,
    pub duration_min: f64,
    pub avg_speed_kmh: f64,
    pub max_speed_kmh: f64,
    pub point_count: u32,
}

// Working state for the trip currently being built.
struct ActiveTrip {
    first: TelemetryPoint,
    last: TelemetryPoint,
    distance_m: f64,
    speed_sum: f64,
    max_speed: f64,
    point_count: u32,
    idle_count: u32,
}

impl ActiveTrip {
    fn open(point: &TelemetryPoint, speed: f64) -> Self {
        Self {
            first: point.clone(),
            last: point.clone(),
            distance_m: 0.0,
            speed_sum: speed,
            max_speed: speed,
            point_count: 1,
            idle_count: 0,
        }
    }

    fn append(&mut self, point: &TelemetryPoint, speed: f64) {
        self.distance_m += haversine_meters(
            self.last.latitude,
            self.last.longitude,
            point.latitude,
            point.longitude,
        );
        self.speed_sum += speed;
        self.max_speed = self.max_speed.max(speed);
        self.point_count += 1;
        self.last = point.clone();
    }

    fn finalize(self) -> Trip {
        let duration_min =
            (self.last.timestamp - self.first.timestamp).num_milliseconds() as f64 / 60_000.0;
        let distance_km = (self.distance_m / 1000.0 * 1e6).round() / 1e6;

        Trip {
            start_time: self.first.timestamp,
            start_lat: self.first.latitude,
            start_lng: self.first.longitude,
            end_time: self.last.timestamp,
            end_lat: self.last.latitude,
            end_lng: self.last.longitude,
            distance_km,
            duration_min,
            avg_speed_kmh: self.speed_sum / self.point_count as f64,
            max_speed_kmh: self.max_speed,
            point_count: self.point_count,
        }
    }
}

/// Partition a telemetry batch into finalized trips.
///
/// Samples without a usable speed or with invalid coordinates are skipped
/// entirely and affect no state transition. Working state lives only for the
/// duration of the call.
///
/// # Example
/// ```
/// use fleet_insights::{segment_trips, TelemetryPoint, TripConfig};
/// use chrono::{TimeZone, Utc};
///
/// let t = |m| Utc.with_ymd_and_hms(2024, 3, 1, 10, m, 0).unwrap();
/// let points: Vec<TelemetryPoint> = vec![
///     TelemetryPoint::new(40.700, -74.000, t(0)).with_speed(0.0),
///     TelemetryPoint::new(40.701, -74.000, t(1)).with_speed(30.0),
///     TelemetryPoint::new(40.702, -74.000, t(2)).with_speed(35.0),
///     TelemetryPoint::new(40.703, -74.000, t(3)).with_speed(0.0),
///     TelemetryPoint::new(40.703, -74.000, t(4)).with_speed(0.0),
///     TelemetryPoint::new(40.703, -74.000, t(5)).with_speed(0.0),
/// ];
///
/// let trips = segment_trips(&points, &TripConfig::default());
/// assert_eq!(trips.len(), 1);
/// assert_eq!(trips[0].max_speed_kmh, 35.0);
/// ```
pub fn segment_trips(points: &[TelemetryPoint], config: &TripConfig) -> Vec<Trip> {
    if points.is_empty() {
        return vec![];
    }

    let sorted = sort_by_time(points);

    let mut trips = Vec::new();
    let mut active: Option<ActiveTrip> = None;

    for point in &sorted {
        if !point.has_valid_coords() {
            continue;
        }
        let Some(speed) = point.speed_kmh else {
            continue;
        };

        if let Some(trip) = active.as_mut() {
            trip.append(point, speed);

            if speed <= config.min_stop_speed_kmh {
                trip.idle_count += 1;
                if trip.idle_count >= config.idle_confirm_count {
                    if let Some(done) = active.take() {
                        trips.push(done.finalize());
                    }
                }
            } else {
                trip.idle_count = 0;
            }
        } else if speed > config.min_start_speed_kmh {
            active = Some(ActiveTrip::open(point, speed));
        }
    }

    if let Some(open) = active {
        // Never idle-confirmed before the batch ended; see the module docs.
        debug!(
            "segment_trips: dropping unterminated trip with {} points starting {}",
            open.point_count, open.first.timestamp
        );
    }

    trips
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 10, min, 0).unwrap()
    }

    fn p(min: u32, lat: f64, speed: f64) -> TelemetryPoint {
        TelemetryPoint::new(lat, -74.0, ts(min)).with_speed(speed)
    }

    fn driving_then_stopped() -> Vec<TelemetryPoint> {
        vec![
            p(0, 40.700, 0.0),
            p(1, 40.701, 30.0), // trip opens
            p(2, 40.702, 40.0),
            p(3, 40.703, 20.0),
            p(4, 40.704, 0.0), // idle 1
            p(5, 40.704, 0.0), // idle 2
            p(6, 40.704, 0.0), // idle 3 -> finalized
        ]
    }

    #[test]
    fn test_single_trip_lifecycle() {
        let trips = segment_trips(&driving_then_stopped(), &TripConfig::default());

        assert_eq!(trips.len(), 1);
        let trip = &trips[0];
        assert_eq!(trip.start_time, ts(1));
        assert_eq!(trip.end_time, ts(6));
        assert_eq!(trip.start_lat, 40.701);
        assert_eq!(trip.end_lat, 40.704);
        assert_eq!(trip.point_count, 6);
        assert_eq!(trip.max_speed_kmh, 40.0);
        assert_eq!(trip.duration_min, 5.0);
        // mean of 30, 40, 20, 0, 0, 0
        assert!((trip.avg_speed_kmh - 15.0).abs() < 1e-9);
        assert!(trip.distance_km > 0.0);
    }

    #[test]
    fn test_distance_is_cumulative_haversine() {
        let trips = segment_trips(&driving_then_stopped(), &TripConfig::default());
        // 40.701 -> 40.704 is ~333m of latitude
        let km = trips[0].distance_km;
        assert!(km > 0.30 && km < 0.36, "distance was {km}");
    }

    #[test]
    fn test_brief_halt_does_not_close_trip() {
        let points = vec![
            p(0, 40.700, 30.0),
            p(1, 40.701, 0.0), // idle 1
            p(2, 40.702, 0.0), // idle 2
            p(3, 40.703, 25.0), // moving again, counter resets
            p(4, 40.704, 0.0),
            p(5, 40.704, 0.0),
            p(6, 40.704, 0.0), // now confirmed
        ];
        let trips = segment_trips(&points, &TripConfig::default());
        assert_eq!(trips.len(), 1);
        assert_eq!(trips[0].point_count, 7);
    }

    #[test]
    fn test_two_trips_in_one_batch() {
        let mut points = driving_then_stopped();
        points.extend(vec![
            p(10, 40.710, 50.0),
            p(11, 40.712, 45.0),
            p(12, 40.713, 0.0),
            p(13, 40.713, 0.0),
            p(14, 40.713, 0.0),
        ]);
        let trips = segment_trips(&points, &TripConfig::default());
        assert_eq!(trips.len(), 2);
        assert_eq!(trips[1].max_speed_kmh, 50.0);
    }

    #[test]
    fn test_unterminated_trip_is_dropped() {
        let points = vec![p(0, 40.700, 30.0), p(1, 40.701, 40.0), p(2, 40.702, 35.0)];
        let trips = segment_trips(&points, &TripConfig::default());
        assert!(trips.is_empty());
    }

    #[test]
    fn test_slow_samples_never_open_a_trip() {
        let points = vec![p(0, 40.700, 3.0), p(1, 40.701, 4.9), p(2, 40.702, 5.0)];
        assert!(segment_trips(&points, &TripConfig::default()).is_empty());
    }

    #[test]
    fn test_missing_speed_samples_are_skipped() {
        let mut points = driving_then_stopped();
        // A speedless sample mid-trip must not reset or advance the idle counter.
        points.insert(4, TelemetryPoint::new(40.7035, -74.0, ts(3) + chrono::Duration::seconds(30)));
        let trips = segment_trips(&points, &TripConfig::default());
        assert_eq!(trips.len(), 1);
        assert_eq!(trips[0].point_count, 6); // the skipped sample was never appended
    }

    #[test]
    fn test_empty_input() {
        assert!(segment_trips(&[], &TripConfig::default()).is_empty());
    }

    #[test]
    fn test_repeat_calls_are_identical() {
        let points = driving_then_stopped();
        let config = TripConfig::default();
        assert_eq!(segment_trips(&points, &config), segment_trips(&points, &config));
    }
}
