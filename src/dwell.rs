//! Dwell-time calculation.
//!
//! Measures how long a device remained inside a single zone across a
//! telemetry batch. Self-contained: membership is recomputed from the
//! geometry primitives rather than consuming detector events, so the
//! calculator can run independently of event detection.

use crate::{normalize::sort_by_time, Geofence, TelemetryPoint};
use serde::Serialize;

/// Aggregated time-in-zone for one geofence.
///
/// All durations are in seconds. Every field is zero when the input is empty
/// or the device never entered the zone.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DwellSummary {
    pub total_time_secs: f64,
    pub visits: u32,
    pub avg_time_per_visit_secs: f64,
    pub longest_visit_secs: f64,
    pub shortest_visit_secs: f64,
}

/// Compute dwell-time statistics for a single zone.
///
/// Scans the chronologically sorted points, opening a visit on each
/// outside→inside transition and closing it on inside→outside. A visit still
/// open at stream end is closed at the last sample's timestamp, so durations
/// are always non-negative and every observed entry is counted.
///
/// # Example
/// ```
/// use fleet_insights::{calculate_dwell_time, Geofence, TelemetryPoint};
/// use chrono::{TimeZone, Utc};
///
/// let zone = Geofence::circle("depot", "Depot", 40.7128, -74.0060, 1000.0);
/// let t = |m| Utc.with_ymd_and_hms(2024, 3, 1, 10, m, 0).unwrap();
/// let points = vec![
///     TelemetryPoint::new(40.70, -74.00, t(0)),      // outside
///     TelemetryPoint::new(40.7128, -74.0060, t(1)),  // inside
///     TelemetryPoint::new(40.7128, -74.0060, t(3)),  // still inside
///     TelemetryPoint::new(40.70, -74.00, t(4)),      // outside again
/// ];
///
/// let summary = calculate_dwell_time(&points, &zone);
/// assert_eq!(summary.visits, 1);
/// assert_eq!(summary.total_time_secs, 180.0);
/// ```
pub fn calculate_dwell_time(points: &[TelemetryPoint], fence: &Geofence) -> DwellSummary {
    if points.is_empty() {
        return DwellSummary::default();
    }

    let sorted = sort_by_time(points);

    let mut durations: Vec<f64> = Vec::new();
    let mut open_entry: Option<&TelemetryPoint> = None;

    for point in &sorted {
        let inside = fence.contains(point);
        match (inside, open_entry) {
            (true, None) => open_entry = Some(point),
            (false, Some(entry)) => {
                durations.push(duration_secs(entry, point));
                open_entry = None;
            }
            _ => {}
        }
    }

    // Still inside at stream end: close against the last sample.
    if let (Some(entry), Some(last)) = (open_entry, sorted.last()) {
        durations.push(duration_secs(entry, last));
    }

    if durations.is_empty() {
        return DwellSummary::default();
    }

    let total: f64 = durations.iter().sum();
    let longest = durations.iter().cloned().fold(f64::MIN, f64::max);
    let shortest = durations.iter().cloned().fold(f64::MAX, f64::min);

    DwellSummary {
        total_time_secs: total,
        visits: durations.len() as u32,
        avg_time_per_visit_secs: total / durations.len() as f64,
        longest_visit_secs: longest,
        shortest_visit_secs: shortest,
    }
}

fn duration_secs(entry: &TelemetryPoint, exit: &TelemetryPoint) -> f64 {
    let secs = (exit.timestamp - entry.timestamp).num_milliseconds() as f64 / 1000.0;
    secs.max(0.0)
}

/// Render a duration in seconds as a compact human-readable string.
///
/// ```
/// use fleet_insights::format_duration;
///
/// assert_eq!(format_duration(90.0), "1m 30s");
/// assert_eq!(format_duration(3660.0), "1h 1m");
/// assert_eq!(format_duration(-5.0), "0m");
/// ```
pub fn format_duration(seconds: f64) -> String {
    if !seconds.is_finite() || seconds <= 0.0 {
        return "0m".to_string();
    }

    let total = seconds as u64;
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let secs = total % 60;

    if hours > 0 {
        format!("{hours}h {minutes}m")
    } else if minutes > 0 {
        format!("{minutes}m {secs}s")
    } else {
        format!("{secs}s")
    }
}
