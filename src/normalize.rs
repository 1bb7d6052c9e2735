//! Telemetry normalization.
//!
//! Raw records arrive from the telemetry source with loosely typed fields:
//! numbers may be encoded as strings, optional fields may be absent, and the
//! timestamp may appear under either of two names. This module coerces each
//! record into a strictly typed [`TelemetryPoint`] exactly once, so no other
//! component ever re-validates fields or repeats fallback chains.
//!
//! Rules:
//!
//! - Latitude/longitude must coerce to finite, in-range numbers or the whole
//!   record is discarded.
//! - Timestamp precedence: the device-reported `timestamp` field wins over
//!   the server-normalized `recordedAt`; whichever is present must parse as
//!   ISO-8601 / RFC 3339 or the record is discarded.
//! - Speed, battery and signal coerce independently; anything unparseable or
//!   non-finite becomes `None`, never `NaN`.
//!
//! Discards are logged at debug level and otherwise silent: malformed
//! telemetry is expected input, not an error condition.

use crate::TelemetryPoint;
use chrono::{DateTime, Utc};
use log::debug;
use serde::{Deserialize, Deserializer};

/// A telemetry record as supplied by the source, before normalization.
///
/// Numeric fields accept both JSON numbers and numeric strings; anything else
/// coerces to `None`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawTelemetryRecord {
    #[serde(default, deserialize_with = "lenient_f64")]
    pub latitude: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub longitude: Option<f64>,
    /// Device-reported capture time (ISO-8601).
    #[serde(default)]
    pub timestamp: Option<String>,
    /// Server-normalized receive time (ISO-8601); used when `timestamp` is absent.
    #[serde(default)]
    pub recorded_at: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub speed: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub battery: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub signal: Option<f64>,
    #[serde(default)]
    pub imei: Option<String>,
}

/// Accept a number, a numeric string, or nothing; reject everything else softly.
fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberLike {
        Num(f64),
        Text(String),
    }

    let value = Option::<NumberLike>::deserialize(deserializer)?;
    Ok(match value {
        Some(NumberLike::Num(n)) => sanitize(Some(n)),
        Some(NumberLike::Text(s)) => sanitize(s.trim().parse::<f64>().ok()),
        None => None,
    })
}

/// Collapse non-finite values to `None`; the rest of the engine never sees NaN.
fn sanitize(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite())
}

/// Normalize a single raw record.
///
/// Returns `None` when the record has no usable coordinates or no parseable
/// timestamp under either field name.
pub fn normalize_record(raw: &RawTelemetryRecord) -> Option<TelemetryPoint> {
    let latitude = sanitize(raw.latitude)?;
    let longitude = sanitize(raw.longitude)?;

    // Device-reported time first, server receive time as the fallback.
    let stamp = raw.timestamp.as_deref().or(raw.recorded_at.as_deref())?;
    let timestamp = parse_timestamp(stamp)?;

    let point = TelemetryPoint {
        latitude,
        longitude,
        timestamp,
        speed_kmh: sanitize(raw.speed),
        battery_pct: sanitize(raw.battery),
        signal_pct: sanitize(raw.signal),
        device_id: raw.imei.clone().unwrap_or_default(),
    };

    if !point.has_valid_coords() {
        return None;
    }
    Some(point)
}

/// Normalize a batch of raw records, discarding unusable samples.
///
/// The output preserves input order; use [`sort_by_time`] when chronological
/// order is required.
pub fn normalize_telemetry(records: &[RawTelemetryRecord]) -> Vec<TelemetryPoint> {
    let points: Vec<TelemetryPoint> = records.iter().filter_map(normalize_record).collect();

    let dropped = records.len() - points.len();
    if dropped > 0 {
        debug!("normalize_telemetry: discarded {dropped} of {} records", records.len());
    }

    points
}

/// Return a chronologically sorted copy of the points.
///
/// The sort is stable: samples sharing a timestamp keep their input order,
/// which the event detector's alternation guarantee relies on.
pub fn sort_by_time(points: &[TelemetryPoint]) -> Vec<TelemetryPoint> {
    let mut sorted = points.to_vec();
    sorted.sort_by_key(|p| p.timestamp);
    sorted
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
}
