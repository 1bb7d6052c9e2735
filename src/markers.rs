//! Marker clustering for map display.
//!
//! Independently of path simplification, the rendering layer caps how many
//! point markers it will draw. This module selects which samples become
//! markers: under the cap every sample is shown; over the cap the first and
//! last samples are always kept (labeled Start/End) and the remainder is
//! filled by uniform index sampling, preserving chronological order with no
//! duplicate picks.

use crate::TelemetryPoint;
use serde::Serialize;

/// Default marker cap used when the caller has no preference.
pub const DEFAULT_MAX_MARKERS: usize = 20;

/// Endpoint label on a marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkerLabel {
    Start,
    End,
}

/// A renderable point marker.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Marker {
    pub point: TelemetryPoint,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<MarkerLabel>,
}

/// Reduce a telemetry track to at most `max_markers` markers.
///
/// The cap is honored exactly, never exceeded:
///
/// - `max_markers < 2`: the first `min(len, max_markers)` points, unlabeled.
/// - `max_markers == 2` (and at least 2 input points): exactly a Start and an
///   End marker, regardless of input size.
/// - Input at or under the cap: every point becomes an unlabeled marker.
/// - Otherwise: Start marker, `max_markers - 2` uniformly sampled interior
///   markers, End marker.
///
/// # Example
/// ```
/// use fleet_insights::{cluster_markers, MarkerLabel, TelemetryPoint};
/// use fleet_insights::markers::DEFAULT_MAX_MARKERS;
/// use chrono::{Duration, TimeZone, Utc};
///
/// let t0 = Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap();
/// let points: Vec<TelemetryPoint> = (0..100)
///     .map(|i| TelemetryPoint::new(40.0 + i as f64 * 1e-3, -74.0, t0 + Duration::seconds(i)))
///     .collect();
///
/// let markers = cluster_markers(&points, DEFAULT_MAX_MARKERS);
/// assert_eq!(markers.len(), 20);
/// assert_eq!(markers[0].label, Some(MarkerLabel::Start));
/// assert_eq!(markers[19].label, Some(MarkerLabel::End));
/// ```
pub fn cluster_markers(points: &[TelemetryPoint], max_markers: usize) -> Vec<Marker> {
    if points.is_empty() {
        return vec![];
    }

    // A cap too small for the Start/End pair: take what fits, unlabeled.
    if max_markers < 2 {
        return points
            .iter()
            .take(max_markers)
            .map(|p| Marker {
                point: p.clone(),
                label: None,
            })
            .collect();
    }

    if max_markers == 2 && points.len() >= 2 {
        return vec![
            Marker {
                point: points[0].clone(),
                label: Some(MarkerLabel::Start),
            },
            Marker {
                point: points[points.len() - 1].clone(),
                label: Some(MarkerLabel::End),
            },
        ];
    }

    if points.len() <= max_markers {
        return points
            .iter()
            .map(|p| Marker {
                point: p.clone(),
                label: None,
            })
            .collect();
    }

    let n = points.len();
    let interior = max_markers.saturating_sub(2);
    let mut markers = Vec::with_capacity(max_markers);

    markers.push(Marker {
        point: points[0].clone(),
        label: Some(MarkerLabel::Start),
    });

    // i * (n-1) / (interior+1) is strictly increasing and never touches the
    // endpoints while n > max_markers, so picks cannot collide.
    for i in 1..=interior {
        let idx = i * (n - 1) / (interior + 1);
        markers.push(Marker {
            point: points[idx].clone(),
            label: None,
        });
    }

    markers.push(Marker {
        point: points[n - 1].clone(),
        label: Some(MarkerLabel::End),
    });

    markers
}
