//! Adaptive path simplification for rendering.
//!
//! Reduces a telemetry polyline to a display-friendly point count while
//! preserving its perceived shape. The output is always a strict subset of
//! the input in original order, with the original first and last points
//! pinned. Samples keep their timestamps and metadata, so downstream
//! tooltips and charts stay attached to real measurements.
//!
//! The reduction runs in two stages, the same pipeline the route-signature
//! builder uses for matching:
//!
//! 1. A Douglas-Peucker pass with an adaptive tolerance. The tolerance is
//!    seeded from the track's bounding-box diagonal scaled by the requested
//!    reduction ratio (tightly clustered tracks are simplified more
//!    aggressively relative to their spread) and doubled a bounded number of
//!    times while the pass still exceeds the cap. Turning points survive this
//!    stage preferentially over points on near-straight runs.
//! 2. If the result still exceeds the cap, a uniform index down-sample with
//!    the endpoints re-fixed guarantees it.

use crate::{Bounds, TelemetryPoint};

/// Default rendering cap used when the caller has no preference.
pub const DEFAULT_MAX_POINTS: usize = 100;

/// Upper bound on tolerance-doubling passes before falling back to uniform
/// down-sampling.
const MAX_EPSILON_DOUBLINGS: u32 = 8;

/// Fraction of the bounding-box diagonal used to seed the tolerance.
const EPSILON_SEED_FACTOR: f64 = 1e-3;

/// Reduce a polyline to at most `max_points` points.
///
/// Guarantees, for any input with at least 2 points:
///
/// - `result.len() <= max(max_points, 2)`
/// - `result[0]` and `result[last]` are the original first and last points
/// - every output point is an input point, in original relative order
///
/// Inputs already at or under the cap (including empty, single-point and
/// two-point tracks) are returned unchanged.
///
/// # Example
/// ```
/// use fleet_insights::{simplify_path, TelemetryPoint};
/// use fleet_insights::simplify::DEFAULT_MAX_POINTS;
/// use chrono::{Duration, TimeZone, Utc};
///
/// let t0 = Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap();
/// let points: Vec<TelemetryPoint> = (0..1000)
///     .map(|i| TelemetryPoint::new(40.0 + i as f64 * 1e-4, -74.0, t0 + Duration::seconds(i)))
///     .collect();
///
/// let reduced = simplify_path(&points, DEFAULT_MAX_POINTS);
/// assert!(reduced.len() <= 100);
/// assert_eq!(reduced[0], points[0]);
/// assert_eq!(reduced[reduced.len() - 1], points[999]);
/// ```
pub fn simplify_path(points: &[TelemetryPoint], max_points: usize) -> Vec<TelemetryPoint> {
    let cap = max_points.max(2);
    if points.len() <= cap {
        return points.to_vec();
    }

    let diagonal = Bounds::from_points(points)
        .map(|b| b.diagonal_degrees())
        .unwrap_or(0.0);
    let reduction = 1.0 - cap as f64 / points.len() as f64;

    let mut epsilon = diagonal * reduction * EPSILON_SEED_FACTOR;
    let mut kept = douglas_peucker(points, epsilon);

    for _ in 0..MAX_EPSILON_DOUBLINGS {
        if kept.len() <= cap || epsilon <= 0.0 {
            break;
        }
        epsilon *= 2.0;
        kept = douglas_peucker(points, epsilon);
    }

    let mut result: Vec<TelemetryPoint> = kept.into_iter().map(|i| points[i].clone()).collect();

    if result.len() > cap {
        result = uniform_downsample(&result, cap);
    }

    result
}

/// Douglas-Peucker over point indices.
///
/// Returns the sorted indices of retained points; index 0 and `len - 1` are
/// always retained. Operating on indices (rather than coordinates) keeps the
/// output a subset of the input.
fn douglas_peucker(points: &[TelemetryPoint], epsilon: f64) -> Vec<usize> {
    let n = points.len();
    if n < 3 {
        return (0..n).collect();
    }

    let mut keep = vec![false; n];
    keep[0] = true;
    keep[n - 1] = true;

    // Explicit stack instead of recursion; long noisy tracks would otherwise
    // recurse thousands of frames deep.
    let mut stack = vec![(0usize, n - 1)];

    while let Some((start, end)) = stack.pop() {
        if end <= start + 1 {
            continue;
        }

        let mut max_dist = 0.0;
        let mut max_idx = start;
        for i in (start + 1)..end {
            let dist = perpendicular_distance(&points[i], &points[start], &points[end]);
            if dist > max_dist {
                max_dist = dist;
                max_idx = i;
            }
        }

        if max_dist > epsilon {
            keep[max_idx] = true;
            stack.push((start, max_idx));
            stack.push((max_idx, end));
        }
    }

    (0..n).filter(|&i| keep[i]).collect()
}

/// Perpendicular distance from `p` to the line through `a` and `b`, in degree
/// space. Falls back to point distance when `a` and `b` coincide.
fn perpendicular_distance(p: &TelemetryPoint, a: &TelemetryPoint, b: &TelemetryPoint) -> f64 {
    let dx = b.longitude - a.longitude;
    let dy = b.latitude - a.latitude;
    let norm = (dx * dx + dy * dy).sqrt();

    if norm == 0.0 {
        let px = p.longitude - a.longitude;
        let py = p.latitude - a.latitude;
        return (px * px + py * py).sqrt();
    }

    ((p.longitude - a.longitude) * dy - (p.latitude - a.latitude) * dx).abs() / norm
}

/// Uniformly sample `max` points by index, keeping both endpoints.
///
/// Indices are strictly increasing and distinct whenever `points.len() >= max`.
fn uniform_downsample(points: &[TelemetryPoint], max: usize) -> Vec<TelemetryPoint> {
    let n = points.len();
    if n <= max {
        return points.to_vec();
    }

    (0..max)
        .map(|i| points[i * (n - 1) / (max - 1)].clone())
        .collect()
}
