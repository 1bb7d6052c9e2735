//! Device health scoring and maintenance prediction.
//!
//! Combines four independently computed sub-scores (battery trend, signal
//! strength, speed data quality, reporting uptime) into a weighted overall
//! score, classifies it into a discrete status, and inspects a short history
//! of overall scores for a sustained downward trend.
//!
//! Weights, status cut points and the maintenance floor live in
//! [`HealthConfig`] rather than inline literals.

use crate::{normalize::sort_by_time, speed::assess_data_quality, TelemetryPoint};
use serde::Serialize;

// =============================================================================
// Configuration
// =============================================================================

/// Weights and thresholds for health scoring.
#[derive(Debug, Clone)]
pub struct HealthConfig {
    pub battery_weight: f64,
    pub connectivity_weight: f64,
    pub data_quality_weight: f64,
    pub uptime_weight: f64,
    /// Overall at or above this is Excellent. Default: 85.
    pub excellent_cutoff: f64,
    /// Overall at or above this is Good. Default: 70.
    pub good_cutoff: f64,
    /// Overall at or above this is Fair; below it, Poor. Default: 50.
    pub fair_cutoff: f64,
    /// Trailing score below this escalates maintenance priority to Critical.
    /// Default: 40.
    pub maintenance_floor: f64,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            battery_weight: 0.30,
            connectivity_weight: 0.20,
            data_quality_weight: 0.25,
            uptime_weight: 0.25,
            excellent_cutoff: 85.0,
            good_cutoff: 70.0,
            fair_cutoff: 50.0,
            maintenance_floor: 40.0,
        }
    }
}

/// Discrete classification of the overall score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Excellent,
    Good,
    Fair,
    Poor,
}

/// Per-component sub-scores, each in [0, 100].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthBreakdown {
    pub battery: f64,
    pub connectivity: f64,
    pub data_quality: f64,
    pub uptime: f64,
}

/// Composite health assessment for one device batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthScore {
    /// Weighted mean of the breakdown, clamped to [0, 100].
    pub overall: f64,
    pub breakdown: HealthBreakdown,
    pub status: HealthStatus,
    pub alerts: Vec<String>,
}

/// Outcome of trend inspection over a score history.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MaintenancePrediction {
    pub needs_maintenance: bool,
    /// Share of declining steps in the history, as a percentage.
    pub confidence: f64,
    pub priority: MaintenancePriority,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MaintenancePriority {
    Low,
    High,
    Critical,
}

// =============================================================================
// Scoring
// =============================================================================

/// Score a device's health from one telemetry batch.
///
/// Sub-scores:
/// - **battery**: latest reported percentage, reduced by half the first-to-last
///   decline when the series is falling; no battery data scores 0.
/// - **connectivity**: mean reported signal percentage; no signal data scores 0.
/// - **data quality**: the speed channel's quality score
///   ([`crate::assess_data_quality`]).
/// - **uptime**: share of consecutive reporting gaps no larger than 3× the
///   median gap (with a 60-second floor on the threshold).
///
/// An empty batch yields a zeroed score with Poor status.
///
/// # Example
/// ```
/// use fleet_insights::{calculate_health_score, HealthConfig, HealthStatus, TelemetryPoint};
/// use chrono::{Duration, TimeZone, Utc};
///
/// let t0 = Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap();
/// let points: Vec<TelemetryPoint> = (0..10)
///     .map(|i| {
///         TelemetryPoint::new(40.0, -74.0, t0 + Duration::seconds(i * 30))
///             .with_speed(40.0)
///             .with_battery(90.0)
///             .with_signal(80.0)
///     })
///     .collect();
///
/// let score = calculate_health_score(&points, &HealthConfig::default());
/// assert_eq!(score.status, HealthStatus::Excellent);
/// ```
pub fn calculate_health_score(points: &[TelemetryPoint], config: &HealthConfig) -> HealthScore {
    if points.is_empty() {
        return HealthScore {
            overall: 0.0,
            breakdown: HealthBreakdown::default(),
            status: HealthStatus::Poor,
            alerts: vec!["No telemetry received".to_string()],
        };
    }

    let sorted = sort_by_time(points);

    let breakdown = HealthBreakdown {
        battery: battery_score(&sorted),
        connectivity: connectivity_score(&sorted),
        data_quality: assess_data_quality(&sorted).quality_score,
        uptime: uptime_score(&sorted),
    };

    let overall = (breakdown.battery * config.battery_weight
        + breakdown.connectivity * config.connectivity_weight
        + breakdown.data_quality * config.data_quality_weight
        + breakdown.uptime * config.uptime_weight)
        .clamp(0.0, 100.0);

    let status = classify(overall, config);

    let mut alerts = Vec::new();
    if breakdown.battery < config.fair_cutoff {
        alerts.push("Battery level is low or declining".to_string());
    }
    if breakdown.connectivity < config.fair_cutoff {
        alerts.push("Signal strength is weak".to_string());
    }
    if breakdown.data_quality < config.fair_cutoff {
        alerts.push("Speed data quality is degraded".to_string());
    }
    if breakdown.uptime < config.fair_cutoff {
        alerts.push("Device is reporting with frequent gaps".to_string());
    }

    HealthScore {
        overall,
        breakdown,
        status,
        alerts,
    }
}

fn classify(overall: f64, config: &HealthConfig) -> HealthStatus {
    if overall >= config.excellent_cutoff {
        HealthStatus::Excellent
    } else if overall >= config.good_cutoff {
        HealthStatus::Good
    } else if overall >= config.fair_cutoff {
        HealthStatus::Fair
    } else {
        HealthStatus::Poor
    }
}

/// Latest battery percentage, penalized by half the net decline over the
/// batch when the series is falling.
fn battery_score(sorted: &[TelemetryPoint]) -> f64 {
    let levels: Vec<f64> = sorted
        .iter()
        .filter_map(|p| p.battery_pct)
        .filter(|b| (0.0..=100.0).contains(b))
        .collect();

    let (Some(first), Some(last)) = (levels.first(), levels.last()) else {
        return 0.0;
    };

    let decline = first - last;
    let score = if decline > 0.0 { last - decline / 2.0 } else { *last };
    score.clamp(0.0, 100.0)
}

/// Mean reported signal percentage.
fn connectivity_score(sorted: &[TelemetryPoint]) -> f64 {
    let signals: Vec<f64> = sorted
        .iter()
        .filter_map(|p| p.signal_pct)
        .filter(|s| (0.0..=100.0).contains(s))
        .collect();

    if signals.is_empty() {
        return 0.0;
    }
    (signals.iter().sum::<f64>() / signals.len() as f64).clamp(0.0, 100.0)
}

/// Share of consecutive reporting gaps within 3× the median gap.
///
/// The gap threshold never drops below 60 seconds, so a device reporting
/// every few seconds is not penalized for ordinary jitter. Fewer than two
/// samples cannot exhibit a gap and score 100.
fn uptime_score(sorted: &[TelemetryPoint]) -> f64 {
    if sorted.len() < 2 {
        return 100.0;
    }

    let gaps: Vec<f64> = sorted
        .windows(2)
        .map(|pair| (pair[1].timestamp - pair[0].timestamp).num_milliseconds() as f64 / 1000.0)
        .collect();

    let mut ordered = gaps.clone();
    ordered.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let median = if ordered.len() % 2 == 0 {
        (ordered[ordered.len() / 2 - 1] + ordered[ordered.len() / 2]) / 2.0
    } else {
        ordered[ordered.len() / 2]
    };

    let threshold = (median * 3.0).max(60.0);
    let within = gaps.iter().filter(|&&g| g <= threshold).count();

    within as f64 / gaps.len() as f64 * 100.0
}

// =============================================================================
// Maintenance Prediction
// =============================================================================

/// Inspect a history of overall scores for a sustained downward trend.
///
/// The history must hold at least 3 scores; shorter input yields
/// `needs_maintenance: false` with zero confidence. Maintenance is flagged
/// when at least 70% of the step-to-step transitions decline and the series
/// has a net drop; confidence is the declining-step share as a percentage.
/// Priority is Critical when the trailing score has fallen below the
/// configured floor, High otherwise.
pub fn predict_maintenance(history: &[f64], config: &HealthConfig) -> MaintenancePrediction {
    if history.len() < 3 {
        return MaintenancePrediction {
            needs_maintenance: false,
            confidence: 0.0,
            priority: MaintenancePriority::Low,
        };
    }

    let steps = history.len() - 1;
    let declining = history.windows(2).filter(|pair| pair[1] < pair[0]).count();
    let decline_ratio = declining as f64 / steps as f64;

    let first = history[0];
    let last = history[history.len() - 1];

    if decline_ratio < 0.7 || last >= first {
        return MaintenancePrediction {
            needs_maintenance: false,
            confidence: 0.0,
            priority: MaintenancePriority::Low,
        };
    }

    let priority = if last < config.maintenance_floor {
        MaintenancePriority::Critical
    } else {
        MaintenancePriority::High
    };

    MaintenancePrediction {
        needs_maintenance: true,
        confidence: decline_ratio * 100.0,
        priority,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap()
    }

    fn steady_batch(n: usize, battery: f64, signal: f64) -> Vec<TelemetryPoint> {
        (0..n)
            .map(|i| {
                TelemetryPoint::new(40.0, -74.0, t0() + Duration::seconds(i as i64 * 30))
                    .with_speed(40.0)
                    .with_battery(battery)
                    .with_signal(signal)
            })
            .collect()
    }

    #[test]
    fn test_healthy_device_scores_excellent() {
        let score = calculate_health_score(&steady_batch(20, 95.0, 90.0), &HealthConfig::default());

        assert!(score.overall >= 85.0);
        assert_eq!(score.status, HealthStatus::Excellent);
        assert!(score.alerts.is_empty());
        assert_eq!(score.breakdown.battery, 95.0);
        assert_eq!(score.breakdown.connectivity, 90.0);
        assert_eq!(score.breakdown.uptime, 100.0);
    }

    #[test]
    fn test_empty_batch_is_poor_and_zeroed() {
        let score = calculate_health_score(&[], &HealthConfig::default());

        assert_eq!(score.overall, 0.0);
        assert_eq!(score.status, HealthStatus::Poor);
        assert_eq!(score.breakdown, HealthBreakdown::default());
        assert!(!score.alerts.is_empty());
    }

    #[test]
    fn test_battery_decline_is_penalized() {
        let mut points = steady_batch(2, 100.0, 90.0);
        points[1].battery_pct = Some(80.0);
        let score = calculate_health_score(&points, &HealthConfig::default());

        // latest 80 minus half the 20-point decline
        assert_eq!(score.breakdown.battery, 70.0);
    }

    #[test]
    fn test_battery_recovery_is_not_penalized() {
        let mut points = steady_batch(2, 50.0, 90.0);
        points[1].battery_pct = Some(90.0); // charged mid-batch
        let score = calculate_health_score(&points, &HealthConfig::default());

        assert_eq!(score.breakdown.battery, 90.0);
    }

    #[test]
    fn test_missing_channels_score_zero() {
        let points: Vec<TelemetryPoint> = (0..5)
            .map(|i| TelemetryPoint::new(40.0, -74.0, t0() + Duration::seconds(i * 30)).with_speed(40.0))
            .collect();
        let score = calculate_health_score(&points, &HealthConfig::default());

        assert_eq!(score.breakdown.battery, 0.0);
        assert_eq!(score.breakdown.connectivity, 0.0);
        assert!(score.alerts.iter().any(|a| a.contains("Battery")));
        assert!(score.alerts.iter().any(|a| a.contains("Signal")));
    }

    #[test]
    fn test_uptime_counts_large_gaps() {
        // Nine 30-second gaps and one 2-hour hole: median 30s, threshold 60s.
        let mut points = steady_batch(10, 90.0, 90.0);
        for p in points.iter_mut().skip(5) {
            p.timestamp = p.timestamp + Duration::hours(2);
        }
        let score = calculate_health_score(&points, &HealthConfig::default());

        assert!((score.breakdown.uptime - 8.0 / 9.0 * 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_uptime_single_sample_is_full() {
        let score = calculate_health_score(&steady_batch(1, 90.0, 90.0), &HealthConfig::default());
        assert_eq!(score.breakdown.uptime, 100.0);
    }

    #[test]
    fn test_status_cut_points() {
        let config = HealthConfig::default();
        assert_eq!(classify(85.0, &config), HealthStatus::Excellent);
        assert_eq!(classify(84.9, &config), HealthStatus::Good);
        assert_eq!(classify(70.0, &config), HealthStatus::Good);
        assert_eq!(classify(50.0, &config), HealthStatus::Fair);
        assert_eq!(classify(49.9, &config), HealthStatus::Poor);
    }

    #[test]
    fn test_prediction_needs_history() {
        let config = HealthConfig::default();
        for history in [&[][..], &[80.0][..], &[80.0, 70.0][..]] {
            let prediction = predict_maintenance(history, &config);
            assert!(!prediction.needs_maintenance);
            assert_eq!(prediction.confidence, 0.0);
            assert_eq!(prediction.priority, MaintenancePriority::Low);
        }
    }

    #[test]
    fn test_monotonic_decline_is_flagged() {
        let prediction = predict_maintenance(&[90.0, 80.0, 70.0, 60.0], &HealthConfig::default());

        assert!(prediction.needs_maintenance);
        assert_eq!(prediction.confidence, 100.0);
        assert_eq!(prediction.priority, MaintenancePriority::High);
    }

    #[test]
    fn test_decline_below_floor_is_critical() {
        let prediction = predict_maintenance(&[70.0, 55.0, 45.0, 35.0], &HealthConfig::default());

        assert!(prediction.needs_maintenance);
        assert_eq!(prediction.priority, MaintenancePriority::Critical);
    }

    #[test]
    fn test_near_monotonic_decline_counts() {
        // 3 of 4 steps decline (75% ≥ 70%) with a net drop.
        let prediction = predict_maintenance(&[90.0, 80.0, 82.0, 70.0, 60.0], &HealthConfig::default());

        assert!(prediction.needs_maintenance);
        assert_eq!(prediction.confidence, 75.0);
    }

    #[test]
    fn test_stable_and_improving_series_pass() {
        let config = HealthConfig::default();
        assert!(!predict_maintenance(&[70.0, 70.0, 70.0, 70.0], &config).needs_maintenance);
        assert!(!predict_maintenance(&[60.0, 70.0, 80.0, 90.0], &config).needs_maintenance);
        // Mostly declining steps but ending above the start: no net drop.
        assert!(!predict_maintenance(&[60.0, 95.0, 90.0, 85.0, 80.0], &config).needs_maintenance);
    }

    #[test]
    fn test_repeat_calls_are_identical() {
        let points = steady_batch(15, 80.0, 75.0);
        let config = HealthConfig::default();
        assert_eq!(
            calculate_health_score(&points, &config),
            calculate_health_score(&points, &config)
        );
    }
}
