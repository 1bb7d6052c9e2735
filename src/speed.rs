//! Speed distribution analysis.
//!
//! Buckets speeds into fixed categories, computes summary statistics, and
//! scores how trustworthy the speed channel is. All functions are total:
//! empty input yields zero-valued results, never an error.

use crate::TelemetryPoint;
use serde::Serialize;

/// A speed sample is usable when it is finite and within [0, 500] km/h.
const MAX_PLAUSIBLE_SPEED_KMH: f64 = 500.0;

/// Speeds below this count as stationary noise in quality assessment.
const STATIONARY_SPEED_KMH: f64 = 1.0;

/// Speeds above this are flagged as unrealistic for quality assessment.
const UNREALISTIC_SPEED_KMH: f64 = 200.0;

/// Extract usable speed values from a telemetry batch.
///
/// A sample is valid iff it carries a numeric speed in `[0, 500]` km/h.
/// Everything else is excluded here and counted against data quality in
/// [`assess_data_quality`].
pub fn extract_valid_speeds(points: &[TelemetryPoint]) -> Vec<f64> {
    points
        .iter()
        .filter_map(|p| p.speed_kmh)
        .filter(|&s| (0.0..=MAX_PLAUSIBLE_SPEED_KMH).contains(&s))
        .collect()
}

// =============================================================================
// Statistics
// =============================================================================

/// Summary statistics over valid speeds. All zeros on empty input.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeedStatistics {
    pub average: f64,
    pub median: f64,
    pub p90: f64,
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
}

/// Compute average, median, 90th percentile, population standard deviation,
/// min and max over a speed series.
///
/// The median averages the two middle values for even-length input; the 90th
/// percentile is the `ceil(n × 0.9) - 1`th element of the sorted series.
pub fn calculate_speed_statistics(speeds: &[f64]) -> SpeedStatistics {
    if speeds.is_empty() {
        return SpeedStatistics::default();
    }

    let n = speeds.len();
    let mut sorted = speeds.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let sum: f64 = sorted.iter().sum();
    let average = sum / n as f64;

    let median = if n % 2 == 0 {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    } else {
        sorted[n / 2]
    };

    let p90_idx = ((n as f64 * 0.9).ceil() as usize).saturating_sub(1);
    let p90 = sorted[p90_idx.min(n - 1)];

    let variance = sorted.iter().map(|s| (s - average).powi(2)).sum::<f64>() / n as f64;

    SpeedStatistics {
        average,
        median,
        p90,
        std_dev: variance.sqrt(),
        min: sorted[0],
        max: sorted[n - 1],
    }
}

// =============================================================================
// Categories
// =============================================================================

/// The five fixed speed bands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SpeedBand {
    Stationary,
    Slow,
    Moderate,
    Fast,
    VeryFast,
}

impl SpeedBand {
    /// All bands in ascending order.
    pub const ALL: [SpeedBand; 5] = [
        SpeedBand::Stationary,
        SpeedBand::Slow,
        SpeedBand::Moderate,
        SpeedBand::Fast,
        SpeedBand::VeryFast,
    ];

    /// Band limits in km/h; `None` means unbounded above.
    pub fn range_kmh(&self) -> (f64, Option<f64>) {
        match self {
            SpeedBand::Stationary => (0.0, Some(5.0)),
            SpeedBand::Slow => (5.0, Some(30.0)),
            SpeedBand::Moderate => (30.0, Some(60.0)),
            SpeedBand::Fast => (60.0, Some(90.0)),
            SpeedBand::VeryFast => (90.0, None),
        }
    }

    /// Display label for chart legends.
    pub fn label(&self) -> &'static str {
        match self {
            SpeedBand::Stationary => "Stationary",
            SpeedBand::Slow => "Slow",
            SpeedBand::Moderate => "Moderate",
            SpeedBand::Fast => "Fast",
            SpeedBand::VeryFast => "Very Fast",
        }
    }

    /// Classify a speed into its band.
    ///
    /// Bands are half-open `[lo, hi)`, except Fast keeps its upper bound:
    /// 90 km/h is Fast, and Very Fast is strictly above 90.
    pub fn classify(speed: f64) -> SpeedBand {
        if speed < 5.0 {
            SpeedBand::Stationary
        } else if speed < 30.0 {
            SpeedBand::Slow
        } else if speed < 60.0 {
            SpeedBand::Moderate
        } else if speed <= 90.0 {
            SpeedBand::Fast
        } else {
            SpeedBand::VeryFast
        }
    }
}

/// Per-band count and share of valid samples.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeedBandSummary {
    pub band: SpeedBand,
    pub label: &'static str,
    pub min_kmh: f64,
    pub max_kmh: Option<f64>,
    pub count: u32,
    /// Percentage of valid samples; all five sum to 100 (within rounding).
    pub percentage: f64,
}

/// Partition valid speeds into the five fixed bands.
///
/// Always returns exactly five summaries in ascending band order; with no
/// valid samples every count and percentage is zero.
pub fn compute_speed_categories(speeds: &[f64]) -> Vec<SpeedBandSummary> {
    let mut counts = [0u32; 5];
    for &speed in speeds {
        let idx = SpeedBand::ALL
            .iter()
            .position(|b| *b == SpeedBand::classify(speed))
            .unwrap_or(0);
        counts[idx] += 1;
    }

    let total = speeds.len() as f64;

    SpeedBand::ALL
        .iter()
        .zip(counts)
        .map(|(&band, count)| {
            let (min_kmh, max_kmh) = band.range_kmh();
            SpeedBandSummary {
                band,
                label: band.label(),
                min_kmh,
                max_kmh,
                count,
                percentage: if total > 0.0 {
                    count as f64 / total * 100.0
                } else {
                    0.0
                },
            }
        })
        .collect()
}

// =============================================================================
// Data Quality
// =============================================================================

/// Severity of a quality finding, totally ordered for fold-to-max reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FindingSeverity {
    Success,
    Warning,
    Error,
}

/// A human-readable note about the speed channel's condition.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QualityFinding {
    pub severity: FindingSeverity,
    pub message: String,
}

/// How trustworthy the speed channel is across a batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DataQualityReport {
    pub total_records: u32,
    pub valid_count: u32,
    /// Share of records with no usable speed.
    pub invalid_pct: f64,
    /// Share of valid samples below 1 km/h.
    pub stationary_pct: f64,
    /// Share of valid samples above 200 km/h.
    pub unrealistic_pct: f64,
    /// 100 minus capped penalties, clamped to [0, 100].
    pub quality_score: f64,
    /// Maximum severity across `findings`.
    pub overall_severity: FindingSeverity,
    pub findings: Vec<QualityFinding>,
}

impl Default for DataQualityReport {
    fn default() -> Self {
        Self {
            total_records: 0,
            valid_count: 0,
            invalid_pct: 0.0,
            stationary_pct: 0.0,
            unrealistic_pct: 0.0,
            quality_score: 100.0,
            overall_severity: FindingSeverity::Success,
            findings: vec![],
        }
    }
}

/// Score the speed channel of a telemetry batch.
///
/// Starts from 100 and deducts capped penalties: up to 20 points for invalid
/// samples, up to 10 for unrealistic speeds (×2 weight), up to 10 for
/// stationary noise (×0.2 weight); the result is clamped to `[0, 100]`.
/// Findings are emitted when a share crosses its threshold (stationary >50%,
/// unrealistic >1%, invalid >10%); an unremarkable batch gets a single
/// success note. The overall severity is a pure fold-max over the findings.
pub fn assess_data_quality(points: &[TelemetryPoint]) -> DataQualityReport {
    if points.is_empty() {
        return DataQualityReport::default();
    }

    let total = points.len();
    let valid = extract_valid_speeds(points);
    let valid_count = valid.len();

    let invalid_pct = (total - valid_count) as f64 / total as f64 * 100.0;
    let (stationary_pct, unrealistic_pct) = if valid_count > 0 {
        let stationary = valid.iter().filter(|&&s| s < STATIONARY_SPEED_KMH).count();
        let unrealistic = valid.iter().filter(|&&s| s > UNREALISTIC_SPEED_KMH).count();
        (
            stationary as f64 / valid_count as f64 * 100.0,
            unrealistic as f64 / valid_count as f64 * 100.0,
        )
    } else {
        (0.0, 0.0)
    };

    let quality_score = (100.0
        - invalid_pct.min(20.0)
        - (unrealistic_pct * 2.0).min(10.0)
        - (stationary_pct * 0.2).min(10.0))
    .clamp(0.0, 100.0);

    let mut findings = Vec::new();
    if stationary_pct > 50.0 {
        findings.push(QualityFinding {
            severity: FindingSeverity::Warning,
            message: format!("{stationary_pct:.0}% of samples are stationary; the device may be parked or stuck"),
        });
    }
    if unrealistic_pct > 1.0 {
        findings.push(QualityFinding {
            severity: FindingSeverity::Error,
            message: format!("{unrealistic_pct:.1}% of samples exceed {UNREALISTIC_SPEED_KMH:.0} km/h; sensor readings look implausible"),
        });
    }
    if invalid_pct > 10.0 {
        findings.push(QualityFinding {
            severity: FindingSeverity::Warning,
            message: format!("{invalid_pct:.0}% of records carry no usable speed"),
        });
    }
    if findings.is_empty() {
        findings.push(QualityFinding {
            severity: FindingSeverity::Success,
            message: "Speed data quality is good".to_string(),
        });
    }

    let overall_severity = findings
        .iter()
        .map(|f| f.severity)
        .max()
        .unwrap_or(FindingSeverity::Success);

    DataQualityReport {
        total_records: total as u32,
        valid_count: valid_count as u32,
        invalid_pct,
        stationary_pct,
        unrealistic_pct,
        quality_score,
        overall_severity,
        findings,
    }
}
