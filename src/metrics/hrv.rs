//! Time-domain heart-rate-variability analysis.
//!
//! Computes RMSSD, SDNN, pNN50 and mean R-R from a series of R-R intervals,
//! after rejecting physiologically implausible values. Pure functions only.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Plausible R-R interval band in milliseconds (exclusive bounds).
/// Values outside are treated as measurement artifacts and discarded.
const RR_MIN_MS: f64 = 300.0;
const RR_MAX_MS: f64 = 2000.0;

/// Successive-difference threshold for pNN50 in milliseconds.
const PNN50_THRESHOLD_MS: f64 = 50.0;

/// Time-domain HRV metrics derived from one analysis pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HrvMetrics {
    /// Root mean square of successive differences, ms (one decimal)
    pub rmssd_ms: f64,
    /// Population standard deviation of R-R intervals, ms (one decimal)
    pub sdnn_ms: f64,
    /// Percentage of successive differences exceeding 50 ms (one decimal)
    pub pnn50_percent: f64,
    /// Mean R-R interval, rounded to the nearest millisecond
    pub mean_rr_ms: f64,
    /// When the analysis was performed
    pub timestamp: DateTime<Utc>,
}

impl HrvMetrics {
    /// A zeroed metric set, returned when too few valid intervals exist.
    fn zeroed() -> Self {
        Self {
            rmssd_ms: 0.0,
            sdnn_ms: 0.0,
            pnn50_percent: 0.0,
            mean_rr_ms: 0.0,
            timestamp: Utc::now(),
        }
    }
}

fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Analyze an ordered series of R-R intervals in milliseconds.
///
/// Intervals outside the (300, 2000) ms band are discarded before any
/// computation. Fewer than 2 surviving intervals yields a zeroed metric
/// set rather than an error.
pub fn analyze(rr_intervals_ms: &[f64]) -> HrvMetrics {
    let filtered: Vec<f64> = rr_intervals_ms
        .iter()
        .copied()
        .filter(|rr| *rr > RR_MIN_MS && *rr < RR_MAX_MS)
        .collect();

    if filtered.len() < 2 {
        return HrvMetrics::zeroed();
    }

    let n = filtered.len() as f64;
    let mean_rr = filtered.iter().sum::<f64>() / n;

    // Population standard deviation
    let variance = filtered
        .iter()
        .map(|rr| (rr - mean_rr).powi(2))
        .sum::<f64>()
        / n;
    let sdnn = variance.sqrt();

    let diffs: Vec<f64> = filtered.windows(2).map(|pair| pair[1] - pair[0]).collect();

    let rmssd = (diffs.iter().map(|d| d * d).sum::<f64>() / diffs.len() as f64).sqrt();

    let over_threshold = diffs
        .iter()
        .filter(|d| d.abs() > PNN50_THRESHOLD_MS)
        .count();
    let pnn50 = over_threshold as f64 / diffs.len() as f64 * 100.0;

    HrvMetrics {
        rmssd_ms: round_one_decimal(rmssd),
        sdnn_ms: round_one_decimal(sdnn),
        pnn50_percent: round_one_decimal(pnn50),
        mean_rr_ms: mean_rr.round(),
        timestamp: Utc::now(),
    }
}
