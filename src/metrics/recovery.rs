//! Recovery scoring from HRV metrics.
//!
//! Normalizes RMSSD onto a 0-100 scale against a fixed reference range and
//! maps it to a qualitative readiness band with a recommendation.

use crate::metrics::hrv::HrvMetrics;
use serde::{Deserialize, Serialize};

/// Reference RMSSD range in milliseconds used for normalization.
const RMSSD_REF_MIN_MS: f64 = 20.0;
const RMSSD_REF_MAX_MS: f64 = 120.0;

/// Qualitative recovery band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryBand {
    Low,
    Moderate,
    Good,
    Excellent,
}

impl std::fmt::Display for RecoveryBand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecoveryBand::Low => write!(f, "Low"),
            RecoveryBand::Moderate => write!(f, "Moderate"),
            RecoveryBand::Good => write!(f, "Good"),
            RecoveryBand::Excellent => write!(f, "Excellent"),
        }
    }
}

/// A recovery assessment derived from HRV metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecoveryScore {
    /// Normalized RMSSD on a 0-100 scale, clamped
    pub score: f64,
    /// Qualitative band
    pub band: RecoveryBand,
    /// Training recommendation for this band
    pub recommendation: &'static str,
}

/// Score recovery readiness from an HRV metric set.
pub fn recovery_score(metrics: &HrvMetrics) -> RecoveryScore {
    let normalized = (metrics.rmssd_ms - RMSSD_REF_MIN_MS)
        / (RMSSD_REF_MAX_MS - RMSSD_REF_MIN_MS)
        * 100.0;
    let score = normalized.clamp(0.0, 100.0);

    let (band, recommendation) = if score < 25.0 {
        (
            RecoveryBand::Low,
            "Recovery is low. Prioritize rest or very light activity today.",
        )
    } else if score < 50.0 {
        (
            RecoveryBand::Moderate,
            "Recovery is moderate. Keep intensity easy and avoid hard intervals.",
        )
    } else if score < 75.0 {
        (
            RecoveryBand::Good,
            "Recovery is good. Normal training load is appropriate.",
        )
    } else {
        (
            RecoveryBand::Excellent,
            "Recovery is excellent. A high-intensity session is well supported.",
        )
    };

    RecoveryScore {
        score,
        band,
        recommendation,
    }
}
