//! Training zone table and heart-rate zone classification.
//!
//! Six contiguous bands covering 0-100% of maximum heart rate, ordered
//! ascending. Classification is a pure function of bpm and max HR.

use crate::storage::config::BiometricConfig;
use serde::Serialize;

/// A heart-rate training zone, expressed as a percent-of-maximum band.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrainingZone {
    /// Zone name
    pub name: &'static str,
    /// Lower bound as percent of max HR (inclusive)
    pub min_percent: f64,
    /// Upper bound as percent of max HR (exclusive, except the top zone)
    pub max_percent: f64,
    /// Physiological training effect
    pub description: &'static str,
}

impl std::fmt::Display for TrainingZone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} ({:.0}-{:.0}% max HR)",
            self.name, self.min_percent, self.max_percent
        )
    }
}

/// The six training zones, ascending. Invariant: contiguous 0-100 coverage,
/// `ZONES[i].max_percent == ZONES[i+1].min_percent`.
pub const ZONES: [TrainingZone; 6] = [
    TrainingZone {
        name: "Rest",
        min_percent: 0.0,
        max_percent: 50.0,
        description: "Resting and recovery, minimal cardiovascular load",
    },
    TrainingZone {
        name: "Warm Up",
        min_percent: 50.0,
        max_percent: 60.0,
        description: "Gentle activity, prepares the body for exercise",
    },
    TrainingZone {
        name: "Fat Burn",
        min_percent: 60.0,
        max_percent: 70.0,
        description: "Light aerobic work, maximizes fat metabolism",
    },
    TrainingZone {
        name: "Aerobic",
        min_percent: 70.0,
        max_percent: 80.0,
        description: "Moderate effort, builds aerobic base and endurance",
    },
    TrainingZone {
        name: "Maximal",
        min_percent: 80.0,
        max_percent: 90.0,
        description: "Hard effort, improves anaerobic threshold",
    },
    TrainingZone {
        name: "Red Line",
        min_percent: 90.0,
        max_percent: 100.0,
        description: "Maximum effort, sustainable only briefly",
    },
];

/// Classify an instantaneous heart rate against a maximum heart rate.
///
/// Scans the zone table from the highest band downward and returns the first
/// zone whose lower bound is at or below the computed percentage, falling
/// back to the lowest zone.
pub fn classify(bpm: u16, max_heart_rate: u16) -> &'static TrainingZone {
    let percent = if max_heart_rate == 0 {
        0.0
    } else {
        bpm as f64 / max_heart_rate as f64 * 100.0
    };

    ZONES
        .iter()
        .rev()
        .find(|zone| zone.min_percent <= percent)
        .unwrap_or(&ZONES[0])
}

/// A zone mapped to absolute bpm bounds for a given configuration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ZoneRange {
    /// The underlying zone
    pub zone: TrainingZone,
    /// Lower bound in BPM
    pub min_bpm: u16,
    /// Upper bound in BPM
    pub max_bpm: u16,
}

/// Map the zone table to absolute bpm bounds using the configured max HR.
pub fn zone_ranges(config: &BiometricConfig) -> Vec<ZoneRange> {
    let max_hr = config.max_heart_rate as f64;
    ZONES
        .iter()
        .map(|zone| ZoneRange {
            zone: zone.clone(),
            min_bpm: (max_hr * zone.min_percent / 100.0).round() as u16,
            max_bpm: (max_hr * zone.max_percent / 100.0).round() as u16,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zone_table_is_contiguous() {
        assert_eq!(ZONES[0].min_percent, 0.0);
        assert_eq!(ZONES[ZONES.len() - 1].max_percent, 100.0);

        for pair in ZONES.windows(2) {
            assert_eq!(pair[0].max_percent, pair[1].min_percent);
            assert!(pair[0].min_percent < pair[1].min_percent);
        }
    }

    #[test]
    fn test_classify_maximal() {
        // 150 / 180 = 83.3% -> Maximal (80-90%)
        let zone = classify(150, 180);
        assert_eq!(zone.name, "Maximal");
    }

    #[test]
    fn test_classify_all_bands() {
        assert_eq!(classify(60, 180).name, "Rest"); // 33%
        assert_eq!(classify(99, 180).name, "Warm Up"); // 55%
        assert_eq!(classify(117, 180).name, "Fat Burn"); // 65%
        assert_eq!(classify(135, 180).name, "Aerobic"); // 75%
        assert_eq!(classify(153, 180).name, "Maximal"); // 85%
        assert_eq!(classify(171, 180).name, "Red Line"); // 95%
    }

    #[test]
    fn test_classify_boundaries() {
        // Exactly on a boundary belongs to the higher zone
        assert_eq!(classify(90, 180).name, "Warm Up"); // 50%
        assert_eq!(classify(162, 180).name, "Red Line"); // 90%

        // Above 100% still classifies into the top zone
        assert_eq!(classify(200, 180).name, "Red Line");
    }

    #[test]
    fn test_classify_zero_max_hr() {
        assert_eq!(classify(150, 0).name, "Rest");
    }
}
