//! Monitoring session types.

use crate::metrics::hrv::HrvMetrics;
use crate::sensors::hrs::HeartRateSample;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Time accumulated in one training zone over a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneDuration {
    /// Zone name (matches the static zone table)
    pub zone: String,
    /// Seconds spent in the zone
    pub seconds: u32,
}

/// A heart-rate monitoring session.
///
/// Open while `ended_at` is `None`; samples are append-only until the
/// session is finalized, after which the record is immutable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BiometricSession {
    /// Unique identifier
    pub id: Uuid,
    /// When monitoring started
    pub started_at: DateTime<Utc>,
    /// When monitoring ended; absent while the session is open
    pub ended_at: Option<DateTime<Utc>>,
    /// All samples recorded during the session
    pub samples: Vec<HeartRateSample>,
    /// HRV analysis result, attached at finalization when enabled
    pub hrv_metrics: Option<HrvMetrics>,
    /// Mean BPM over all samples (0 for an empty session)
    pub average_bpm: u16,
    /// Highest BPM observed
    pub max_bpm: u16,
    /// Lowest BPM observed
    pub min_bpm: u16,
    /// Estimated calories burned
    pub calories_burned: f64,
    /// Seconds accumulated per training zone
    pub zone_time: Vec<ZoneDuration>,
    /// Optional label for the exercise performed
    pub exercise_label: Option<String>,
}

impl BiometricSession {
    /// Create a new open session starting now.
    pub fn new(exercise_label: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            started_at: Utc::now(),
            ended_at: None,
            samples: Vec::new(),
            hrv_metrics: None,
            average_bpm: 0,
            max_bpm: 0,
            min_bpm: 0,
            calories_burned: 0.0,
            zone_time: Vec::new(),
            exercise_label,
        }
    }

    /// Whether the session is still recording.
    pub fn is_open(&self) -> bool {
        self.ended_at.is_none()
    }

    /// Session duration in minutes (up to now while still open).
    pub fn duration_minutes(&self) -> f64 {
        let end = self.ended_at.unwrap_or_else(Utc::now);
        (end - self.started_at).num_milliseconds() as f64 / 60_000.0
    }
}
