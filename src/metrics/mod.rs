//! Metrics module for HRV analysis, zones and recovery scoring.

pub mod hrv;
pub mod recovery;
pub mod zones;

pub use hrv::{analyze, HrvMetrics};
pub use recovery::{recovery_score, RecoveryBand, RecoveryScore};
pub use zones::{classify, zone_ranges, TrainingZone, ZoneRange, ZONES};
