//! Unit tests for HRV analysis, zone classification and recovery scoring.

use chrono::Utc;
use pulsekit::metrics::hrv::{analyze, HrvMetrics};
use pulsekit::metrics::recovery::{recovery_score, RecoveryBand};
use pulsekit::metrics::zones::{classify, zone_ranges, ZONES};
use pulsekit::storage::config::BiometricConfig;

#[test]
fn test_hrv_reference_series() {
    let metrics = analyze(&[800.0, 810.0, 790.0, 805.0]);
    assert_eq!(metrics.mean_rr_ms, 801.0);
    assert!(metrics.sdnn_ms > 0.0);
    assert!(metrics.rmssd_ms > 0.0);
}

#[test]
fn test_hrv_outlier_exclusion() {
    let clean = analyze(&[800.0, 810.0, 790.0, 805.0]);
    let with_low = analyze(&[50.0, 800.0, 810.0, 790.0, 805.0]);
    let with_high = analyze(&[800.0, 810.0, 3000.0, 790.0, 805.0]);

    for noisy in [with_low, with_high] {
        assert_eq!(clean.mean_rr_ms, noisy.mean_rr_ms);
        assert_eq!(clean.sdnn_ms, noisy.sdnn_ms);
        assert_eq!(clean.rmssd_ms, noisy.rmssd_ms);
        assert_eq!(clean.pnn50_percent, noisy.pnn50_percent);
    }
}

#[test]
fn test_hrv_idempotence() {
    let series = [720.0, 750.0, 680.0, 810.0, 790.0, 760.0];
    let a = analyze(&series);
    let b = analyze(&series);
    assert_eq!(a.rmssd_ms, b.rmssd_ms);
    assert_eq!(a.sdnn_ms, b.sdnn_ms);
    assert_eq!(a.pnn50_percent, b.pnn50_percent);
    assert_eq!(a.mean_rr_ms, b.mean_rr_ms);
}

#[test]
fn test_zone_table_invariant() {
    assert_eq!(ZONES.len(), 6);
    assert_eq!(ZONES[0].min_percent, 0.0);
    assert_eq!(ZONES[5].max_percent, 100.0);
    for pair in ZONES.windows(2) {
        assert_eq!(pair[0].max_percent, pair[1].min_percent);
    }
}

#[test]
fn test_classify_spec_example() {
    // 150 / 180 ~ 83.3% -> Maximal (80-90%)
    assert_eq!(classify(150, 180).name, "Maximal");
}

#[test]
fn test_zone_ranges_absolute_bounds() {
    let config = BiometricConfig {
        max_heart_rate: 200,
        ..Default::default()
    };

    let ranges = zone_ranges(&config);
    assert_eq!(ranges.len(), 6);
    assert_eq!(ranges[0].min_bpm, 0);
    assert_eq!(ranges[0].max_bpm, 100); // Rest: 0-50% of 200
    assert_eq!(ranges[5].min_bpm, 180); // Red Line: 90-100%
    assert_eq!(ranges[5].max_bpm, 200);
}

fn hrv_with_rmssd(rmssd_ms: f64) -> HrvMetrics {
    HrvMetrics {
        rmssd_ms,
        sdnn_ms: 40.0,
        pnn50_percent: 20.0,
        mean_rr_ms: 800.0,
        timestamp: Utc::now(),
    }
}

#[test]
fn test_recovery_bands_and_clamping() {
    assert_eq!(recovery_score(&hrv_with_rmssd(25.0)).band, RecoveryBand::Low);
    assert_eq!(
        recovery_score(&hrv_with_rmssd(55.0)).band,
        RecoveryBand::Moderate
    );
    assert_eq!(recovery_score(&hrv_with_rmssd(85.0)).band, RecoveryBand::Good);
    assert_eq!(
        recovery_score(&hrv_with_rmssd(115.0)).band,
        RecoveryBand::Excellent
    );

    assert_eq!(recovery_score(&hrv_with_rmssd(0.0)).score, 0.0);
    assert_eq!(recovery_score(&hrv_with_rmssd(500.0)).score, 100.0);
}

#[test]
fn test_recovery_recommendation_is_present() {
    let score = recovery_score(&hrv_with_rmssd(70.0));
    assert!(!score.recommendation.is_empty());
}
