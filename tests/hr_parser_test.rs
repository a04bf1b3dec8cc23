//! Unit tests for Heart Rate Measurement decoding.
//!
//! Covers the flag combinations of the Heart Rate Profile: 8-bit vs 16-bit
//! values, sensor contact, energy expended and R-R interval fields, plus
//! truncation behavior.

use pulsekit::sensors::hrs::{parse_heart_rate_measurement, DecodeError};

#[test]
fn test_minimal_8bit_packet() {
    // Flags 0x00, HR 72
    let sample = parse_heart_rate_measurement(&[0x00, 0x48]).unwrap();
    assert_eq!(sample.bpm, 72);
    assert!(sample.rr_intervals_ms.is_empty());
    assert!(sample.energy_expended_kj.is_none());
    assert!(sample.sensor_contact.is_none());
}

#[test]
fn test_16bit_value_exceeding_u8() {
    // Flags 0x01, HR 512
    let sample = parse_heart_rate_measurement(&[0x01, 0x00, 0x02]).unwrap();
    assert_eq!(sample.bpm, 512);
}

#[test]
fn test_energy_and_contact_combined() {
    // Flags 0x0E (contact supported+detected, energy), HR 140, energy 1000 kJ
    let sample = parse_heart_rate_measurement(&[0x0E, 0x8C, 0xE8, 0x03]).unwrap();
    assert_eq!(sample.bpm, 140);
    assert_eq!(sample.sensor_contact, Some(true));
    assert_eq!(sample.energy_expended_kj, Some(1000));
}

#[test]
fn test_single_rr_interval() {
    // Flags 0x10, HR 65, R-R 1024/1024s = 1000ms
    let sample = parse_heart_rate_measurement(&[0x10, 0x41, 0x00, 0x04]).unwrap();
    assert_eq!(sample.rr_intervals_ms.len(), 1);
    assert!((sample.rr_intervals_ms[0] - 1000.0).abs() < 1e-9);
}

#[test]
fn test_three_rr_intervals() {
    // Flags 0x10, HR 70, R-R: 800, 820, 780 (in 1/1024s units)
    let data = [
        0x10, 0x46, // flags, HR
        0x20, 0x03, // 800
        0x34, 0x03, // 820
        0x0C, 0x03, // 780
    ];
    let sample = parse_heart_rate_measurement(&data).unwrap();
    assert_eq!(sample.rr_intervals_ms.len(), 3);
    assert!((sample.rr_intervals_ms[0] - 800.0 * 1000.0 / 1024.0).abs() < 1e-9);
    assert!((sample.rr_intervals_ms[1] - 820.0 * 1000.0 / 1024.0).abs() < 1e-9);
    assert!((sample.rr_intervals_ms[2] - 780.0 * 1000.0 / 1024.0).abs() < 1e-9);
}

#[test]
fn test_identical_buffers_decode_identically() {
    let data = [0x1E, 0x78, 0x2C, 0x01, 0x00, 0x04, 0x10, 0x04];
    let a = parse_heart_rate_measurement(&data).unwrap();
    let b = parse_heart_rate_measurement(&data).unwrap();
    assert_eq!(a.bpm, b.bpm);
    assert_eq!(a.rr_intervals_ms, b.rr_intervals_ms);
    assert_eq!(a.energy_expended_kj, b.energy_expended_kj);
    assert_eq!(a.sensor_contact, b.sensor_contact);
}

#[test]
fn test_empty_buffer_fails() {
    assert_eq!(parse_heart_rate_measurement(&[]), Err(DecodeError::Empty));
}

#[test]
fn test_truncation_never_reads_past_end() {
    // Each of these promises more bytes than it carries
    let cases: &[&[u8]] = &[
        &[0x00],             // no HR byte
        &[0x01, 0x48],       // 16-bit HR, one byte
        &[0x08, 0x48],       // energy flagged, absent
        &[0x08, 0x48, 0x01], // energy flagged, one byte
        &[0x10, 0x48],       // R-R flagged, absent
    ];

    for case in cases {
        assert!(
            matches!(
                parse_heart_rate_measurement(case),
                Err(DecodeError::Truncated { .. })
            ),
            "expected truncation error for {case:02X?}"
        );
    }
}
