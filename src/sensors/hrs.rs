//! HRS (Heart Rate Service) protocol implementation.
//!
//! Parses the Bluetooth SIG Heart Rate Measurement characteristic (0x2A37):
//! a flags byte followed by optional fields selected by individual bits.
//! All multi-byte fields are little-endian.

use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

/// Heart Rate Service UUID (0x180D)
pub const HEART_RATE_SERVICE_UUID: Uuid =
    Uuid::from_u128(0x0000_180d_0000_1000_8000_0080_5f9b_34fb);

/// Heart Rate Measurement UUID (0x2A37)
pub const HEART_RATE_MEASUREMENT_UUID: Uuid =
    Uuid::from_u128(0x0000_2a37_0000_1000_8000_0080_5f9b_34fb);

/// Errors from parsing a Heart Rate Measurement payload.
///
/// A buffer whose flags promise more bytes than it carries must fail here
/// rather than read out of bounds.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    /// Payload is empty (no flags byte)
    #[error("empty heart rate measurement payload")]
    Empty,

    /// Payload is shorter than its own flags imply
    #[error("truncated heart rate measurement: needed {needed} bytes, got {got}")]
    Truncated { needed: usize, got: usize },
}

/// A decoded Heart Rate Measurement notification.
///
/// Immutable once decoded; `timestamp` is the decode time.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct HeartRateSample {
    /// Decode timestamp
    pub timestamp: DateTime<Utc>,
    /// Heart rate in BPM
    pub bpm: u16,
    /// R-R intervals in milliseconds (0..n per notification)
    pub rr_intervals_ms: Vec<f64>,
    /// Energy expended in kJ (if present)
    pub energy_expended_kj: Option<u16>,
    /// Sensor contact detected (None if the sensor does not support it)
    pub sensor_contact: Option<bool>,
}

/// Heart Rate Measurement flags (byte 0).
#[derive(Debug, Clone, Copy)]
struct MeasurementFlags {
    /// 16-bit heart rate value (bit 0); 8-bit otherwise
    hr_format_u16: bool,
    /// Sensor contact detected (bit 1)
    sensor_contact_detected: bool,
    /// Sensor contact feature supported (bit 2)
    sensor_contact_supported: bool,
    /// Energy expended field present (bit 3)
    energy_expended_present: bool,
    /// One or more R-R interval fields present (bit 4)
    rr_interval_present: bool,
}

impl MeasurementFlags {
    fn from_byte(flags: u8) -> Self {
        Self {
            hr_format_u16: (flags & 0x01) != 0,
            sensor_contact_detected: (flags & 0x02) != 0,
            sensor_contact_supported: (flags & 0x04) != 0,
            energy_expended_present: (flags & 0x08) != 0,
            rr_interval_present: (flags & 0x10) != 0,
        }
    }
}

/// Bounds-checked cursor over an immutable payload slice.
struct Cursor<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> Cursor<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, offset: 0 }
    }

    fn read_u8(&mut self) -> Result<u8, DecodeError> {
        let byte = *self.data.get(self.offset).ok_or(DecodeError::Truncated {
            needed: self.offset + 1,
            got: self.data.len(),
        })?;
        self.offset += 1;
        Ok(byte)
    }

    fn read_u16_le(&mut self) -> Result<u16, DecodeError> {
        if self.offset + 2 > self.data.len() {
            return Err(DecodeError::Truncated {
                needed: self.offset + 2,
                got: self.data.len(),
            });
        }
        let value = u16::from_le_bytes([self.data[self.offset], self.data[self.offset + 1]]);
        self.offset += 2;
        Ok(value)
    }

    fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.offset)
    }
}

/// Parse a Heart Rate Measurement notification payload.
///
/// Field order per the Heart Rate Profile: flags, heart rate (8 or 16 bit),
/// energy expended (if flagged), then R-R intervals (u16 LE each, in units
/// of 1/1024 s) until the payload is exhausted.
pub fn parse_heart_rate_measurement(data: &[u8]) -> Result<HeartRateSample, DecodeError> {
    if data.is_empty() {
        return Err(DecodeError::Empty);
    }

    let mut cursor = Cursor::new(data);
    let flags = MeasurementFlags::from_byte(cursor.read_u8()?);

    let bpm = if flags.hr_format_u16 {
        cursor.read_u16_le()?
    } else {
        cursor.read_u8()? as u16
    };

    // Contact bit is only meaningful when the feature is supported
    let sensor_contact = if flags.sensor_contact_supported {
        Some(flags.sensor_contact_detected)
    } else {
        None
    };

    let energy_expended_kj = if flags.energy_expended_present {
        Some(cursor.read_u16_le()?)
    } else {
        None
    };

    let mut rr_intervals_ms = Vec::new();
    if flags.rr_interval_present {
        // At least one R-R field must follow when the bit is set
        if cursor.remaining() < 2 {
            return Err(DecodeError::Truncated {
                needed: cursor.offset + 2,
                got: data.len(),
            });
        }
        while cursor.remaining() >= 2 {
            let raw = cursor.read_u16_le()?;
            // 1/1024 second units -> milliseconds
            rr_intervals_ms.push(raw as f64 / 1024.0 * 1000.0);
        }
    }

    Ok(HeartRateSample {
        timestamp: Utc::now(),
        bpm,
        rr_intervals_ms,
        energy_expended_kj,
        sensor_contact,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_u8_heart_rate() {
        // Flags: 0x00 (8-bit HR), HR: 145 BPM
        let data = [0x00, 0x91];
        let sample = parse_heart_rate_measurement(&data).unwrap();

        assert_eq!(sample.bpm, 145);
        assert!(sample.rr_intervals_ms.is_empty());
        assert!(sample.energy_expended_kj.is_none());
        assert!(sample.sensor_contact.is_none());
    }

    #[test]
    fn test_parse_u16_heart_rate() {
        // Flags: 0x01 (16-bit HR), HR: 300 BPM
        let data = [0x01, 0x2C, 0x01];
        let sample = parse_heart_rate_measurement(&data).unwrap();

        assert_eq!(sample.bpm, 300);
    }

    #[test]
    fn test_parse_sensor_contact() {
        // Flags: 0x06 (contact supported + detected), HR: 72
        let data = [0x06, 0x48];
        let sample = parse_heart_rate_measurement(&data).unwrap();
        assert_eq!(sample.sensor_contact, Some(true));

        // Flags: 0x04 (contact supported, not detected)
        let data = [0x04, 0x48];
        let sample = parse_heart_rate_measurement(&data).unwrap();
        assert_eq!(sample.sensor_contact, Some(false));

        // Flags: 0x02 (detected bit set but feature unsupported)
        let data = [0x02, 0x48];
        let sample = parse_heart_rate_measurement(&data).unwrap();
        assert_eq!(sample.sensor_contact, None);
    }

    #[test]
    fn test_parse_energy_expended() {
        // Flags: 0x08 (energy expended), HR: 130, Energy: 420 kJ
        let data = [0x08, 0x82, 0xA4, 0x01];
        let sample = parse_heart_rate_measurement(&data).unwrap();

        assert_eq!(sample.bpm, 130);
        assert_eq!(sample.energy_expended_kj, Some(420));
    }

    #[test]
    fn test_parse_rr_intervals() {
        // Flags: 0x10 (R-R present), HR: 60
        // R-R: 1024 (=1000ms), 512 (=500ms), 819 (~799.8ms)
        let data = [0x10, 0x3C, 0x00, 0x04, 0x00, 0x02, 0x33, 0x03];
        let sample = parse_heart_rate_measurement(&data).unwrap();

        assert_eq!(sample.bpm, 60);
        assert_eq!(sample.rr_intervals_ms.len(), 3);
        assert!((sample.rr_intervals_ms[0] - 1000.0).abs() < 0.001);
        assert!((sample.rr_intervals_ms[1] - 500.0).abs() < 0.001);
        assert!((sample.rr_intervals_ms[2] - 819.0 / 1024.0 * 1000.0).abs() < 0.001);
    }

    #[test]
    fn test_parse_all_fields() {
        // Flags: 0x1F (16-bit HR, contact supported+detected, energy, R-R)
        // HR: 155, Energy: 100 kJ, R-R: 1024 = 1000ms
        let data = [0x1F, 0x9B, 0x00, 0x64, 0x00, 0x00, 0x04];
        let sample = parse_heart_rate_measurement(&data).unwrap();

        assert_eq!(sample.bpm, 155);
        assert_eq!(sample.sensor_contact, Some(true));
        assert_eq!(sample.energy_expended_kj, Some(100));
        assert_eq!(sample.rr_intervals_ms.len(), 1);
        assert!((sample.rr_intervals_ms[0] - 1000.0).abs() < 0.001);
    }

    #[test]
    fn test_empty_payload() {
        assert_eq!(parse_heart_rate_measurement(&[]), Err(DecodeError::Empty));
    }

    #[test]
    fn test_truncated_u16_heart_rate() {
        // Flags promise a 16-bit HR but only one byte follows
        let data = [0x01, 0x91];
        assert!(matches!(
            parse_heart_rate_measurement(&data),
            Err(DecodeError::Truncated { .. })
        ));
    }

    #[test]
    fn test_truncated_energy_expended() {
        // Flags promise energy expended but only one byte remains
        let data = [0x08, 0x82, 0xA4];
        assert!(matches!(
            parse_heart_rate_measurement(&data),
            Err(DecodeError::Truncated { .. })
        ));
    }

    #[test]
    fn test_truncated_rr_interval() {
        // R-R bit set with no R-R bytes at all
        let data = [0x10, 0x3C];
        assert!(matches!(
            parse_heart_rate_measurement(&data),
            Err(DecodeError::Truncated { .. })
        ));
    }

    #[test]
    fn test_missing_heart_rate_byte() {
        // Flags byte only
        let data = [0x00];
        assert!(matches!(
            parse_heart_rate_measurement(&data),
            Err(DecodeError::Truncated { .. })
        ));
    }

    #[test]
    fn test_decode_is_deterministic() {
        let data = [0x10, 0x48, 0x20, 0x03, 0x5A, 0x03];
        let a = parse_heart_rate_measurement(&data).unwrap();
        let b = parse_heart_rate_measurement(&data).unwrap();

        assert_eq!(a.bpm, b.bpm);
        assert_eq!(a.rr_intervals_ms, b.rr_intervals_ms);
        assert_eq!(a.energy_expended_kj, b.energy_expended_kj);
        assert_eq!(a.sensor_contact, b.sensor_contact);
    }
}
