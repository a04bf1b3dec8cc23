//! Sensor module for BLE heart-rate device communication.

pub mod hrs;
pub mod monitor;
pub mod types;

pub use hrs::{
    parse_heart_rate_measurement, DecodeError, HeartRateSample, HEART_RATE_MEASUREMENT_UUID,
    HEART_RATE_SERVICE_UUID,
};
pub use monitor::HeartRateMonitor;
pub use types::{ConnectionState, MonitorError, MonitorEvent};
