//! Types and errors for the heart-rate monitor connection.

use crate::metrics::zones::TrainingZone;
use crate::sensors::hrs::HeartRateSample;
use thiserror::Error;

/// Connection state of the heart-rate monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// Not connected
    #[default]
    Disconnected,
    /// Connection in progress
    Connecting,
    /// Active connection, notifications flowing
    Connected,
    /// Last connection attempt failed
    Error,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionState::Disconnected => write!(f, "Disconnected"),
            ConnectionState::Connecting => write!(f, "Connecting..."),
            ConnectionState::Connected => write!(f, "Connected"),
            ConnectionState::Error => write!(f, "Error"),
        }
    }
}

/// Events emitted by the monitor over its event channel.
#[derive(Debug, Clone)]
pub enum MonitorEvent {
    /// A decoded sample together with the training zone it falls in
    Sample {
        sample: HeartRateSample,
        zone: &'static TrainingZone,
    },
    /// Connection state changed
    ConnectionChanged(ConnectionState),
    /// A non-fatal error occurred (e.g. a dropped malformed packet)
    Error(String),
}

/// Errors that can occur in the monitor connection layer.
#[derive(Debug, Error)]
pub enum MonitorError {
    /// Platform lacks BLE support entirely; fatal, not retryable
    #[error("Bluetooth transport not supported on this platform")]
    TransportUnsupported,

    /// BLE adapter not found or unavailable
    #[error("Bluetooth adapter not found")]
    AdapterNotFound,

    /// No heart-rate strap found during discovery
    #[error("No heart rate monitor found")]
    DeviceNotFound,

    /// Connection or service discovery failed; caller may retry connect()
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Failed to subscribe to the measurement characteristic
    #[error("Failed to subscribe to notifications: {0}")]
    SubscriptionFailed(String),

    /// Operation not allowed in the current connection state
    #[error("Invalid connection state for this operation")]
    InvalidState,

    /// Generic BLE error
    #[error("BLE error: {0}")]
    BleError(String),
}
