//! PulseKit - Biometric Heart-Rate Monitoring & HRV Analysis Engine
//!
//! Connects to BLE chest/wrist heart-rate straps, decodes the standard
//! Heart Rate Measurement characteristic, derives HRV metrics and training
//! zones in real time, and manages recording sessions with local
//! persistence.

pub mod engine;
pub mod metrics;
pub mod sensors;
pub mod session;
pub mod storage;

// Re-export commonly used types
pub use engine::BiometricEngine;
pub use metrics::hrv::HrvMetrics;
pub use sensors::hrs::HeartRateSample;
pub use sensors::monitor::HeartRateMonitor;
pub use sensors::types::{ConnectionState, MonitorEvent};
pub use session::manager::SessionManager;
pub use session::types::BiometricSession;
pub use storage::config::BiometricConfig;
pub use storage::store::SessionStore;
