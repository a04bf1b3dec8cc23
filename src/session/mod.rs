//! Session module for recording lifecycle and aggregation.

pub mod manager;
pub mod types;

pub use manager::{SessionError, SessionManager};
pub use types::{BiometricSession, ZoneDuration};
