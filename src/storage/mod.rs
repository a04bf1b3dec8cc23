//! Storage module for session persistence and configuration.

pub mod config;
pub mod schema;
pub mod store;

pub use config::{BiometricConfig, ConfigError, ConfigStore, ConfigUpdate};
pub use store::{SessionStore, StoreError, MAX_SAVED_SESSIONS};
