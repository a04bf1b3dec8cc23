//! Engine facade wiring the monitor, session manager and stores together.
//!
//! Presentation layers talk to `BiometricEngine`; it owns the config and
//! session stores and shares the mutable pieces with the connection layer
//! under a single-writer discipline.

use crate::metrics::hrv::HrvMetrics;
use crate::metrics::recovery::{self, RecoveryScore};
use crate::metrics::zones::{self, ZoneRange};
use crate::sensors::monitor::HeartRateMonitor;
use crate::sensors::types::{ConnectionState, MonitorError, MonitorEvent};
use crate::session::manager::{SessionError, SessionManager};
use crate::session::types::BiometricSession;
use crate::storage::config::{BiometricConfig, ConfigError, ConfigStore, ConfigUpdate};
use crate::storage::store::{SessionStore, StoreError};
use crossbeam::channel::Receiver;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// Top-level handle for the heart-rate monitoring engine.
pub struct BiometricEngine {
    config: Arc<Mutex<BiometricConfig>>,
    config_store: ConfigStore,
    sessions: Arc<Mutex<SessionManager>>,
    session_store: Arc<Mutex<SessionStore>>,
    monitor: HeartRateMonitor,
}

impl BiometricEngine {
    /// Assemble the engine from its two stores.
    pub fn new(config_store: ConfigStore, session_store: SessionStore) -> Self {
        let config = Arc::new(Mutex::new(config_store.config().clone()));
        let session_store = Arc::new(Mutex::new(session_store));
        let sessions = Arc::new(Mutex::new(SessionManager::with_store(
            config_store.config().clone(),
            session_store.clone(),
        )));
        let monitor = HeartRateMonitor::new(config.clone(), sessions.clone());

        Self {
            config,
            config_store,
            sessions,
            session_store,
            monitor,
        }
    }

    /// Whether this platform can run the engine at all.
    pub async fn is_supported() -> bool {
        HeartRateMonitor::is_supported().await
    }

    /// Initialize the BLE adapter.
    pub async fn initialize(&mut self) -> Result<(), MonitorError> {
        self.monitor.initialize().await
    }

    /// Receiver for live samples and connection-state transitions.
    pub fn event_receiver(&self) -> Receiver<MonitorEvent> {
        self.monitor.event_receiver()
    }

    /// Connect to the first heart-rate strap found.
    pub async fn connect(&mut self) -> Result<(), MonitorError> {
        self.monitor.connect().await
    }

    /// Disconnect, finalizing any open session.
    pub async fn disconnect(&mut self) -> Result<(), MonitorError> {
        self.monitor.disconnect().await
    }

    /// Current connection state.
    pub fn connection_state(&self) -> ConnectionState {
        self.monitor.connection_state()
    }

    /// Start a monitoring session. Requires an active connection.
    pub fn start_session(
        &mut self,
        exercise_label: Option<String>,
    ) -> Result<BiometricSession, SessionError> {
        if self.connection_state() != ConnectionState::Connected {
            return Err(SessionError::NotConnected);
        }

        let mut guard = self.sessions.lock().expect("session lock poisoned");
        Ok(guard.start_session(exercise_label).clone())
    }

    /// End the open session, returning the finalized record.
    pub fn end_session(&mut self) -> Result<Option<BiometricSession>, SessionError> {
        self.sessions
            .lock()
            .expect("session lock poisoned")
            .end_session()
    }

    /// Retry persisting a session whose save failed earlier.
    pub fn retry_persist(&mut self) -> Result<Option<BiometricSession>, SessionError> {
        self.sessions
            .lock()
            .expect("session lock poisoned")
            .retry_persist()
    }

    /// Snapshot of the currently open session.
    pub fn current_session(&self) -> Option<BiometricSession> {
        self.sessions
            .lock()
            .expect("session lock poisoned")
            .current_session()
            .cloned()
    }

    /// Current configuration.
    pub fn config(&self) -> BiometricConfig {
        self.config.lock().expect("config lock poisoned").clone()
    }

    /// Apply a partial configuration update and persist it.
    pub fn update_config(&mut self, update: ConfigUpdate) -> Result<BiometricConfig, ConfigError> {
        let updated = self.config_store.update(update)?.clone();

        *self.config.lock().expect("config lock poisoned") = updated.clone();
        self.sessions
            .lock()
            .expect("session lock poisoned")
            .set_config(updated.clone());

        Ok(updated)
    }

    /// The zone table mapped to absolute bpm bounds for the current config.
    pub fn zone_ranges(&self) -> Vec<ZoneRange> {
        zones::zone_ranges(&self.config())
    }

    /// All persisted sessions, most recent last.
    pub fn saved_sessions(&self) -> Result<Vec<BiometricSession>, StoreError> {
        self.session_store
            .lock()
            .expect("store lock poisoned")
            .list_all()
    }

    /// Look up a persisted session by id.
    pub fn session_by_id(&self, id: Uuid) -> Result<Option<BiometricSession>, StoreError> {
        self.session_store
            .lock()
            .expect("store lock poisoned")
            .get_by_id(id)
    }

    /// Recovery assessment for a set of HRV metrics.
    pub fn recovery_score(&self, metrics: &HrvMetrics) -> RecoveryScore {
        recovery::recovery_score(metrics)
    }
}
