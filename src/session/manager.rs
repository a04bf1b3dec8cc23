//! Session lifecycle: start, sample accumulation, finalization, persistence.
//!
//! The manager is the single writer for the open session. All mutation goes
//! through its methods; the connection layer wraps it in a mutex and never
//! touches the session directly.

use crate::metrics::{hrv, zones};
use crate::sensors::hrs::HeartRateSample;
use crate::session::types::{BiometricSession, ZoneDuration};
use crate::storage::config::BiometricConfig;
use crate::storage::store::{SessionStore, StoreError};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Minimum buffered R-R intervals before HRV analysis is attempted.
const MIN_RR_FOR_HRV: usize = 10;

/// Session lifecycle errors.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The monitor is not connected, a session cannot start
    #[error("Monitor is not connected")]
    NotConnected,

    /// No session is currently open
    #[error("No active session")]
    NotRecording,

    /// The finalized session could not be persisted; it is retained in
    /// memory and `retry_persist()` may be called
    #[error("Failed to persist session: {0}")]
    Persistence(#[from] StoreError),
}

/// Owns the current recording session and its R-R interval buffer.
pub struct SessionManager {
    config: BiometricConfig,
    current: Option<BiometricSession>,
    rr_buffer: Vec<f64>,
    store: Option<Arc<Mutex<SessionStore>>>,
    /// A finalized session whose persistence failed, kept for retry
    unsaved: Option<BiometricSession>,
}

impl SessionManager {
    /// Create a manager without persistence (sessions are only returned).
    pub fn new(config: BiometricConfig) -> Self {
        Self {
            config,
            current: None,
            rr_buffer: Vec::new(),
            store: None,
            unsaved: None,
        }
    }

    /// Create a manager that persists finalized sessions to a store.
    pub fn with_store(config: BiometricConfig, store: Arc<Mutex<SessionStore>>) -> Self {
        Self {
            store: Some(store),
            ..Self::new(config)
        }
    }

    /// Replace the configuration used for zone and calorie math.
    pub fn set_config(&mut self, config: BiometricConfig) {
        self.config = config;
    }

    /// The currently open session, if any.
    pub fn current_session(&self) -> Option<&BiometricSession> {
        self.current.as_ref()
    }

    /// Start a new session, finalizing any session already open.
    pub fn start_session(&mut self, exercise_label: Option<String>) -> &BiometricSession {
        if self.current.is_some() {
            if let Err(e) = self.end_session() {
                tracing::warn!("Failed to finalize previous session: {}", e);
            }
        }

        self.rr_buffer.clear();
        let session = BiometricSession::new(exercise_label);
        tracing::info!(session_id = %session.id, "Started monitoring session");
        self.current.insert(session)
    }

    /// Append a sample to the open session.
    pub fn record_sample(&mut self, sample: HeartRateSample) -> Result<(), SessionError> {
        let session = self.current.as_mut().ok_or(SessionError::NotRecording)?;

        if self.config.hrv_enabled {
            self.rr_buffer.extend_from_slice(&sample.rr_intervals_ms);
        }
        session.samples.push(sample);

        Ok(())
    }

    /// Buffered R-R interval count (for diagnostics).
    pub fn buffered_rr_count(&self) -> usize {
        self.rr_buffer.len()
    }

    /// Finalize the open session: aggregate, analyze, persist, return.
    ///
    /// Returns `Ok(None)` when no session is open. An empty session
    /// finalizes with zeroed aggregates rather than an error. On a
    /// persistence failure the finalized session is retained for
    /// `retry_persist()` and the error is surfaced.
    pub fn end_session(&mut self) -> Result<Option<BiometricSession>, SessionError> {
        let mut session = match self.current.take() {
            Some(session) => session,
            None => return Ok(None),
        };

        session.ended_at = Some(chrono::Utc::now());

        if !session.samples.is_empty() {
            let bpms: Vec<u16> = session.samples.iter().map(|s| s.bpm).collect();
            session.average_bpm =
                (bpms.iter().map(|b| *b as u32).sum::<u32>() / bpms.len() as u32) as u16;
            session.max_bpm = *bpms.iter().max().unwrap_or(&0);
            session.min_bpm = *bpms.iter().min().unwrap_or(&0);
            session.calories_burned = estimate_calories(
                session.average_bpm,
                session.duration_minutes(),
            );
            session.zone_time = self.zone_time(&session.samples);

            if self.config.hrv_enabled && self.rr_buffer.len() > MIN_RR_FOR_HRV {
                session.hrv_metrics = Some(hrv::analyze(&self.rr_buffer));
            }
        }

        self.rr_buffer.clear();

        tracing::info!(
            session_id = %session.id,
            samples = session.samples.len(),
            avg_bpm = session.average_bpm,
            "Finalized monitoring session"
        );

        if let Err(e) = self.persist(&session) {
            self.unsaved = Some(session);
            return Err(e);
        }

        Ok(Some(session))
    }

    /// Retry persisting a session whose earlier save failed.
    pub fn retry_persist(&mut self) -> Result<Option<BiometricSession>, SessionError> {
        let session = match self.unsaved.take() {
            Some(session) => session,
            None => return Ok(None),
        };

        if let Err(e) = self.persist(&session) {
            self.unsaved = Some(session);
            return Err(e);
        }

        Ok(Some(session))
    }

    fn persist(&self, session: &BiometricSession) -> Result<(), SessionError> {
        if let Some(store) = &self.store {
            let mut guard = store
                .lock()
                .map_err(|e| StoreError::ConnectionFailed(format!("store lock poisoned: {e}")))?;
            guard.append(session)?;
            tracing::debug!(session_id = %session.id, "Persisted session");
        }
        Ok(())
    }

    /// Seconds spent in each zone, from sample counts and the configured
    /// sampling interval.
    fn zone_time(&self, samples: &[HeartRateSample]) -> Vec<ZoneDuration> {
        let mut counts: BTreeMap<&'static str, u32> = BTreeMap::new();
        for sample in samples {
            let zone = zones::classify(sample.bpm, self.config.max_heart_rate);
            *counts.entry(zone.name).or_insert(0) += 1;
        }

        let interval_s = self.config.sample_interval_ms as f64 / 1000.0;
        counts
            .into_iter()
            .map(|(zone, count)| ZoneDuration {
                zone: zone.to_string(),
                seconds: (count as f64 * interval_s).round() as u32,
            })
            .collect()
    }
}

/// Approximate calories burned from average heart rate and duration.
/// The formula is an uncited approximation kept for behavioral
/// compatibility with existing session history.
fn estimate_calories(average_bpm: u16, duration_minutes: f64) -> f64 {
    ((average_bpm as f64 * 0.05 - 2.0) * duration_minutes).max(0.0)
}
