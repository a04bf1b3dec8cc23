//! Session persistence using rusqlite.

use crate::metrics::hrv::HrvMetrics;
use crate::sensors::hrs::HeartRateSample;
use crate::session::types::{BiometricSession, ZoneDuration};
use crate::storage::schema::{CURRENT_VERSION, SCHEMA, SCHEMA_VERSION_TABLE};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult};
use std::path::Path;
use thiserror::Error;
use uuid::Uuid;

/// Maximum number of persisted sessions; oldest are evicted first.
pub const MAX_SAVED_SESSIONS: usize = 100;

/// Persistence errors.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Database connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

/// SQLite-backed store for finalized sessions.
pub struct SessionStore {
    conn: Connection,
}

impl SessionStore {
    /// Open or create a store at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StoreError::IoError(e.to_string()))?;
        }

        let conn =
            Connection::open(path).map_err(|e| StoreError::ConnectionFailed(e.to_string()))?;

        let store = Self { conn };
        store.initialize()?;
        Ok(store)
    }

    /// Open an in-memory store (for testing).
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| StoreError::ConnectionFailed(e.to_string()))?;

        let store = Self { conn };
        store.initialize()?;
        Ok(store)
    }

    fn initialize(&self) -> Result<(), StoreError> {
        self.conn
            .execute_batch(SCHEMA_VERSION_TABLE)
            .map_err(|e| StoreError::MigrationFailed(e.to_string()))?;

        let current_version = self.schema_version()?;
        if current_version < CURRENT_VERSION {
            self.migrate(current_version)?;
        }

        Ok(())
    }

    fn schema_version(&self) -> Result<i32, StoreError> {
        let result: SqliteResult<i32> = self.conn.query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_version",
            [],
            |row| row.get(0),
        );

        match result {
            Ok(version) => Ok(version),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(0),
            Err(e) => Err(StoreError::QueryFailed(e.to_string())),
        }
    }

    fn migrate(&self, from_version: i32) -> Result<(), StoreError> {
        if from_version < 1 {
            self.conn
                .execute_batch(SCHEMA)
                .map_err(|e| StoreError::MigrationFailed(e.to_string()))?;

            self.conn
                .execute(
                    "INSERT INTO schema_version (version, applied_at) VALUES (?, datetime('now'))",
                    [CURRENT_VERSION],
                )
                .map_err(|e| StoreError::MigrationFailed(e.to_string()))?;

            tracing::info!("Session store migrated to version {}", CURRENT_VERSION);
        }

        Ok(())
    }

    /// Append a finalized session and trim to the retention cap.
    pub fn append(&mut self, session: &BiometricSession) -> Result<(), StoreError> {
        let samples_json = serde_json::to_string(&session.samples)
            .map_err(|e| StoreError::SerializationError(e.to_string()))?;
        let hrv_json = session
            .hrv_metrics
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| StoreError::SerializationError(e.to_string()))?;
        let zone_time_json = serde_json::to_string(&session.zone_time)
            .map_err(|e| StoreError::SerializationError(e.to_string()))?;

        let tx = self
            .conn
            .transaction()
            .map_err(|e| StoreError::QueryFailed(e.to_string()))?;

        tx.execute(
            "INSERT INTO sessions (id, started_at, ended_at, average_bpm, max_bpm, min_bpm,
                                   calories_burned, exercise_label, samples_json, hrv_json,
                                   zone_time_json)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                session.id.to_string(),
                session.started_at.to_rfc3339(),
                session.ended_at.map(|t| t.to_rfc3339()),
                session.average_bpm,
                session.max_bpm,
                session.min_bpm,
                session.calories_burned,
                session.exercise_label,
                samples_json,
                hrv_json,
                zone_time_json,
            ],
        )
        .map_err(|e| StoreError::QueryFailed(e.to_string()))?;

        // FIFO retention: keep only the most recently inserted rows
        tx.execute(
            "DELETE FROM sessions WHERE rowid NOT IN
                 (SELECT rowid FROM sessions ORDER BY rowid DESC LIMIT ?1)",
            [MAX_SAVED_SESSIONS],
        )
        .map_err(|e| StoreError::QueryFailed(e.to_string()))?;

        tx.commit()
            .map_err(|e| StoreError::QueryFailed(e.to_string()))?;

        Ok(())
    }

    /// All saved sessions, most recent last.
    pub fn list_all(&self) -> Result<Vec<BiometricSession>, StoreError> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, started_at, ended_at, average_bpm, max_bpm, min_bpm,
                        calories_burned, exercise_label, samples_json, hrv_json, zone_time_json
                 FROM sessions ORDER BY rowid ASC",
            )
            .map_err(|e| StoreError::QueryFailed(e.to_string()))?;

        let rows = stmt
            .query_map([], Self::row_to_session)
            .map_err(|e| StoreError::QueryFailed(e.to_string()))?;

        let mut sessions = Vec::new();
        for row in rows {
            sessions.push(row.map_err(|e| StoreError::QueryFailed(e.to_string()))?);
        }
        Ok(sessions)
    }

    /// Look up a saved session by id.
    pub fn get_by_id(&self, id: Uuid) -> Result<Option<BiometricSession>, StoreError> {
        self.conn
            .query_row(
                "SELECT id, started_at, ended_at, average_bpm, max_bpm, min_bpm,
                        calories_burned, exercise_label, samples_json, hrv_json, zone_time_json
                 FROM sessions WHERE id = ?1",
                [id.to_string()],
                Self::row_to_session,
            )
            .optional()
            .map_err(|e| StoreError::QueryFailed(e.to_string()))
    }

    /// Delete a saved session. Returns true when a row was removed.
    pub fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        let changed = self
            .conn
            .execute("DELETE FROM sessions WHERE id = ?1", [id.to_string()])
            .map_err(|e| StoreError::QueryFailed(e.to_string()))?;
        Ok(changed > 0)
    }

    /// Remove all saved sessions.
    pub fn clear(&self) -> Result<(), StoreError> {
        self.conn
            .execute("DELETE FROM sessions", [])
            .map_err(|e| StoreError::QueryFailed(e.to_string()))?;
        Ok(())
    }

    /// Number of saved sessions.
    pub fn count(&self) -> Result<usize, StoreError> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM sessions", [], |row| row.get(0))
            .map_err(|e| StoreError::QueryFailed(e.to_string()))?;
        Ok(count as usize)
    }

    fn row_to_session(row: &rusqlite::Row<'_>) -> SqliteResult<BiometricSession> {
        let id_str: String = row.get(0)?;
        let started_str: String = row.get(1)?;
        let ended_str: Option<String> = row.get(2)?;
        let samples_json: String = row.get(8)?;
        let hrv_json: Option<String> = row.get(9)?;
        let zone_time_json: String = row.get(10)?;

        let samples: Vec<HeartRateSample> =
            serde_json::from_str(&samples_json).map_err(json_to_sql_err)?;
        let hrv_metrics: Option<HrvMetrics> = hrv_json
            .map(|json| serde_json::from_str(&json))
            .transpose()
            .map_err(json_to_sql_err)?;
        let zone_time: Vec<ZoneDuration> =
            serde_json::from_str(&zone_time_json).map_err(json_to_sql_err)?;

        Ok(BiometricSession {
            id: Uuid::parse_str(&id_str).unwrap_or_else(|_| Uuid::nil()),
            started_at: parse_timestamp(&started_str),
            ended_at: ended_str.map(|s| parse_timestamp(&s)),
            samples,
            hrv_metrics,
            average_bpm: row.get(3)?,
            max_bpm: row.get(4)?,
            min_bpm: row.get(5)?,
            calories_burned: row.get(6)?,
            zone_time,
            exercise_label: row.get(7)?,
        })
    }
}

#[cfg(test)]
impl SessionStore {
    /// Drop the sessions table so the next write fails.
    pub(crate) fn break_storage(&self) {
        self.conn.execute("DROP TABLE sessions", []).unwrap();
    }

    /// Undo `break_storage` by recreating the schema.
    pub(crate) fn repair_storage(&self) {
        self.conn.execute_batch(SCHEMA).unwrap();
    }
}

fn parse_timestamp(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|t| t.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

fn json_to_sql_err(e: serde_json::Error) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
}
