//! SQLite schema definitions and versioning.

/// Current schema version.
pub const CURRENT_VERSION: i32 = 1;

/// Schema version tracking table.
pub const SCHEMA_VERSION_TABLE: &str = "
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL
);
";

/// Initial schema: finalized sessions, insertion-ordered.
///
/// Samples, HRV metrics and zone times are stored as JSON columns; the
/// engine only ever reads a session back whole.
pub const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS sessions (
    id TEXT PRIMARY KEY,
    started_at TEXT NOT NULL,
    ended_at TEXT,
    average_bpm INTEGER NOT NULL,
    max_bpm INTEGER NOT NULL,
    min_bpm INTEGER NOT NULL,
    calories_burned REAL NOT NULL,
    exercise_label TEXT,
    samples_json TEXT NOT NULL,
    hrv_json TEXT,
    zone_time_json TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_sessions_started_at ON sessions(started_at);
";
