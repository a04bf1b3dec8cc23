//! User physiological configuration, persisted as TOML.
//!
//! The config is explicitly owned by a `ConfigStore` and handed to the
//! classifier and session manager at construction; every mutation goes
//! through `update()` and is written back to disk immediately.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default sampling interval used for zone-time accounting.
const DEFAULT_SAMPLE_INTERVAL_MS: u32 = 1000;

/// User physiological parameters driving zone and calorie math.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BiometricConfig {
    /// Maximum heart rate in BPM
    pub max_heart_rate: u16,
    /// Resting heart rate in BPM
    pub resting_heart_rate: u16,
    /// Age in years
    pub age_years: u8,
    /// Whether R-R intervals are buffered for HRV analysis
    pub hrv_enabled: bool,
    /// Expected interval between samples in milliseconds
    pub sample_interval_ms: u32,
    /// True once the user has set max HR explicitly; age changes then stop
    /// recomputing it
    #[serde(default)]
    pub max_hr_overridden: bool,
}

impl Default for BiometricConfig {
    fn default() -> Self {
        let age_years = 35;
        Self {
            max_heart_rate: max_hr_for_age(age_years),
            resting_heart_rate: 60,
            age_years,
            hrv_enabled: true,
            sample_interval_ms: DEFAULT_SAMPLE_INTERVAL_MS,
            max_hr_overridden: false,
        }
    }
}

/// Estimate maximum heart rate from age (Tanaka: 208 - 0.7 x age).
pub fn max_hr_for_age(age_years: u8) -> u16 {
    (208.0 - 0.7 * age_years as f64).round() as u16
}

/// A partial update; `None` fields are left unchanged.
#[derive(Debug, Clone, Default)]
pub struct ConfigUpdate {
    pub max_heart_rate: Option<u16>,
    pub resting_heart_rate: Option<u16>,
    pub age_years: Option<u8>,
    pub hrv_enabled: Option<bool>,
    pub sample_interval_ms: Option<u32>,
}

impl BiometricConfig {
    /// Apply a partial update. An explicit max HR marks the value as
    /// overridden; otherwise an age change re-derives it.
    pub fn apply(&mut self, update: ConfigUpdate) {
        if let Some(age) = update.age_years {
            self.age_years = age;
            if !self.max_hr_overridden {
                self.max_heart_rate = max_hr_for_age(age);
            }
        }
        if let Some(max_hr) = update.max_heart_rate {
            self.max_heart_rate = max_hr;
            self.max_hr_overridden = true;
        }
        if let Some(resting) = update.resting_heart_rate {
            self.resting_heart_rate = resting;
        }
        if let Some(enabled) = update.hrv_enabled {
            self.hrv_enabled = enabled;
        }
        if let Some(interval) = update.sample_interval_ms {
            self.sample_interval_ms = interval;
        }
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Serialize error: {0}")]
    SerializeError(String),
}

/// Get the application data directory.
pub fn get_data_dir() -> PathBuf {
    directories::ProjectDirs::from("com", "pulsekit", "PulseKit")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Get the default configuration file path.
pub fn get_config_path() -> PathBuf {
    get_data_dir().join("config.toml")
}

/// Owns the on-disk configuration and serializes all mutation through it.
#[derive(Debug)]
pub struct ConfigStore {
    path: PathBuf,
    config: BiometricConfig,
}

impl ConfigStore {
    /// Load configuration from the given path, falling back to defaults
    /// when the file does not exist yet.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref().to_path_buf();

        let config = if path.exists() {
            let content = std::fs::read_to_string(&path)
                .map_err(|e| ConfigError::IoError(e.to_string()))?;
            toml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))?
        } else {
            BiometricConfig::default()
        };

        Ok(Self { path, config })
    }

    /// Load from the default platform location.
    pub fn load_default() -> Result<Self, ConfigError> {
        Self::load(get_config_path())
    }

    /// The current configuration.
    pub fn config(&self) -> &BiometricConfig {
        &self.config
    }

    /// Apply a partial update and persist the result.
    pub fn update(&mut self, update: ConfigUpdate) -> Result<&BiometricConfig, ConfigError> {
        self.config.apply(update);
        self.save()?;
        Ok(&self.config)
    }

    /// Re-read the configuration from disk, discarding in-memory state.
    pub fn reload(&mut self) -> Result<&BiometricConfig, ConfigError> {
        let reloaded = Self::load(&self.path)?;
        self.config = reloaded.config;
        Ok(&self.config)
    }

    /// Write the current configuration to disk.
    pub fn save(&self) -> Result<(), ConfigError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::IoError(e.to_string()))?;
        }

        let content = toml::to_string_pretty(&self.config)
            .map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        std::fs::write(&self.path, content).map_err(|e| ConfigError::IoError(e.to_string()))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_max_hr_for_age() {
        // 208 - 0.7 * 30 = 187
        assert_eq!(max_hr_for_age(30), 187);
        // 208 - 0.7 * 50 = 173
        assert_eq!(max_hr_for_age(50), 173);
    }

    #[test]
    fn test_age_update_rederives_max_hr() {
        let mut config = BiometricConfig::default();
        config.apply(ConfigUpdate {
            age_years: Some(40),
            ..Default::default()
        });
        assert_eq!(config.max_heart_rate, max_hr_for_age(40));
    }

    #[test]
    fn test_explicit_max_hr_sticks_across_age_changes() {
        let mut config = BiometricConfig::default();
        config.apply(ConfigUpdate {
            max_heart_rate: Some(192),
            ..Default::default()
        });
        config.apply(ConfigUpdate {
            age_years: Some(55),
            ..Default::default()
        });
        assert_eq!(config.max_heart_rate, 192);
        assert_eq!(config.age_years, 55);
    }

    #[test]
    fn test_store_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut store = ConfigStore::load(&path).unwrap();
        store
            .update(ConfigUpdate {
                resting_heart_rate: Some(52),
                hrv_enabled: Some(false),
                ..Default::default()
            })
            .unwrap();

        let reloaded = ConfigStore::load(&path).unwrap();
        assert_eq!(reloaded.config().resting_heart_rate, 52);
        assert!(!reloaded.config().hrv_enabled);
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::load(dir.path().join("nope.toml")).unwrap();
        assert_eq!(*store.config(), BiometricConfig::default());
    }
}
