//! Configuration for the stress feature extractor.

use crate::core::windowing::{WindowError, WindowParams};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

/// Main configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Sampling rates and window geometry per signal
    pub pipeline: PipelineConfig,

    /// Recording column names
    pub columns: ColumnConfig,

    /// Default directory for feature reports
    pub export_path: PathBuf,

    /// Path for storing extraction statistics
    pub data_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("synheart-stress-features");

        Self {
            pipeline: PipelineConfig::default(),
            columns: ColumnConfig::default(),
            export_path: data_dir.join("exports"),
            data_path: data_dir,
        }
    }
}

impl Config {
    /// Load configuration from the default location.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::config_path())
    }

    /// Load configuration from `config_path`, or defaults if it does not exist.
    pub fn load_from(config_path: &Path) -> Result<Self, ConfigError> {
        if config_path.exists() {
            let content = std::fs::read_to_string(config_path)
                .map_err(|e| ConfigError::IoError(e.to_string()))?;
            let config: Config = serde_json::from_str(&content)
                .map_err(|e| ConfigError::ParseError(e.to_string()))?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Like [`Config::load`], but an unreadable file logs a warning and
    /// yields the defaults.
    pub fn load_or_default() -> Self {
        Self::load_or_default_from(&Self::config_path())
    }

    pub fn load_or_default_from(config_path: &Path) -> Self {
        Self::load_from(config_path).unwrap_or_else(|e| {
            warn!(
                path = %config_path.display(),
                error = %e,
                "Could not load config, using defaults"
            );
            Self::default()
        })
    }

    /// Save configuration to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        let config_path = Self::config_path();

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::IoError(e.to_string()))?;
        }

        let content = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        std::fs::write(&config_path, content).map_err(|e| ConfigError::IoError(e.to_string()))?;

        Ok(())
    }

    /// Get the path to the configuration file.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("synheart-stress-features")
            .join("config.json")
    }

    /// Path of the persisted extraction statistics.
    pub fn stats_path(&self) -> PathBuf {
        self.data_path.join("extraction_stats.json")
    }

    /// Ensure all required directories exist.
    pub fn ensure_directories(&self) -> Result<(), ConfigError> {
        std::fs::create_dir_all(&self.export_path)
            .map_err(|e| ConfigError::IoError(e.to_string()))?;
        std::fs::create_dir_all(&self.data_path)
            .map_err(|e| ConfigError::IoError(e.to_string()))?;
        Ok(())
    }
}

/// Sampling rate and window geometry of one signal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WindowConfig {
    pub sampling_rate_hz: f64,
    pub window_secs: f64,
    pub shift_secs: f64,
}

impl WindowConfig {
    pub const fn new(sampling_rate_hz: f64, window_secs: f64, shift_secs: f64) -> Self {
        Self {
            sampling_rate_hz,
            window_secs,
            shift_secs,
        }
    }

    /// Window length and stride in samples.
    pub fn params(&self) -> Result<WindowParams, WindowError> {
        WindowParams::from_seconds(self.sampling_rate_hz, self.window_secs, self.shift_secs)
    }
}

/// Per-signal windowing for one pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub acc: WindowConfig,
    pub bvp: WindowConfig,
    pub temp: WindowConfig,
    /// Run the three featurizers on separate threads
    #[serde(default)]
    pub parallel: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            acc: WindowConfig::new(32.0, 5.0, 0.25),
            bvp: WindowConfig::new(64.0, 60.0, 5.0),
            temp: WindowConfig::new(4.0, 60.0, 0.25),
            parallel: false,
        }
    }
}

/// Names of the signal columns in a recording.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnConfig {
    pub acc_x: String,
    pub acc_y: String,
    pub acc_z: String,
    pub bvp: String,
    pub temp: String,
}

impl Default for ColumnConfig {
    fn default() -> Self {
        Self {
            acc_x: "ACC_x".to_string(),
            acc_y: "ACC_y".to_string(),
            acc_z: "ACC_z".to_string(),
            bvp: "BVP".to_string(),
            temp: "TEMP".to_string(),
        }
    }
}

/// Configuration errors.
#[derive(Debug)]
pub enum ConfigError {
    IoError(String),
    ParseError(String),
    SerializeError(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "IO error: {e}"),
            ConfigError::ParseError(e) => write!(f, "Parse error: {e}"),
            ConfigError::SerializeError(e) => write!(f, "Serialize error: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {}
