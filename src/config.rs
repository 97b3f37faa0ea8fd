//! Application configuration for the windowing tool.
//!
//! This is separate from the parameter blocks inside log files: it holds
//! user preferences such as where generated logs go.

use crate::log::DEFAULT_ANNOTATION;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Allowed difference between `end - start` and the declared length
    /// when checking a log, in seconds
    pub length_tolerance: f64,

    /// Annotation written into the `Windowing Log` section
    pub annotation: String,

    /// Directory for generated logs when no output path is given
    pub output_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("hvsr-windowing");

        Self {
            length_tolerance: 0.01,
            annotation: DEFAULT_ANNOTATION.to_string(),
            output_dir: data_dir,
        }
    }
}

impl Config {
    /// Load configuration from the default location.
    pub fn load() -> Result<Self, ConfigFileError> {
        let config_path = Self::config_path();

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)
                .map_err(|e| ConfigFileError::IoError(e.to_string()))?;
            let config: Config = serde_json::from_str(&content)
                .map_err(|e| ConfigFileError::ParseError(e.to_string()))?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to the default location.
    pub fn save(&self) -> Result<(), ConfigFileError> {
        let config_path = Self::config_path();

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigFileError::IoError(e.to_string()))?;
        }

        let content = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigFileError::SerializeError(e.to_string()))?;

        std::fs::write(&config_path, content).map_err(|e| ConfigFileError::IoError(e.to_string()))?;

        Ok(())
    }

    /// Get the path to the configuration file.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("hvsr-windowing")
            .join("config.json")
    }

    /// Ensure the output directory exists.
    pub fn ensure_directories(&self) -> Result<(), ConfigFileError> {
        std::fs::create_dir_all(&self.output_dir)
            .map_err(|e| ConfigFileError::IoError(e.to_string()))?;
        Ok(())
    }
}

/// Configuration file errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigFileError {
    #[error("IO error: {0}")]
    IoError(String),
    #[error("Parse error: {0}")]
    ParseError(String),
    #[error("Serialize error: {0}")]
    SerializeError(String),
}
