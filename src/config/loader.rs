use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::config::types::Config;
use crate::runloop::WorkerMode;

/// Upper bound for `counter.work_delay_ms` (10 minutes).
pub const MAX_WORK_DELAY_MS: u64 = 600_000;

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file '{path}': {source}")]
    ParseError {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Config validation failed: {message}")]
    ValidationError { message: String },
}

impl Config {
    /// `~/.config/serialloop/config.toml` on Linux, the platform equivalent
    /// elsewhere via `dirs::config_dir()`, or the current directory.
    pub fn config_path() -> PathBuf {
        let config_dir = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        config_dir.join("serialloop").join("config.toml")
    }

    /// Load from the default location. A missing file yields defaults.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::config_path())
    }

    /// Load from `path`. A missing file yields defaults; anything else that
    /// fails to read, parse or validate is an error.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Config::default());
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Checks:
    /// - thread mode has a non-empty thread name
    /// - the work delay is at most [`MAX_WORK_DELAY_MS`]
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.run_loop.worker == WorkerMode::Thread && self.run_loop.thread_name.trim().is_empty()
        {
            return Err(ConfigError::ValidationError {
                message: "run_loop.thread_name must not be empty in thread mode".to_string(),
            });
        }

        if self.counter.work_delay_ms > MAX_WORK_DELAY_MS {
            return Err(ConfigError::ValidationError {
                message: format!(
                    "counter.work_delay_ms {} exceeds the maximum of {}",
                    self.counter.work_delay_ms, MAX_WORK_DELAY_MS
                ),
            });
        }

        Ok(())
    }
}
