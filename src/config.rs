//! Generator settings.
//!
//! Settings are layered: built-in defaults, then an optional TOML file, then
//! `STACKWIZARD__<KEY>` environment variables. Command-line flags are applied
//! on top by the binary.

use std::path::{Path, PathBuf};
use std::time::Duration;

use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;

/// Default settings file looked up in the working directory.
pub const DEFAULT_SETTINGS_FILE: &str = "stackwizard.toml";

/// Errors that can occur when loading settings.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An explicitly requested settings file does not exist.
    #[error("settings file not found: {0}")]
    FileNotFound(String),

    /// The settings could not be parsed.
    #[error("failed to parse settings: {0}")]
    ParseError(#[from] config::ConfigError),

    /// The settings path is not valid UTF-8.
    #[error("invalid settings path: {0}")]
    InvalidPath(String),
}

/// Tunables for logging, recovery, cleanup and probing.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct WizardSettings {
    /// Write JSON-lines debug logs and an end-of-run report.
    pub debug: bool,
    /// Directory for debug log files. Defaults to `~/.stackwizard/logs`.
    pub log_dir: Option<PathBuf>,
    /// How many debug log files to keep.
    pub max_log_files: usize,
    /// Recovery dispatches allowed per `(kind, project)` pair.
    pub max_recovery_attempts: u32,
    /// Directories larger than this are backed up before removal.
    pub backup_threshold_bytes: u64,
    /// Timeout for tool version probes.
    pub probe_timeout_secs: u64,
    /// Timeout for dependency installation commands.
    pub install_timeout_secs: u64,
    /// Reject short database passwords instead of only warning.
    pub strict_passwords: bool,
}

impl Default for WizardSettings {
    fn default() -> Self {
        Self {
            debug: false,
            log_dir: None,
            max_log_files: 10,
            max_recovery_attempts: 3,
            backup_threshold_bytes: 1024 * 1024,
            probe_timeout_secs: 5,
            install_timeout_secs: 300,
            strict_passwords: true,
        }
    }
}

impl WizardSettings {
    /// Load settings from `path`, or from [`DEFAULT_SETTINGS_FILE`] if present.
    ///
    /// An explicit path that does not exist is an error; a missing default
    /// file is not.
    ///
    /// # Environment Variable Overrides
    ///
    /// `STACKWIZARD__<KEY>` overrides any key, e.g. `STACKWIZARD__DEBUG=true`.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        match path {
            Some(path) => {
                let path_str = path
                    .to_str()
                    .ok_or_else(|| ConfigError::InvalidPath(format!("{:?}", path)))?;
                if !path.exists() {
                    return Err(ConfigError::FileNotFound(path_str.to_string()));
                }
                builder = builder.add_source(File::with_name(path_str));
            }
            None => {
                builder = builder.add_source(File::with_name(DEFAULT_SETTINGS_FILE).required(false));
            }
        }

        let config = builder
            .add_source(
                Environment::with_prefix("STACKWIZARD")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(config.try_deserialize()?)
    }

    /// The effective debug log directory.
    pub fn log_dir(&self) -> PathBuf {
        self.log_dir.clone().unwrap_or_else(default_log_dir)
    }

    /// Timeout for tool version probes.
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }

    /// Timeout for dependency installation.
    pub fn install_timeout(&self) -> Duration {
        Duration::from_secs(self.install_timeout_secs)
    }
}

/// `~/.stackwizard/logs`, or `./.stackwizard/logs` without a home directory.
pub fn default_log_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".stackwizard")
        .join("logs")
}
