//! Console logging setup and the per-run diagnostic logger.
//!
//! Console output goes through `tracing` to stderr so it never mixes with
//! the panels and summaries printed on stdout. The [`Logger`] sits on top:
//! it decides what reaches the console and, in debug mode, mirrors every
//! entry into a JSON-lines file.

mod logger;

pub use logger::{prune_logs, LogEntry, LogErrorRecord, Logger, LoggerConfig, LOG_FILE_PREFIX};

use serde::{Deserialize, Serialize};
use tracing_subscriber::{fmt, EnvFilter};

/// Log level, shared by the console filter and file entries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Trace level - most verbose
    Trace,
    /// Debug level
    Debug,
    /// Info level
    Info,
    /// Warning level (default: warnings and errors always reach the console)
    #[default]
    Warn,
    /// Error level - least verbose
    Error,
    /// Disable console logging entirely
    Off,
}

impl LogLevel {
    fn as_filter(self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
            LogLevel::Off => "off",
        }
    }
}

impl From<u8> for LogLevel {
    /// Convert verbosity count to log level.
    /// 0 = Warn, 1 = Info, 2 = Debug, 3+ = Trace
    fn from(verbosity: u8) -> Self {
        match verbosity {
            0 => LogLevel::Warn,
            1 => LogLevel::Info,
            2 => LogLevel::Debug,
            _ => LogLevel::Trace,
        }
    }
}

/// Configuration for console logging.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// The log level to use
    pub level: LogLevel,
    /// Whether to include timestamps
    pub with_timestamps: bool,
    /// Whether to include the target (module path)
    pub with_target: bool,
    /// Whether to emit ANSI colours
    pub with_ansi: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Warn,
            with_timestamps: false,
            with_target: false,
            with_ansi: true,
        }
    }
}

impl LoggingConfig {
    /// Set the log level.
    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    /// Set whether to include timestamps.
    pub fn with_timestamps(mut self, enabled: bool) -> Self {
        self.with_timestamps = enabled;
        self
    }

    /// Set whether to include the target (module path).
    pub fn with_target(mut self, enabled: bool) -> Self {
        self.with_target = enabled;
        self
    }

    /// Set whether to emit ANSI colours.
    pub fn with_ansi(mut self, enabled: bool) -> Self {
        self.with_ansi = enabled;
        self
    }

    /// Derive the console configuration from command-line flags.
    ///
    /// `--debug` lifts the level to at least debug and turns on timestamps
    /// and targets; `--quiet` limits output to errors.
    pub fn from_flags(debug: bool, verbosity: u8, quiet: bool) -> Self {
        if quiet {
            return Self::default().with_level(LogLevel::Error);
        }
        let level = match (debug, LogLevel::from(verbosity)) {
            (true, LogLevel::Trace) => LogLevel::Trace,
            (true, _) => LogLevel::Debug,
            (false, level) => level,
        };
        Self::default()
            .with_level(level)
            .with_timestamps(debug)
            .with_target(debug)
    }
}

/// Initialize console logging.
///
/// Call once at start-up. `RUST_LOG`, when set, takes precedence over the
/// configured level.
pub fn init_logging(config: LoggingConfig) {
    let env_filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::new(config.level.as_filter())
    };

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(config.with_target)
        .with_ansi(config.with_ansi);

    // A subscriber may already be installed (tests, embedding); keep it.
    if config.with_timestamps {
        let _ = subscriber.try_init();
    } else {
        let _ = subscriber.without_time().try_init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_from_verbosity() {
        assert_eq!(LogLevel::from(0), LogLevel::Warn);
        assert_eq!(LogLevel::from(1), LogLevel::Info);
        assert_eq!(LogLevel::from(2), LogLevel::Debug);
        assert_eq!(LogLevel::from(10), LogLevel::Trace);
    }

    #[test]
    fn test_from_flags_debug_lifts_level() {
        let config = LoggingConfig::from_flags(true, 0, false);
        assert_eq!(config.level, LogLevel::Debug);
        assert!(config.with_timestamps);

        let config = LoggingConfig::from_flags(true, 3, false);
        assert_eq!(config.level, LogLevel::Trace);
    }

    #[test]
    fn test_from_flags_quiet_wins() {
        let config = LoggingConfig::from_flags(true, 2, true);
        assert_eq!(config.level, LogLevel::Error);
    }

    #[test]
    fn test_level_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&LogLevel::Warn).unwrap(), "\"warn\"");
    }
}
