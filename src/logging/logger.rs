//! Per-run diagnostic logger.
//!
//! Outside debug mode `debug`/`info` are no-ops and `warn`/`error` only go to
//! the console; nothing touches the filesystem. In debug mode each call is
//! also appended as one JSON line to a file owned by this run, and old run
//! files beyond the retention limit are pruned when the logger is created.
//!
//! Logging never fails the caller: every I/O error is swallowed.

use std::error::Error as StdError;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::LogLevel;
use crate::config::WizardSettings;
use crate::error::{classify, ErrorKind};

/// File name prefix of run logs.
pub const LOG_FILE_PREFIX: &str = "stackwizard-";

const LOG_FILE_EXTENSION: &str = "log";

const MAX_NAME_ATTEMPTS: u32 = 1000;

/// Where and how much to log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggerConfig {
    /// Enables file logging and debug/info console output.
    pub debug: bool,
    /// Directory that receives run logs.
    pub log_dir: PathBuf,
    /// Number of run logs kept after pruning, the current one included.
    pub max_files: usize,
}

impl LoggerConfig {
    /// Console-only configuration.
    pub fn console() -> Self {
        Self {
            debug: false,
            log_dir: crate::config::default_log_dir(),
            max_files: 10,
        }
    }
}

impl From<&WizardSettings> for LoggerConfig {
    fn from(settings: &WizardSettings) -> Self {
        Self {
            debug: settings.debug,
            log_dir: settings.log_dir(),
            max_files: settings.max_log_files,
        }
    }
}

/// Error information attached to a log entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogErrorRecord {
    /// Classified kind.
    pub kind: ErrorKind,
    /// Top-level message.
    pub message: String,
    /// Messages of the source chain, outermost first.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<String>,
}

impl LogErrorRecord {
    /// Captures an error and its source chain.
    pub fn capture(error: &(dyn StdError + 'static)) -> Self {
        let sources = std::iter::successors(error.source(), |&e| e.source())
            .map(|e| e.to_string())
            .collect();
        Self {
            kind: classify(error),
            message: error.to_string(),
            sources,
        }
    }
}

/// One line of a run log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    /// When the entry was written (UTC).
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub message: String,
    /// Structured context passed by the caller.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    /// Present for entries logged through [`Logger::error_with`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<LogErrorRecord>,
}

/// Diagnostic sink shared by the recovery components.
#[derive(Debug)]
pub struct Logger {
    debug: bool,
    file: Option<File>,
    path: Option<PathBuf>,
}

impl Default for Logger {
    fn default() -> Self {
        Self::console()
    }
}

impl Logger {
    /// A logger that never writes files.
    pub fn console() -> Self {
        Self {
            debug: false,
            file: None,
            path: None,
        }
    }

    /// Creates the logger for this run.
    ///
    /// In debug mode this opens a fresh log file under `config.log_dir` and
    /// prunes older files. If the file cannot be created the logger keeps
    /// working console-only.
    pub fn new(config: &LoggerConfig) -> Self {
        if !config.debug {
            return Self::console();
        }

        let opened = fs::create_dir_all(&config.log_dir)
            .and_then(|_| open_run_file(&config.log_dir));
        match opened {
            Ok((file, path)) => {
                let logger = Self {
                    debug: true,
                    file: Some(file),
                    path: Some(path),
                };
                logger.debug(
                    "debug logging enabled",
                    Some(serde_json::json!({
                        "version": env!("CARGO_PKG_VERSION"),
                        "platform": std::env::consts::OS,
                    })),
                );
                if let Some(active) = logger.path.as_deref() {
                    prune_logs(&config.log_dir, config.max_files, active);
                }
                logger
            }
            Err(e) => {
                tracing::warn!(
                    "could not create debug log in {}: {}",
                    config.log_dir.display(),
                    e
                );
                Self {
                    debug: true,
                    file: None,
                    path: None,
                }
            }
        }
    }

    /// Whether debug mode is active.
    pub fn is_debug(&self) -> bool {
        self.debug
    }

    /// The file this run logs to, if any.
    pub fn log_path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Debug-mode only; dropped otherwise.
    pub fn debug(&self, message: &str, data: Option<Value>) {
        self.log(LogLevel::Debug, message, data, None);
    }

    /// Debug-mode only; dropped otherwise.
    pub fn info(&self, message: &str, data: Option<Value>) {
        self.log(LogLevel::Info, message, data, None);
    }

    /// Always reaches the console.
    pub fn warn(&self, message: &str, data: Option<Value>) {
        self.log(LogLevel::Warn, message, data, None);
    }

    /// Always reaches the console. See [`Logger::error_with`] to attach an error.
    pub fn error(&self, message: &str, data: Option<Value>) {
        self.log(LogLevel::Error, message, data, None);
    }

    /// Logs an error together with its classified kind and source chain.
    pub fn error_with(&self, message: &str, error: &(dyn StdError + 'static), data: Option<Value>) {
        self.log(
            LogLevel::Error,
            message,
            data,
            Some(LogErrorRecord::capture(error)),
        );
    }

    fn log(&self, level: LogLevel, message: &str, data: Option<Value>, error: Option<LogErrorRecord>) {
        if !self.debug && matches!(level, LogLevel::Trace | LogLevel::Debug | LogLevel::Info) {
            return;
        }

        emit_console(level, message, data.as_ref(), error.as_ref());

        if let Some(file) = &self.file {
            let entry = LogEntry {
                timestamp: Utc::now(),
                level,
                message: message.to_string(),
                data,
                error,
            };
            let _ = append_entry(file, &entry);
        }
    }
}

fn emit_console(level: LogLevel, message: &str, data: Option<&Value>, error: Option<&LogErrorRecord>) {
    let data = data.map(Value::to_string).unwrap_or_default();
    let kind = error.map(|e| e.kind.as_str()).unwrap_or_default();
    match level {
        LogLevel::Trace => tracing::trace!(data = %data, "{}", message),
        LogLevel::Debug => tracing::debug!(data = %data, "{}", message),
        LogLevel::Info => tracing::info!(data = %data, "{}", message),
        LogLevel::Warn => tracing::warn!("{}", message),
        LogLevel::Error if kind.is_empty() => tracing::error!("{}", message),
        LogLevel::Error => tracing::error!(kind = kind, "{}", message),
        LogLevel::Off => {}
    }
}

fn append_entry(mut file: &File, entry: &LogEntry) -> io::Result<()> {
    let line = serde_json::to_string(entry)?;
    writeln!(file, "{}", line)
}

/// Opens a new, uniquely named run log in `dir`.
fn open_run_file(dir: &Path) -> io::Result<(File, PathBuf)> {
    let stamp = Utc::now().format("%Y%m%d-%H%M%S%.3f");
    for attempt in 0..MAX_NAME_ATTEMPTS {
        let name = if attempt == 0 {
            format!("{}{}.{}", LOG_FILE_PREFIX, stamp, LOG_FILE_EXTENSION)
        } else {
            format!("{}{}-{}.{}", LOG_FILE_PREFIX, stamp, attempt, LOG_FILE_EXTENSION)
        };
        let path = dir.join(name);
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => return Ok((file, path)),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(e),
        }
    }
    Err(io::Error::new(
        io::ErrorKind::AlreadyExists,
        "no free log file name for this timestamp",
    ))
}

fn is_run_log(path: &Path) -> bool {
    let name_matches = path
        .file_name()
        .and_then(|name| name.to_str())
        .map(|name| name.starts_with(LOG_FILE_PREFIX))
        .unwrap_or(false);
    name_matches && path.extension().and_then(|e| e.to_str()) == Some(LOG_FILE_EXTENSION)
}

/// Deletes all but the `keep` most recently modified run logs in `dir`.
///
/// `active` is never deleted and counts towards `keep`. Deletion failures
/// are ignored. Returns the number of files removed.
pub fn prune_logs(dir: &Path, keep: usize, active: &Path) -> usize {
    let Ok(entries) = fs::read_dir(dir) else {
        return 0;
    };

    let mut logs: Vec<(SystemTime, PathBuf)> = entries
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| is_run_log(path) && path != active)
        .map(|path| {
            let modified = fs::metadata(&path)
                .and_then(|m| m.modified())
                .unwrap_or(SystemTime::UNIX_EPOCH);
            (modified, path)
        })
        .collect();

    // Newest first; names embed the creation time, so they break mtime ties.
    logs.sort_by(|a, b| b.cmp(a));

    let keep_others = keep.saturating_sub(1);
    logs.into_iter()
        .skip(keep_others)
        .filter(|(_, path)| fs::remove_file(path).is_ok())
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DomainError;

    fn debug_config(dir: &Path) -> LoggerConfig {
        LoggerConfig {
            debug: true,
            log_dir: dir.to_path_buf(),
            max_files: 10,
        }
    }

    fn read_entries(path: &Path) -> Vec<LogEntry> {
        fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    fn count_logs(dir: &Path) -> usize {
        fs::read_dir(dir)
            .unwrap()
            .filter_map(Result::ok)
            .filter(|e| is_run_log(&e.path()))
            .count()
    }

    #[test]
    fn test_non_debug_mode_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let log_dir = dir.path().join("logs");
        let logger = Logger::new(&LoggerConfig {
            debug: false,
            log_dir: log_dir.clone(),
            max_files: 10,
        });

        logger.debug("d", None);
        logger.info("i", None);
        logger.warn("w", None);
        logger.error("e", None);

        assert!(!logger.is_debug());
        assert!(logger.log_path().is_none());
        assert!(!log_dir.exists());
    }

    #[test]
    fn test_debug_mode_appends_json_lines() {
        let dir = tempfile::tempdir().unwrap();
        let logger = Logger::new(&debug_config(dir.path()));

        logger.info("generating", Some(serde_json::json!({ "project": "my-app" })));
        logger.warn("docker missing", None);

        let path = logger.log_path().unwrap().to_path_buf();
        assert!(path.starts_with(dir.path()));

        let entries = read_entries(&path);
        // First entry is the start-up banner.
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[1].level, LogLevel::Info);
        assert_eq!(entries[1].message, "generating");
        assert_eq!(entries[1].data.as_ref().unwrap()["project"], "my-app");
        assert_eq!(entries[2].level, LogLevel::Warn);
        assert!(entries[2].data.is_none());
    }

    #[test]
    fn test_error_with_records_kind_and_chain() {
        let dir = tempfile::tempdir().unwrap();
        let logger = Logger::new(&debug_config(dir.path()));

        let error = DomainError::new(ErrorKind::PortInUse, "port 8000 busy");
        logger.error_with("preflight failed", &error, None);

        let entries = read_entries(logger.log_path().unwrap());
        let record = entries.last().unwrap().error.clone().unwrap();
        assert_eq!(record.kind, ErrorKind::PortInUse);
        assert_eq!(record.message, "port 8000 busy");
        assert!(record.sources.is_empty());
    }

    #[derive(Debug, thiserror::Error)]
    #[error("{message}")]
    struct Layer {
        message: &'static str,
        #[source]
        source: std::io::Error,
    }

    #[test]
    fn test_error_with_records_source_chain() {
        let dir = tempfile::tempdir().unwrap();
        let logger = Logger::new(&debug_config(dir.path()));

        let error = Layer {
            message: "could not write manifest",
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied"),
        };
        logger.error_with("generate failed", &error, None);

        let entries = read_entries(logger.log_path().unwrap());
        let record = entries.last().unwrap().error.clone().unwrap();
        assert_eq!(record.kind, ErrorKind::PermissionDenied);
        assert_eq!(record.message, "could not write manifest");
        assert_eq!(record.sources, ["access denied"]);
    }

    #[test]
    fn test_eleven_runs_leave_ten_logs() {
        let dir = tempfile::tempdir().unwrap();
        let config = debug_config(dir.path());

        let mut last = None;
        for _ in 0..11 {
            let logger = Logger::new(&config);
            last = logger.log_path().map(Path::to_path_buf);
        }

        assert_eq!(count_logs(dir.path()), 10);
        assert!(last.unwrap().exists());
    }

    #[test]
    fn test_prune_ignores_foreign_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("notes.txt"), "keep me").unwrap();
        fs::write(dir.path().join("stackwizard-old.log"), "").unwrap();
        let active = dir.path().join("stackwizard-new.log");
        fs::write(&active, "").unwrap();

        let removed = prune_logs(dir.path(), 1, &active);

        assert_eq!(removed, 1);
        assert!(dir.path().join("notes.txt").exists());
        assert!(active.exists());
    }

    #[test]
    fn test_unwritable_log_dir_degrades_to_console() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        fs::write(&blocker, "").unwrap();

        // log_dir lies below a regular file, so it can never be created
        let logger = Logger::new(&debug_config(&blocker.join("logs")));
        logger.error("still fine", None);

        assert!(logger.is_debug());
        assert!(logger.log_path().is_none());
    }
}
