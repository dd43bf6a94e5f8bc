//! Reduces arbitrary errors to an [`ErrorKind`].
//!
//! Precedence, strictly in order:
//!
//! 1. a [`DomainError`] anywhere in the source chain keeps its kind;
//! 2. structured OS/runtime signals (`io::Error` kinds and raw OS codes,
//!    `tokio` timeouts) map through a fixed table;
//! 3. keyword patterns over the lowercased message ([`ErrorDetector`]);
//! 4. [`ErrorKind::Unknown`].
//!
//! Structured signals always win over text, so an I/O error whose message
//! happens to mention `git` is still classified by its error code.

use std::error::Error as StdError;
use std::io;
use std::sync::OnceLock;

use super::{DomainError, ErrorDetector, ErrorKind};

fn detector() -> &'static ErrorDetector {
    static DETECTOR: OnceLock<ErrorDetector> = OnceLock::new();
    DETECTOR.get_or_init(ErrorDetector::new)
}

/// Iterates over `error` and all of its sources.
fn chain<'a>(
    error: &'a (dyn StdError + 'static),
) -> impl Iterator<Item = &'a (dyn StdError + 'static)> {
    std::iter::successors(Some(error), |&current| current.source())
}

/// Classifies an error and its source chain.
pub fn classify(error: &(dyn StdError + 'static)) -> ErrorKind {
    if let Some(tagged) = chain(error).find_map(|e| e.downcast_ref::<DomainError>()) {
        return tagged.kind();
    }

    if let Some(kind) = chain(error).find_map(classify_structured) {
        return kind;
    }

    let text = chain(error)
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join(": ");
    classify_message(&text).unwrap_or(ErrorKind::Unknown)
}

/// Structured stage only: `io::Error` and timeout types.
fn classify_structured(error: &(dyn StdError + 'static)) -> Option<ErrorKind> {
    if let Some(io_error) = error.downcast_ref::<io::Error>() {
        return classify_io_error(io_error);
    }
    if error.downcast_ref::<tokio::time::error::Elapsed>().is_some() {
        return Some(ErrorKind::ProcessTimeout);
    }
    None
}

/// Maps an `io::Error` through the raw OS code table, then its `ErrorKind`.
pub fn classify_io_error(error: &io::Error) -> Option<ErrorKind> {
    if let Some(kind) = error.raw_os_error().and_then(kind_from_os_code) {
        return Some(kind);
    }

    match error.kind() {
        io::ErrorKind::AlreadyExists => Some(ErrorKind::DirectoryExists),
        io::ErrorKind::NotFound => Some(ErrorKind::FileNotFound),
        io::ErrorKind::PermissionDenied => Some(ErrorKind::PermissionDenied),
        io::ErrorKind::OutOfMemory => Some(ErrorKind::OutOfMemory),
        io::ErrorKind::TimedOut => Some(ErrorKind::NetworkTimeout),
        io::ErrorKind::AddrInUse => Some(ErrorKind::PortInUse),
        io::ErrorKind::ConnectionRefused
        | io::ErrorKind::ConnectionReset
        | io::ErrorKind::ConnectionAborted
        | io::ErrorKind::NotConnected
        | io::ErrorKind::AddrNotAvailable => Some(ErrorKind::NetworkUnavailable),
        io::ErrorKind::WriteZero => Some(ErrorKind::FileWriteFailed),
        _ => None,
    }
}

#[cfg(unix)]
fn kind_from_os_code(code: i32) -> Option<ErrorKind> {
    const ENOMEM: i32 = 12;
    const EMFILE: i32 = 24;
    const ENOSPC: i32 = 28;
    #[cfg(target_os = "linux")]
    const ENAMETOOLONG: i32 = 36;
    #[cfg(not(target_os = "linux"))]
    const ENAMETOOLONG: i32 = 63;

    match code {
        ENOMEM => Some(ErrorKind::OutOfMemory),
        EMFILE => Some(ErrorKind::TooManyOpenFiles),
        ENOSPC => Some(ErrorKind::DiskFull),
        ENAMETOOLONG => Some(ErrorKind::PathTooLong),
        _ => None,
    }
}

#[cfg(windows)]
fn kind_from_os_code(code: i32) -> Option<ErrorKind> {
    const ERROR_TOO_MANY_OPEN_FILES: i32 = 4;
    const ERROR_NOT_ENOUGH_MEMORY: i32 = 8;
    const ERROR_HANDLE_DISK_FULL: i32 = 39;
    const ERROR_DISK_FULL: i32 = 112;
    const ERROR_FILENAME_EXCED_RANGE: i32 = 206;

    match code {
        ERROR_NOT_ENOUGH_MEMORY => Some(ErrorKind::OutOfMemory),
        ERROR_TOO_MANY_OPEN_FILES => Some(ErrorKind::TooManyOpenFiles),
        ERROR_HANDLE_DISK_FULL | ERROR_DISK_FULL => Some(ErrorKind::DiskFull),
        ERROR_FILENAME_EXCED_RANGE => Some(ErrorKind::PathTooLong),
        _ => None,
    }
}

#[cfg(not(any(unix, windows)))]
fn kind_from_os_code(_code: i32) -> Option<ErrorKind> {
    None
}

/// Text-only stage, exposed so it can be tested on its own.
pub fn classify_message(text: &str) -> Option<ErrorKind> {
    detector().classify_message(text)
}

/// Classifies the exit status of a finished child process.
///
/// `None` means the process was terminated by a signal. A zero exit code is
/// not a failure and yields `None`.
pub fn classify_exit_status(code: Option<i32>) -> Option<ErrorKind> {
    match code {
        None => Some(ErrorKind::ProcessKilled),
        Some(0) => None,
        Some(_) => Some(ErrorKind::ProcessExitedNonZero),
    }
}
