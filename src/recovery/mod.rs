//! Error reporting and recovery decisions.
//!
//! [`RecoveryCoordinator`] is the single place where errors are shown to the
//! user. Its per-run state lives in an explicit [`RecoveryContext`] that the
//! caller creates once per invocation.

mod context;
mod coordinator;
mod outcome;

pub use context::{ErrorContext, RecoveryContext, DEFAULT_CONTEXT_KEY};
pub use coordinator::{
    find_domain_error, ErrorReport, RecoveryCoordinator, DEFAULT_MAX_ATTEMPTS, ERROR_REPORT_FILE,
};
pub use outcome::{RecoveryOption, RecoveryOutcome};
