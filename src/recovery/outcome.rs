//! Results of a recovery decision.

use std::fmt;

use serde::Serialize;

/// A choice offered to the user after a recoverable error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "option", rename_all = "snake_case")]
pub enum RecoveryOption {
    /// Pick a different project name.
    Rename,
    /// Delete the existing directory and start over.
    Delete,
    /// Generate into the existing directory.
    Overwrite,
    /// Use the given free port instead.
    UsePort { port: u16 },
    /// Enter another port by hand.
    ChoosePort,
    /// Enter a new value for a rejected field.
    ReEnter { field: String },
    /// Run the failed step again.
    Retry,
    /// Stop the run.
    Abort,
}

impl fmt::Display for RecoveryOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecoveryOption::Rename => f.write_str("Choose a different project name"),
            RecoveryOption::Delete => f.write_str("Delete the existing directory"),
            RecoveryOption::Overwrite => f.write_str("Overwrite the existing directory"),
            RecoveryOption::UsePort { port } => write!(f, "Use port {} instead", port),
            RecoveryOption::ChoosePort => f.write_str("Choose another port"),
            RecoveryOption::ReEnter { field } => write!(f, "Enter a new value for {}", field),
            RecoveryOption::Retry => f.write_str("Try again"),
            RecoveryOption::Abort => f.write_str("Abort"),
        }
    }
}

/// What the coordinator decided for one reported error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RecoveryOutcome {
    /// The run continues; `note` tells the user what to do by hand.
    Recovered { note: String },
    /// The caller must pick one of `options`.
    OptionsPresented { options: Vec<RecoveryOption> },
    /// An optional feature was disabled.
    Skipped { feature: String },
    /// The run cannot continue.
    Fatal,
}

impl RecoveryOutcome {
    /// False only for [`RecoveryOutcome::Fatal`].
    pub fn is_recovered(&self) -> bool {
        !matches!(self, RecoveryOutcome::Fatal)
    }

    pub fn options(&self) -> &[RecoveryOption] {
        match self {
            RecoveryOutcome::OptionsPresented { options } => options,
            _ => &[],
        }
    }
}
