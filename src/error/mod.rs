//! Error taxonomy and classification.
//!
//! Every failure the generator can hit is reduced to a closed [`ErrorKind`],
//! carried as a [`DomainError`], and explained to the user through an
//! [`ErrorDescriptor`]. Classification trusts structured signals first and
//! keyword heuristics last.

pub mod classification;
pub mod descriptor;
pub mod detector;
pub mod domain;
pub mod kind;

// Re-export main types for convenient access
pub use classification::{classify, classify_exit_status, classify_io_error, classify_message};
pub use descriptor::{describe, describe_code, ErrorDescriptor, RecoveryStrategy};
pub use detector::{ErrorDetector, ErrorPattern};
pub use domain::{DomainError, DomainResult};
pub use kind::{ErrorFamily, ErrorKind};
