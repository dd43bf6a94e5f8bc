//! The typed failure carried across module boundaries.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use super::ErrorKind;

/// A classified failure with contextual detail.
///
/// Fields are private: once built, a `DomainError` is read-only for the
/// logger and the recovery coordinator. Details can only be attached while
/// constructing it through the consuming `with_*` methods.
#[derive(Debug, Clone, PartialEq, Serialize, thiserror::Error)]
#[error("{message}")]
pub struct DomainError {
    kind: ErrorKind,
    message: String,
    details: BTreeMap<String, Value>,
    timestamp: DateTime<Utc>,
}

impl DomainError {
    /// Creates a new error stamped with the current time.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            details: BTreeMap::new(),
            timestamp: Utc::now(),
        }
    }

    /// Attaches a detail value.
    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }

    /// The failure kind.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Human-readable message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Structured details, sorted by key.
    pub fn details(&self) -> &BTreeMap<String, Value> {
        &self.details
    }

    /// When the error was created.
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

impl From<ErrorKind> for DomainError {
    fn from(kind: ErrorKind) -> Self {
        let descriptor = super::describe(kind);
        DomainError::new(kind, descriptor.message)
    }
}

/// Result alias for operations that fail with a [`DomainError`].
pub type DomainResult<T> = Result<T, DomainError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_domain_error() {
        let error = DomainError::new(ErrorKind::NodeNotFound, "node missing");
        assert_eq!(error.kind(), ErrorKind::NodeNotFound);
        assert_eq!(error.message(), "node missing");
        assert!(error.details().is_empty());
        assert_eq!(error.to_string(), "node missing");
    }

    #[test]
    fn test_details_are_attached_at_construction() {
        let error = DomainError::new(ErrorKind::DependencyVersionMismatch, "node too old")
            .with_detail("tool", "node")
            .with_detail("found", "16.20.0")
            .with_detail("required", "18.0.0");

        assert_eq!(error.details().len(), 3);
        assert_eq!(error.details().get("tool"), Some(&Value::from("node")));
    }

    #[test]
    fn test_from_kind_uses_descriptor_message() {
        let error = DomainError::from(ErrorKind::DiskFull);
        assert_eq!(error.message(), "No space left on device");
    }

    #[test]
    fn test_serializes_kind_code() {
        let error = DomainError::new(ErrorKind::PortInUse, "port 8000 busy").with_detail("port", 8000);
        let json = serde_json::to_value(&error).unwrap();
        assert_eq!(json["kind"], "port_in_use");
        assert_eq!(json["details"]["port"], 8000);
    }
}
