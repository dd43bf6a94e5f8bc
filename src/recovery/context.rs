//! Per-run recovery state and per-error context.

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::ErrorKind;

/// Key used when the error context names no project.
pub const DEFAULT_CONTEXT_KEY: &str = "default";

/// Free-form information about where an error happened.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ErrorContext {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    /// Workflow stage, e.g. `preflight` or `generate`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<String>,
    /// Port involved, for port conflicts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
}

impl ErrorContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the project name, which also keys the retry counter.
    pub fn with_project(mut self, name: impl Into<String>) -> Self {
        self.project_name = Some(name.into());
        self
    }

    /// Sets the directory being generated or cleaned.
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Sets the workflow stage.
    pub fn with_stage(mut self, stage: impl Into<String>) -> Self {
        self.stage = Some(stage.into());
        self
    }

    /// Sets the port, used to suggest a free alternative.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// The retry-counter key component: the project name or `"default"`.
    pub fn attempt_key(&self) -> &str {
        self.project_name
            .as_deref()
            .filter(|name| !name.is_empty())
            .unwrap_or(DEFAULT_CONTEXT_KEY)
    }

    /// The context as a JSON object for logs and panels.
    pub fn to_details(&self) -> Map<String, Value> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        }
    }
}

/// State shared by every recovery decision within one invocation.
///
/// Created once per run and passed explicitly to the coordinator.
#[derive(Debug, Default)]
pub struct RecoveryContext {
    attempts: HashMap<(ErrorKind, String), u32>,
    error_count: u32,
    skipped_features: BTreeSet<String>,
}

impl RecoveryContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Increments and returns the attempt count for `(kind, key)`.
    pub fn record_attempt(&mut self, kind: ErrorKind, key: &str) -> u32 {
        let count = self.attempts.entry((kind, key.to_string())).or_insert(0);
        *count += 1;
        *count
    }

    /// Attempts recorded so far for `(kind, key)`.
    pub fn attempts(&self, kind: ErrorKind, key: &str) -> u32 {
        self.attempts
            .get(&(kind, key.to_string()))
            .copied()
            .unwrap_or(0)
    }

    pub(crate) fn record_error(&mut self) {
        self.error_count += 1;
    }

    /// Number of errors reported this run.
    pub fn error_count(&self) -> u32 {
        self.error_count
    }

    pub fn skip_feature(&mut self, feature: &str) {
        self.skipped_features.insert(feature.to_string());
    }

    pub fn is_skipped(&self, feature: &str) -> bool {
        self.skipped_features.contains(feature)
    }

    /// Features disabled this run, sorted.
    pub fn skipped_features(&self) -> impl Iterator<Item = &str> {
        self.skipped_features.iter().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attempt_key_defaults() {
        assert_eq!(ErrorContext::new().attempt_key(), "default");
        assert_eq!(ErrorContext::new().with_project("").attempt_key(), "default");
        assert_eq!(ErrorContext::new().with_project("my-app").attempt_key(), "my-app");
    }

    #[test]
    fn test_attempts_are_per_kind_and_key() {
        let mut ctx = RecoveryContext::new();
        assert_eq!(ctx.record_attempt(ErrorKind::PortInUse, "a"), 1);
        assert_eq!(ctx.record_attempt(ErrorKind::PortInUse, "a"), 2);
        assert_eq!(ctx.record_attempt(ErrorKind::PortInUse, "b"), 1);
        assert_eq!(ctx.record_attempt(ErrorKind::NetworkTimeout, "a"), 1);
        assert_eq!(ctx.attempts(ErrorKind::PortInUse, "a"), 2);
        assert_eq!(ctx.attempts(ErrorKind::DiskFull, "a"), 0);
    }

    #[test]
    fn test_skipped_features_sorted() {
        let mut ctx = RecoveryContext::new();
        ctx.skip_feature("git");
        ctx.skip_feature("docker");
        ctx.skip_feature("git");
        assert!(ctx.is_skipped("docker"));
        assert_eq!(ctx.skipped_features().collect::<Vec<_>>(), ["docker", "git"]);
    }

    #[test]
    fn test_context_details() {
        let details = ErrorContext::new()
            .with_project("my-app")
            .with_path(Path::new("/tmp/my-app"))
            .with_stage("generate")
            .to_details();
        assert_eq!(details["project_name"], "my-app");
        assert_eq!(details["stage"], "generate");
        assert!(!details.contains_key("port"));
    }
}
