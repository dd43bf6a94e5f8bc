//! Turns raw errors into diagnostics and recovery decisions.
//!
//! Each reported error goes through the same stages, in order: classify,
//! describe, render, check recoverability, bound retries, dispatch. Lower
//! layers only return errors; this is the one place that prints them.

use std::collections::BTreeMap;
use std::error::Error as StdError;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Value};

use super::context::{ErrorContext, RecoveryContext};
use super::outcome::{RecoveryOption, RecoveryOutcome};
use crate::error::{classify, describe, DomainError, ErrorDescriptor, ErrorFamily, ErrorKind, RecoveryStrategy};
use crate::logging::Logger;
use crate::port::suggest_free_port;
use crate::ui::{DebugInfo, PanelContent, PanelRenderer};

/// Default ceiling on recovery dispatches per `(kind, project)`.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// File name of the end-of-run report.
pub const ERROR_REPORT_FILE: &str = "error-report.json";

/// End-of-run summary written in debug mode.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorReport {
    pub timestamp: DateTime<Utc>,
    pub platform: String,
    /// Version of the JavaScript runtime the project targets, when probed.
    pub runtime_version: Option<String>,
    pub tool_version: String,
    pub error_count: u32,
    pub log_file: Option<PathBuf>,
}

/// Central error handler for one invocation.
pub struct RecoveryCoordinator {
    logger: Arc<Logger>,
    renderer: PanelRenderer,
    max_attempts: u32,
    sink: Box<dyn Write + Send>,
}

impl std::fmt::Debug for RecoveryCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecoveryCoordinator")
            .field("renderer", &self.renderer)
            .field("max_attempts", &self.max_attempts)
            .finish_non_exhaustive()
    }
}

impl RecoveryCoordinator {
    /// A coordinator printing panels to stderr.
    pub fn new(logger: Arc<Logger>, renderer: PanelRenderer) -> Self {
        Self {
            logger,
            renderer,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            sink: Box::new(io::stderr()),
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Redirect panels and notes, e.g. into a buffer.
    pub fn with_sink(mut self, sink: Box<dyn Write + Send>) -> Self {
        self.sink = sink;
        self
    }

    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    pub fn renderer(&self) -> &PanelRenderer {
        &self.renderer
    }

    /// Handles one error and decides how the run continues.
    pub async fn report_error(
        &mut self,
        error: &(dyn StdError + 'static),
        context: &ErrorContext,
        state: &mut RecoveryContext,
    ) -> RecoveryOutcome {
        let kind = classify(error);
        let descriptor = describe(kind);
        state.record_error();

        let mut details = find_domain_error(error)
            .map(|e| e.details().clone())
            .unwrap_or_default();
        for (key, value) in context.to_details() {
            details.entry(key).or_insert(value);
        }

        self.logger.error_with(
            descriptor.message,
            error,
            Some(json!({ "context": context, "details": &details })),
        );

        let message = error.to_string();
        let panel = self.renderer.render_error(&PanelContent {
            descriptor: &descriptor,
            error_message: &message,
            details: &details,
            debug: self.logger.is_debug().then(|| DebugInfo {
                kind,
                log_path: self.logger.log_path(),
            }),
        });
        self.emit(&panel);

        if !descriptor.recoverable {
            return RecoveryOutcome::Fatal;
        }

        let key = context.attempt_key();
        let attempt = state.record_attempt(kind, key);
        if attempt > self.max_attempts {
            self.logger.warn(
                &format!(
                    "giving up on {} for {} after {} attempts",
                    kind, key, self.max_attempts
                ),
                Some(json!({ "kind": kind, "key": key, "attempt": attempt })),
            );
            let warning = self.renderer.render_warning(&format!(
                "Recovery limit reached for this error ({} attempts)",
                self.max_attempts
            ));
            self.emit(&warning);
            return RecoveryOutcome::Fatal;
        }

        let outcome = self.dispatch(&descriptor, context, &details, state).await;
        self.logger.info(
            "recovery outcome",
            Some(json!({ "kind": kind, "attempt": attempt, "outcome": &outcome })),
        );
        outcome
    }

    /// Like [`report_error`](Self::report_error), reduced to whether the
    /// run may continue.
    pub async fn report(
        &mut self,
        error: &(dyn StdError + 'static),
        context: &ErrorContext,
        state: &mut RecoveryContext,
    ) -> bool {
        self.report_error(error, context, state).await.is_recovered()
    }

    async fn dispatch(
        &mut self,
        descriptor: &ErrorDescriptor,
        context: &ErrorContext,
        details: &BTreeMap<String, Value>,
        state: &mut RecoveryContext,
    ) -> RecoveryOutcome {
        let kind = descriptor.kind;
        match descriptor.strategy() {
            RecoveryStrategy::SkipFeature => {
                let feature = kind.optional_feature().unwrap_or("optional feature");
                state.skip_feature(feature);
                let warning = self
                    .renderer
                    .render_warning(&format!("Continuing without {} support", feature));
                self.emit(&warning);
                RecoveryOutcome::Skipped {
                    feature: feature.to_string(),
                }
            }
            RecoveryStrategy::ManualInstructions => {
                let note = manual_instructions(kind, context.path.as_deref());
                let rendered = self.renderer.render_note(&note);
                self.emit(&rendered);
                RecoveryOutcome::Recovered { note }
            }
            RecoveryStrategy::PresentOptions => {
                let options = self.options_for(kind, context, details).await;
                for option in &options {
                    let rendered = self.renderer.render_note(&option.to_string());
                    self.emit(&rendered);
                }
                RecoveryOutcome::OptionsPresented { options }
            }
            RecoveryStrategy::Abort => RecoveryOutcome::Fatal,
        }
    }

    async fn options_for(
        &self,
        kind: ErrorKind,
        context: &ErrorContext,
        details: &BTreeMap<String, Value>,
    ) -> Vec<RecoveryOption> {
        match kind {
            ErrorKind::DirectoryExists => vec![
                RecoveryOption::Rename,
                RecoveryOption::Delete,
                RecoveryOption::Overwrite,
            ],
            ErrorKind::PortInUse => {
                let mut options = Vec::new();
                if let Some(port) = context.port {
                    if let Some(free) = suggest_free_port(port).await {
                        options.push(RecoveryOption::UsePort { port: free });
                    }
                }
                options.push(RecoveryOption::ChoosePort);
                options
            }
            ErrorKind::ProcessTimeout => vec![RecoveryOption::Retry, RecoveryOption::Abort],
            _ if kind.family() == ErrorFamily::Validation => {
                let field = details
                    .get("field")
                    .and_then(Value::as_str)
                    .unwrap_or_else(|| field_for(kind));
                vec![RecoveryOption::ReEnter {
                    field: field.to_string(),
                }]
            }
            _ => vec![RecoveryOption::Retry, RecoveryOption::Abort],
        }
    }

    fn emit(&mut self, text: &str) {
        let _ = self.sink.write_all(text.as_bytes());
        let _ = self.sink.flush();
    }

    /// Writes [`ERROR_REPORT_FILE`] into `dir` when debug mode is on.
    ///
    /// Returns the written path. Failures are logged, never returned.
    pub fn write_report(
        &self,
        dir: &Path,
        state: &RecoveryContext,
        runtime_version: Option<String>,
    ) -> Option<PathBuf> {
        if !self.logger.is_debug() {
            return None;
        }
        let report = ErrorReport {
            timestamp: Utc::now(),
            platform: format!("{}-{}", std::env::consts::OS, std::env::consts::ARCH),
            runtime_version,
            tool_version: env!("CARGO_PKG_VERSION").to_string(),
            error_count: state.error_count(),
            log_file: self.logger.log_path().map(Path::to_path_buf),
        };
        let path = dir.join(ERROR_REPORT_FILE);
        let written = std::fs::create_dir_all(dir)
            .and_then(|_| serde_json::to_vec_pretty(&report).map_err(io::Error::from))
            .and_then(|bytes| std::fs::write(&path, bytes));
        match written {
            Ok(()) => {
                self.logger.debug(
                    "wrote error report",
                    Some(json!({ "path": path.display().to_string() })),
                );
                Some(path)
            }
            Err(e) => {
                self.logger.warn(
                    &format!("could not write {}: {}", path.display(), e),
                    None,
                );
                None
            }
        }
    }
}

/// The first [`DomainError`] in `error`'s source chain.
pub fn find_domain_error<'a>(error: &'a (dyn StdError + 'static)) -> Option<&'a DomainError> {
    std::iter::successors(Some(error), |&e| e.source()).find_map(|e| e.downcast_ref::<DomainError>())
}

fn manual_instructions(kind: ErrorKind, path: Option<&Path>) -> String {
    let location = path
        .map(|p| format!("cd {} && ", p.display()))
        .unwrap_or_default();
    match kind {
        ErrorKind::DependencyInstallFailed => format!(
            "Dependencies were not installed. Run `{}npm install` manually once the problem is fixed.",
            location
        ),
        _ => format!(
            "Network access failed. Check your connection or proxy, then run `{}npm install` manually.",
            location
        ),
    }
}

fn field_for(kind: ErrorKind) -> &'static str {
    match kind {
        ErrorKind::InvalidProjectName => "project-name",
        ErrorKind::InvalidPort | ErrorKind::PortInUse => "port",
        ErrorKind::InvalidDatabaseName => "db-name",
        ErrorKind::InvalidCredentials => "db-user",
        _ => "value",
    }
}
