//! The project generation run.
//!
//! Stages run strictly in order: preflight checks, config validation, port
//! availability, generation, optional dependency install. Any stage error is
//! handed to the [`RecoveryCoordinator`] exactly once; a fatal outcome removes
//! whatever this run created.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::json;

use crate::cleanup::{CleanupOutcome, CleanupService};
use crate::config::WizardSettings;
use crate::error::{DomainError, DomainResult, ErrorKind};
use crate::logging::Logger;
use crate::port::is_port_free;
use crate::process::install_dependencies;
use crate::project::ProjectConfig;
use crate::recovery::{ErrorContext, RecoveryContext, RecoveryCoordinator, RecoveryOption, RecoveryOutcome};
use crate::requirements::{CommandProbe, SystemRequirementChecker, SystemRequirementReport, VersionProbe};
use crate::ui::{InterruptHandler, PanelRenderer, StepSpinner, Theme};
use crate::validation::{validate_config, ValidationOptions};

/// Manifest written into every generated project.
pub const MANIFEST_FILE: &str = "stackwizard.json";

/// Exit status of a finished run.
pub mod exit_codes {
    use std::process::ExitCode;

    /// The project was generated.
    pub fn success() -> ExitCode {
        ExitCode::from(0)
    }

    /// The run stopped without a project.
    pub fn failed() -> ExitCode {
        ExitCode::from(1)
    }
}

/// Lays down project files. Template rendering lives behind this trait.
#[async_trait]
pub trait ProjectGenerator: Send + Sync {
    /// Generates `config` into `target`, leaving out `skipped` features.
    ///
    /// Must fail with [`ErrorKind::DirectoryExists`] if `target` exists.
    async fn generate(&self, config: &ProjectConfig, target: &Path, skipped: &[String]) -> DomainResult<()>;
}

/// Creates the project directory and its manifest, nothing else.
#[derive(Debug, Clone, Copy, Default)]
pub struct SkeletonGenerator;

#[derive(Serialize)]
struct Manifest<'a> {
    generator: &'static str,
    version: &'static str,
    #[serde(flatten)]
    config: &'a ProjectConfig,
    enabled_features: Vec<&'a str>,
}

#[async_trait]
impl ProjectGenerator for SkeletonGenerator {
    async fn generate(&self, config: &ProjectConfig, target: &Path, skipped: &[String]) -> DomainResult<()> {
        if tokio::fs::try_exists(target).await.unwrap_or(false) {
            return Err(DomainError::new(
                ErrorKind::DirectoryExists,
                format!("{} already exists", target.display()),
            )
            .with_detail("path", target.display().to_string()));
        }

        let with_path = |e: std::io::Error, action: &str| {
            let kind = crate::error::classify(&e);
            DomainError::new(kind, format!("could not {} {}: {}", action, target.display(), e))
                .with_detail("path", target.display().to_string())
        };

        tokio::fs::create_dir_all(target)
            .await
            .map_err(|e| with_path(e, "create"))?;

        let manifest = Manifest {
            generator: env!("CARGO_PKG_NAME"),
            version: env!("CARGO_PKG_VERSION"),
            config,
            enabled_features: config
                .features
                .iter()
                .map(String::as_str)
                .filter(|f| !skipped.iter().any(|s| s == f))
                .collect(),
        };
        let body = serde_json::to_vec_pretty(&manifest)
            .map_err(|e| DomainError::new(ErrorKind::FileWriteFailed, e.to_string()))?;
        tokio::fs::write(target.join(MANIFEST_FILE), body)
            .await
            .map_err(|e| with_path(e, "write the manifest into"))?;
        Ok(())
    }
}

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunStatus {
    /// The project exists at the target path.
    Completed,
    /// A recoverable problem needs a decision; rerun after picking an option.
    NeedsInput { kind: ErrorKind, options: Vec<RecoveryOption> },
    /// An unrecoverable error ended the run.
    Failed { kind: ErrorKind },
}

/// Everything the caller needs to summarize a run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowReport {
    pub status: RunStatus,
    pub target: PathBuf,
    pub skipped_features: Vec<String>,
    pub notes: Vec<String>,
    pub error_count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cleanup: Option<CleanupOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report_file: Option<PathBuf>,
}

impl WorkflowReport {
    pub fn is_success(&self) -> bool {
        self.status == RunStatus::Completed
    }

    pub fn exit_code(&self) -> std::process::ExitCode {
        if self.is_success() {
            exit_codes::success()
        } else {
            exit_codes::failed()
        }
    }
}

/// Run-level switches that do not come from the settings file.
#[derive(Debug, Clone, Copy, Default)]
pub struct WorkflowOptions {
    /// Run `npm install` in the generated project.
    pub install: bool,
    /// Hide spinners.
    pub quiet: bool,
}

/// Drives one generation run.
pub struct GenerationWorkflow<P = CommandProbe, G = SkeletonGenerator> {
    settings: WizardSettings,
    options: WorkflowOptions,
    logger: Arc<Logger>,
    theme: Theme,
    checker: SystemRequirementChecker<P>,
    generator: G,
    coordinator: RecoveryCoordinator,
    cleanup: CleanupService,
    interrupt: InterruptHandler,
}

impl GenerationWorkflow<CommandProbe, SkeletonGenerator> {
    /// Workflow with real tool probes and the skeleton generator.
    pub fn new(settings: WizardSettings, logger: Arc<Logger>, theme: Theme) -> Self {
        let checker = SystemRequirementChecker::new(settings.probe_timeout());
        Self::with_parts(settings, logger, theme, checker, SkeletonGenerator)
    }
}

impl<P: VersionProbe, G: ProjectGenerator> GenerationWorkflow<P, G> {
    pub fn with_parts(
        settings: WizardSettings,
        logger: Arc<Logger>,
        theme: Theme,
        checker: SystemRequirementChecker<P>,
        generator: G,
    ) -> Self {
        let coordinator = RecoveryCoordinator::new(Arc::clone(&logger), PanelRenderer::new(theme))
            .with_max_attempts(settings.max_recovery_attempts);
        let cleanup = CleanupService::new(Arc::clone(&logger))
            .with_threshold(settings.backup_threshold_bytes)
            .with_theme(theme);
        Self {
            settings,
            options: WorkflowOptions::default(),
            logger,
            theme,
            checker,
            generator,
            coordinator,
            cleanup,
            interrupt: InterruptHandler::new(),
        }
    }

    pub fn with_options(mut self, options: WorkflowOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_interrupt(mut self, interrupt: InterruptHandler) -> Self {
        self.interrupt = interrupt;
        self
    }

    /// Redirect panels and notes, e.g. into a buffer.
    pub fn with_output(mut self, sink: Box<dyn Write + Send>) -> Self {
        self.coordinator = self.coordinator.with_sink(sink);
        self
    }

    pub fn interrupt(&self) -> &InterruptHandler {
        &self.interrupt
    }

    /// Generates `config` into `target`.
    pub async fn run(&mut self, config: &ProjectConfig, target: &Path) -> WorkflowReport {
        let mut state = RecoveryContext::new();
        let mut notes = Vec::new();
        let base = ErrorContext::new()
            .with_project(&config.name)
            .with_path(target);
        let existed_before = target.exists();

        self.logger.info(
            "starting generation",
            Some(json!({ "project": &config.name, "target": target.display().to_string() })),
        );

        let (status, requirements) = match self
            .stages(config, target, &base, &mut state, &mut notes)
            .await
        {
            Ok(requirements) => (RunStatus::Completed, requirements),
            Err(status) => (status, None),
        };

        let cleanup = match status {
            RunStatus::Failed { .. } if !existed_before && target.exists() => {
                Some(self.cleanup.cleanup(target))
            }
            _ => None,
        };

        let runtime_version = requirements
            .as_ref()
            .and_then(|r| r.get("node"))
            .and_then(|s| s.version)
            .map(|v| v.to_string());
        let report_file = self.logger.log_path().and_then(Path::parent).and_then(|dir| {
            self.coordinator
                .write_report(dir, &state, runtime_version)
        });

        let report = WorkflowReport {
            status,
            target: target.to_path_buf(),
            skipped_features: state.skipped_features().map(String::from).collect(),
            notes,
            error_count: state.error_count(),
            cleanup,
            report_file,
        };
        self.logger.info("generation finished", Some(json!({ "report": &report })));
        report
    }

    /// Runs every stage; `Err` carries the status of the stage that stopped.
    async fn stages(
        &mut self,
        config: &ProjectConfig,
        target: &Path,
        base: &ErrorContext,
        state: &mut RecoveryContext,
        notes: &mut Vec<String>,
    ) -> Result<Option<SystemRequirementReport>, RunStatus> {
        // Preflight always finishes (or fails fast) before anything is written.
        let spinner = StepSpinner::start("Checking system requirements", self.theme, self.options.quiet);
        let requirements = match self.checker.check_all(&self.logger).await {
            Ok(report) => {
                spinner.finish_and_clear();
                report
            }
            Err(e) => {
                spinner.finish_with_error("System requirements not met");
                return Err(self.stop(&e, base.clone().with_stage("preflight"), state).await);
            }
        };
        let missing: Vec<(&'static str, ErrorKind)> = self
            .checker
            .requirements()
            .iter()
            .filter(|tool| tool.optional && !requirements.is_installed(tool.name))
            .filter(|tool| config.features.iter().any(|f| f == tool.name))
            .map(|tool| (tool.name, tool.missing_kind))
            .collect();
        for (name, kind) in missing {
            let error = DomainError::new(kind, format!("{} is not installed", name)).with_detail("tool", name);
            let context = base.clone().with_stage("preflight");
            if let RecoveryOutcome::Fatal = self.coordinator.report_error(&error, &context, state).await {
                return Err(RunStatus::Failed { kind });
            }
        }
        self.check_interrupt("preflight", base, state).await?;

        let issues = validate_config(
            config,
            ValidationOptions {
                strict_passwords: self.settings.strict_passwords,
            },
        );
        let mut rejected = None;
        for issue in issues {
            if issue.validation.is_accepted() {
                if let Some(message) = issue.validation.message() {
                    self.logger.warn(
                        &format!("{}: {}", issue.key, message),
                        Some(json!({ "field": issue.field })),
                    );
                }
            } else if rejected.is_none() {
                rejected = Some(issue);
            }
        }
        if let Some(issue) = rejected {
            let value = match issue.key {
                "name" => config.name.as_str(),
                "db_name" => config.db_name.as_str(),
                "db_user" => config.db_user.as_str(),
                "api_port" => config.api_port.as_str(),
                "frontend_port" => config.frontend_port.as_str(),
                _ => "",
            };
            if let Err(error) = issue.validation.into_result(issue.field, value) {
                let error = error.with_detail("key", issue.key);
                return Err(self.stop(&error, base.clone().with_stage("validate"), state).await);
            }
        }
        self.check_interrupt("validate", base, state).await?;

        for port in [config.api_port_number(), config.frontend_port_number()]
            .into_iter()
            .flatten()
        {
            if !is_port_free(port).await {
                let error = DomainError::new(ErrorKind::PortInUse, format!("port {} is already in use", port))
                    .with_detail("port", port);
                let context = base.clone().with_stage("ports").with_port(port);
                return Err(self.stop(&error, context, state).await);
            }
        }
        self.check_interrupt("ports", base, state).await?;

        // A generator may hit a missing optional tool; retry without that
        // feature until it succeeds or the coordinator gives up.
        loop {
            let skipped: Vec<String> = state.skipped_features().map(String::from).collect();
            let error = match self.generator.generate(config, target, &skipped).await {
                Ok(()) => break,
                Err(e) => e,
            };
            let context = base.clone().with_stage("generate");
            match self.coordinator.report_error(&error, &context, state).await {
                RecoveryOutcome::Skipped { .. } => continue,
                outcome => return Err(stop_status(error.kind(), outcome)),
            }
        }
        self.check_interrupt("generate", base, state).await?;

        if self.options.install {
            let spinner = StepSpinner::start("Installing dependencies", self.theme, self.options.quiet);
            match install_dependencies(target, self.settings.install_timeout()).await {
                Ok(()) => spinner.finish_with_success("Dependencies installed"),
                Err(e) => {
                    spinner.finish_with_error("Dependency installation failed");
                    let context = base.clone().with_stage("install");
                    match self.coordinator.report_error(&e, &context, state).await {
                        // The project itself is complete; the user finishes the install.
                        RecoveryOutcome::Recovered { note } => notes.push(note),
                        outcome => return Err(stop_status(e.kind(), outcome)),
                    }
                }
            }
        }

        Ok(Some(requirements))
    }

    /// Reports an error from a stage that cannot be skipped.
    async fn stop(&mut self, error: &DomainError, context: ErrorContext, state: &mut RecoveryContext) -> RunStatus {
        let outcome = self.coordinator.report_error(error, &context, state).await;
        stop_status(error.kind(), outcome)
    }

    async fn check_interrupt(
        &mut self,
        stage: &str,
        base: &ErrorContext,
        state: &mut RecoveryContext,
    ) -> Result<(), RunStatus> {
        if !self.interrupt.is_interrupted() {
            return Ok(());
        }
        eprint!("{}", self.interrupt.render_notice(&self.theme, stage));
        let error = DomainError::new(ErrorKind::ProcessKilled, format!("interrupted during {}", stage));
        Err(self.stop(&error, base.clone().with_stage(stage), state).await)
    }
}

/// Status of a run whose current stage could not complete.
fn stop_status(kind: ErrorKind, outcome: RecoveryOutcome) -> RunStatus {
    match outcome {
        RecoveryOutcome::OptionsPresented { options } => RunStatus::NeedsInput { kind, options },
        RecoveryOutcome::Fatal | RecoveryOutcome::Skipped { .. } | RecoveryOutcome::Recovered { .. } => {
            RunStatus::Failed { kind }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_skeleton_writes_manifest() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("my-app");
        let mut config = ProjectConfig::with_defaults("my-app");
        config.db_password = "supersecret".into();

        SkeletonGenerator
            .generate(&config, &target, &["docker".to_string()])
            .await
            .unwrap();

        let manifest: serde_json::Value =
            serde_json::from_slice(&std::fs::read(target.join(MANIFEST_FILE)).unwrap()).unwrap();
        assert_eq!(manifest["name"], "my-app");
        assert_eq!(manifest["generator"], "stackwizard");
        assert_eq!(manifest["enabled_features"], json!(["git"]));
        assert!(!manifest.to_string().contains("supersecret"));
    }

    #[tokio::test]
    async fn test_skeleton_refuses_existing_directory() {
        let dir = TempDir::new().unwrap();
        let error = SkeletonGenerator
            .generate(&ProjectConfig::with_defaults("my-app"), dir.path(), &[])
            .await
            .unwrap_err();
        assert_eq!(error.kind(), ErrorKind::DirectoryExists);
    }

    #[test]
    fn test_only_completed_is_success() {
        let report = WorkflowReport {
            status: RunStatus::Completed,
            target: PathBuf::from("my-app"),
            skipped_features: vec![],
            notes: vec![],
            error_count: 0,
            cleanup: None,
            report_file: None,
        };
        assert!(report.is_success());

        let failed = WorkflowReport {
            status: RunStatus::Failed { kind: ErrorKind::DiskFull },
            ..report
        };
        assert!(!failed.is_success());
    }
}
