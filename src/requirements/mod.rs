//! Preflight checks for the external tools the generator relies on.
//!
//! Tools are probed one after another. A missing or outdated mandatory tool
//! fails the whole check immediately, before any later tool is probed. A
//! missing optional tool is recorded, logged as a warning, and checking
//! continues.

mod version;

pub use version::Version;

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::json;

use crate::error::{DomainError, DomainResult, ErrorKind};
use crate::logging::Logger;
use crate::process::run_with_timeout;

/// One tool the generator knows how to probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolRequirement {
    /// Name used in reports, e.g. `node`.
    pub name: &'static str,
    /// Executable to run.
    pub command: &'static str,
    /// Arguments that make it print its version.
    pub version_args: &'static [&'static str],
    /// Oldest acceptable version, if any.
    pub minimum: Option<Version>,
    /// Whether generation can proceed without it.
    pub optional: bool,
    /// Kind reported when the tool is absent.
    pub missing_kind: ErrorKind,
}

/// The tools probed before generation, in probe order.
pub fn default_requirements() -> Vec<ToolRequirement> {
    vec![
        ToolRequirement {
            name: "node",
            command: "node",
            version_args: &["--version"],
            minimum: Some(Version::new(18, 0, 0)),
            optional: false,
            missing_kind: ErrorKind::NodeNotFound,
        },
        ToolRequirement {
            name: "npm",
            command: "npm",
            version_args: &["--version"],
            minimum: Some(Version::new(9, 0, 0)),
            optional: false,
            missing_kind: ErrorKind::NpmNotFound,
        },
        ToolRequirement {
            name: "git",
            command: "git",
            version_args: &["--version"],
            minimum: None,
            optional: true,
            missing_kind: ErrorKind::GitNotFound,
        },
        ToolRequirement {
            name: "docker",
            command: "docker",
            version_args: &["--version"],
            minimum: None,
            optional: true,
            missing_kind: ErrorKind::DockerNotFound,
        },
        ToolRequirement {
            name: "python",
            command: if cfg!(windows) { "python" } else { "python3" },
            version_args: &["--version"],
            minimum: Some(Version::new(3, 8, 0)),
            optional: true,
            missing_kind: ErrorKind::PythonNotFound,
        },
        ToolRequirement {
            name: "pip",
            command: if cfg!(windows) { "pip" } else { "pip3" },
            version_args: &["--version"],
            minimum: None,
            optional: true,
            missing_kind: ErrorKind::PipNotFound,
        },
    ]
}

/// Probe result for one tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolStatus {
    pub installed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<Version>,
    /// `None` when there is no minimum or the version could not be read.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meets_minimum: Option<bool>,
    pub optional: bool,
}

/// Tool name → status, built once per run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct SystemRequirementReport {
    tools: BTreeMap<String, ToolStatus>,
}

impl SystemRequirementReport {
    pub fn get(&self, tool: &str) -> Option<&ToolStatus> {
        self.tools.get(tool)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ToolStatus)> {
        self.tools.iter().map(|(name, status)| (name.as_str(), status))
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Whether `tool` was found.
    pub fn is_installed(&self, tool: &str) -> bool {
        self.get(tool).map(|s| s.installed).unwrap_or(false)
    }

    /// Names of optional tools that are missing.
    pub fn missing_optional(&self) -> Vec<&str> {
        self.iter()
            .filter(|(_, status)| status.optional && !status.installed)
            .map(|(name, _)| name)
            .collect()
    }

    fn record(&mut self, name: &str, status: ToolStatus) {
        self.tools.insert(name.to_string(), status);
    }
}

/// Source of version strings, swappable for tests.
#[async_trait]
pub trait VersionProbe: Send + Sync {
    /// Returns the raw version output, `Ok(None)` if the tool is not
    /// installed, or an error if probing itself failed (e.g. timed out).
    async fn probe(&self, tool: &ToolRequirement, timeout: Duration) -> DomainResult<Option<String>>;
}

/// Probes tools by running them with their version arguments.
#[derive(Debug, Clone, Copy, Default)]
pub struct CommandProbe;

#[async_trait]
impl VersionProbe for CommandProbe {
    async fn probe(&self, tool: &ToolRequirement, timeout: Duration) -> DomainResult<Option<String>> {
        match run_with_timeout(tool.command, tool.version_args, None, timeout).await {
            Ok(output) if output.success() => {
                // Some tools (older Python) print their version on stderr.
                Ok(Some(format!("{}{}", output.stdout, output.stderr)))
            }
            Ok(_) => Ok(None),
            Err(e) if e.kind() == ErrorKind::ProcessSpawnFailed => Ok(None),
            Err(e) => Err(e),
        }
    }
}

/// Runs the preflight probes.
#[derive(Debug)]
pub struct SystemRequirementChecker<P = CommandProbe> {
    probe: P,
    requirements: Vec<ToolRequirement>,
    timeout: Duration,
}

impl SystemRequirementChecker<CommandProbe> {
    /// Checker for the default tool list using real commands.
    pub fn new(timeout: Duration) -> Self {
        Self::with_probe(CommandProbe, default_requirements(), timeout)
    }
}

impl<P: VersionProbe> SystemRequirementChecker<P> {
    pub fn with_probe(probe: P, requirements: Vec<ToolRequirement>, timeout: Duration) -> Self {
        Self {
            probe,
            requirements,
            timeout,
        }
    }

    pub fn requirements(&self) -> &[ToolRequirement] {
        &self.requirements
    }

    /// Probes every tool in order.
    ///
    /// # Errors
    ///
    /// Returns as soon as a mandatory tool is missing (its `missing_kind`),
    /// outdated ([`ErrorKind::DependencyVersionMismatch`]) or its probe
    /// failed. Later tools are not probed.
    pub async fn check_all(&self, logger: &Logger) -> DomainResult<SystemRequirementReport> {
        let mut report = SystemRequirementReport::default();

        for tool in &self.requirements {
            let probed = match self.probe.probe(tool, self.timeout).await {
                Ok(output) => output,
                Err(e) if tool.optional => {
                    logger.warn(
                        &format!("could not probe {}: {}", tool.name, e),
                        Some(json!({ "tool": tool.name, "kind": e.kind() })),
                    );
                    None
                }
                Err(e) => return Err(e.with_detail("tool", tool.name)),
            };

            let status = match probed {
                None => {
                    if !tool.optional {
                        return Err(DomainError::new(
                            tool.missing_kind,
                            format!("{} is required but was not found", tool.name),
                        )
                        .with_detail("tool", tool.name));
                    }
                    logger.warn(
                        &format!("{} not found; related features will be skipped", tool.name),
                        Some(json!({ "tool": tool.name })),
                    );
                    ToolStatus {
                        installed: false,
                        version: None,
                        meets_minimum: None,
                        optional: true,
                    }
                }
                Some(output) => self.evaluate(tool, &output, logger)?,
            };

            logger.debug(
                &format!("probed {}", tool.name),
                Some(json!({ "tool": tool.name, "status": &status })),
            );
            report.record(tool.name, status);
        }

        Ok(report)
    }

    fn evaluate(&self, tool: &ToolRequirement, output: &str, logger: &Logger) -> DomainResult<ToolStatus> {
        let version = Version::extract(output);
        let meets_minimum = match (version, tool.minimum) {
            (Some(found), Some(minimum)) => Some(found.meets(&minimum)),
            _ => None,
        };

        if meets_minimum == Some(false) {
            let (found, minimum) = (version.unwrap_or_default(), tool.minimum.unwrap_or_default());
            if !tool.optional {
                return Err(DomainError::new(
                    ErrorKind::DependencyVersionMismatch,
                    format!("{} {} is installed but {} or newer is required", tool.name, found, minimum),
                )
                .with_detail("tool", tool.name)
                .with_detail("found", found.to_string())
                .with_detail("required", minimum.to_string()));
            }
            logger.warn(
                &format!("{} {} is older than the recommended {}", tool.name, found, minimum),
                Some(json!({ "tool": tool.name })),
            );
        }

        if version.is_none() {
            if let (false, Some(minimum)) = (tool.optional, tool.minimum) {
                return Err(DomainError::new(
                    ErrorKind::DependencyVersionMismatch,
                    format!(
                        "could not determine the {} version; {} or newer is required",
                        tool.name, minimum
                    ),
                )
                .with_detail("tool", tool.name)
                .with_detail("required", minimum.to_string()));
            }
            logger.warn(
                &format!("could not determine the {} version", tool.name),
                Some(json!({ "tool": tool.name, "output": output.trim() })),
            );
        }

        Ok(ToolStatus {
            installed: true,
            version,
            meets_minimum,
            optional: tool.optional,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Answers from a fixed table and records which tools were asked.
    struct FakeProbe {
        answers: HashMap<&'static str, Option<&'static str>>,
        calls: Mutex<Vec<String>>,
    }

    impl FakeProbe {
        fn new(answers: &[(&'static str, Option<&'static str>)]) -> Self {
            Self {
                answers: answers.iter().copied().collect(),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl VersionProbe for FakeProbe {
        async fn probe(&self, tool: &ToolRequirement, _timeout: Duration) -> DomainResult<Option<String>> {
            self.calls.lock().unwrap().push(tool.name.to_string());
            match self.answers.get(tool.name).copied().flatten() {
                Some("TIMEOUT") => Err(DomainError::new(ErrorKind::ProcessTimeout, "timed out")),
                Some(output) => Ok(Some(output.to_string())),
                None => Ok(None),
            }
        }
    }

    const HEALTHY: &[(&str, Option<&str>)] = &[
        ("node", Some("v20.11.0")),
        ("npm", Some("10.2.4")),
        ("git", Some("git version 2.43.0")),
        ("docker", Some("Docker version 24.0.7, build afdd53b")),
        ("python", Some("Python 3.11.6")),
        ("pip", Some("pip 23.3.1 from /usr/lib/python3/dist-packages/pip (python 3.11)")),
    ];

    fn checker(answers: &[(&'static str, Option<&'static str>)]) -> SystemRequirementChecker<FakeProbe> {
        SystemRequirementChecker::with_probe(
            FakeProbe::new(answers),
            default_requirements(),
            Duration::from_secs(1),
        )
    }

    #[tokio::test]
    async fn test_all_tools_present() {
        let checker = checker(HEALTHY);
        let report = checker.check_all(&Logger::console()).await.unwrap();

        assert_eq!(report.len(), 6);
        let node = report.get("node").unwrap();
        assert!(node.installed);
        assert_eq!(node.version, Some(Version::new(20, 11, 0)));
        assert_eq!(node.meets_minimum, Some(true));
        assert!(!node.optional);
        assert!(report.missing_optional().is_empty());
    }

    #[tokio::test]
    async fn test_missing_mandatory_tool_fails_fast() {
        let checker = checker(&[("node", None), ("npm", Some("10.0.0"))]);
        let error = checker.check_all(&Logger::console()).await.unwrap_err();

        assert_eq!(error.kind(), ErrorKind::NodeNotFound);
        assert_eq!(checker.probe.calls(), ["node"]);
    }

    #[tokio::test]
    async fn test_outdated_mandatory_tool_fails_fast() {
        let checker = checker(&[("node", Some("v20.0.0")), ("npm", Some("8.19.4"))]);
        let error = checker.check_all(&Logger::console()).await.unwrap_err();

        assert_eq!(error.kind(), ErrorKind::DependencyVersionMismatch);
        assert_eq!(error.details()["found"], "8.19.4");
        assert_eq!(error.details()["required"], "9.0.0");
        assert_eq!(checker.probe.calls(), ["node", "npm"]);
    }

    #[tokio::test]
    async fn test_missing_optional_tool_degrades() {
        let answers: Vec<_> = HEALTHY
            .iter()
            .map(|&(name, output)| if name == "docker" { (name, None) } else { (name, output) })
            .collect();
        let checker = checker(&answers);
        let report = checker.check_all(&Logger::console()).await.unwrap();

        assert_eq!(checker.probe.calls().len(), 6);
        assert!(!report.is_installed("docker"));
        assert_eq!(report.missing_optional(), ["docker"]);
    }

    #[tokio::test]
    async fn test_outdated_optional_tool_is_recorded() {
        let answers: Vec<_> = HEALTHY
            .iter()
            .map(|&(name, output)| if name == "python" { (name, Some("Python 3.6.9")) } else { (name, output) })
            .collect();
        let report = checker(&answers).check_all(&Logger::console()).await.unwrap();

        let python = report.get("python").unwrap();
        assert!(python.installed);
        assert_eq!(python.meets_minimum, Some(false));
    }

    #[tokio::test]
    async fn test_unreadable_mandatory_version_fails_fast() {
        let checker = checker(&[("node", Some("node: unexpected output")), ("npm", Some("10.2.4"))]);
        let error = checker.check_all(&Logger::console()).await.unwrap_err();

        assert_eq!(error.kind(), ErrorKind::DependencyVersionMismatch);
        assert_eq!(error.details()["tool"], "node");
        assert_eq!(error.details()["required"], "18.0.0");
        assert_eq!(checker.probe.calls(), ["node"]);
    }

    #[tokio::test]
    async fn test_unreadable_optional_version_is_installed() {
        let answers: Vec<_> = HEALTHY
            .iter()
            .map(|&(name, output)| if name == "git" { (name, Some("git (custom build)")) } else { (name, output) })
            .collect();
        let report = checker(&answers).check_all(&Logger::console()).await.unwrap();

        let git = report.get("git").unwrap();
        assert!(git.installed);
        assert_eq!(git.version, None);
        assert_eq!(git.meets_minimum, None);
    }

    #[tokio::test]
    async fn test_mandatory_probe_timeout_propagates() {
        let checker = checker(&[("node", Some("TIMEOUT"))]);
        let error = checker.check_all(&Logger::console()).await.unwrap_err();
        assert_eq!(error.kind(), ErrorKind::ProcessTimeout);
        assert_eq!(error.details()["tool"], "node");
    }

    #[tokio::test]
    async fn test_optional_probe_timeout_is_not_installed() {
        let answers: Vec<_> = HEALTHY
            .iter()
            .map(|&(name, output)| if name == "git" { (name, Some("TIMEOUT")) } else { (name, output) })
            .collect();
        let report = checker(&answers).check_all(&Logger::console()).await.unwrap();
        assert!(!report.is_installed("git"));
    }

    #[test]
    fn test_report_serializes_as_map() {
        let mut report = SystemRequirementReport::default();
        report.record(
            "git",
            ToolStatus {
                installed: true,
                version: Some(Version::new(2, 43, 0)),
                meets_minimum: None,
                optional: true,
            },
        );
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["git"]["version"], "2.43.0");
        assert_eq!(json["git"]["installed"], true);
        assert!(json["git"].get("meetsMinimum").is_none());
    }
}
