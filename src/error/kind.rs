//! The closed taxonomy of failures the generator can run into.
//!
//! Every failure that reaches the recovery layer is reduced to one
//! [`ErrorKind`]. Kinds are grouped into families which drive the default
//! recovery policy; the per-kind guidance lives in [`super::descriptor`].

use serde::{Deserialize, Serialize};

/// The family an [`ErrorKind`] belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorFamily {
    /// Files and directories on the local disk.
    Filesystem,
    /// Required or optional external tools.
    Dependency,
    /// Connectivity, DNS and package registry access.
    Network,
    /// User-supplied configuration values.
    Validation,
    /// Memory, CPU and descriptor exhaustion.
    SystemResource,
    /// Child process lifecycle.
    Process,
    /// Anything that could not be classified.
    Unknown,
}

/// A closed category of failure used for diagnostics and recovery dispatch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    // Filesystem
    /// The target project directory already exists.
    DirectoryExists,
    /// A file or directory the generator needs is missing.
    FileNotFound,
    /// The current user may not read or write the path.
    PermissionDenied,
    /// A path exceeds the platform limit.
    PathTooLong,
    /// No space left on the device.
    DiskFull,
    /// Writing a generated file failed for another reason.
    FileWriteFailed,
    /// A bundled template could not be located.
    TemplateNotFound,

    // Dependency
    /// Node.js is not installed.
    NodeNotFound,
    /// npm is not installed.
    NpmNotFound,
    /// git is not installed (optional).
    GitNotFound,
    /// Docker is not installed (optional).
    DockerNotFound,
    /// Python is not installed (optional).
    PythonNotFound,
    /// pip is not installed (optional).
    PipNotFound,
    /// A tool is installed but older than the declared minimum.
    DependencyVersionMismatch,
    /// Installing project dependencies failed.
    DependencyInstallFailed,

    // Network
    /// A network request timed out.
    NetworkTimeout,
    /// A host name could not be resolved.
    DnsResolutionFailed,
    /// The network is unreachable or the connection was refused.
    NetworkUnavailable,
    /// A package could not be downloaded from its registry.
    PackageDownloadFailed,

    // Validation
    /// The project name violates the naming rules.
    InvalidProjectName,
    /// A port number is outside the valid range.
    InvalidPort,
    /// The database name violates the naming rules.
    InvalidDatabaseName,
    /// Database user or password were rejected.
    InvalidCredentials,
    /// A requested port is already bound by another process.
    PortInUse,

    // System resource
    /// The process ran out of memory.
    OutOfMemory,
    /// The machine is too busy to finish in time.
    CpuExhausted,
    /// The process hit the open file descriptor limit.
    TooManyOpenFiles,

    // Process
    /// A child process could not be started.
    ProcessSpawnFailed,
    /// A child process exited with a non-zero status.
    ProcessExitedNonZero,
    /// A child process (or the generator itself) was terminated by a signal.
    ProcessKilled,
    /// A child process exceeded its time budget.
    ProcessTimeout,

    /// Fallback for failures nothing else matched.
    Unknown,
}

impl ErrorKind {
    /// Every kind, in declaration order.
    pub const ALL: [ErrorKind; 32] = [
        ErrorKind::DirectoryExists,
        ErrorKind::FileNotFound,
        ErrorKind::PermissionDenied,
        ErrorKind::PathTooLong,
        ErrorKind::DiskFull,
        ErrorKind::FileWriteFailed,
        ErrorKind::TemplateNotFound,
        ErrorKind::NodeNotFound,
        ErrorKind::NpmNotFound,
        ErrorKind::GitNotFound,
        ErrorKind::DockerNotFound,
        ErrorKind::PythonNotFound,
        ErrorKind::PipNotFound,
        ErrorKind::DependencyVersionMismatch,
        ErrorKind::DependencyInstallFailed,
        ErrorKind::NetworkTimeout,
        ErrorKind::DnsResolutionFailed,
        ErrorKind::NetworkUnavailable,
        ErrorKind::PackageDownloadFailed,
        ErrorKind::InvalidProjectName,
        ErrorKind::InvalidPort,
        ErrorKind::InvalidDatabaseName,
        ErrorKind::InvalidCredentials,
        ErrorKind::PortInUse,
        ErrorKind::OutOfMemory,
        ErrorKind::CpuExhausted,
        ErrorKind::TooManyOpenFiles,
        ErrorKind::ProcessSpawnFailed,
        ErrorKind::ProcessExitedNonZero,
        ErrorKind::ProcessKilled,
        ErrorKind::ProcessTimeout,
        ErrorKind::Unknown,
    ];

    /// The family this kind belongs to.
    pub fn family(self) -> ErrorFamily {
        use ErrorKind::*;
        match self {
            DirectoryExists | FileNotFound | PermissionDenied | PathTooLong | DiskFull
            | FileWriteFailed | TemplateNotFound => ErrorFamily::Filesystem,
            NodeNotFound | NpmNotFound | GitNotFound | DockerNotFound | PythonNotFound
            | PipNotFound | DependencyVersionMismatch | DependencyInstallFailed => {
                ErrorFamily::Dependency
            }
            NetworkTimeout | DnsResolutionFailed | NetworkUnavailable | PackageDownloadFailed => {
                ErrorFamily::Network
            }
            InvalidProjectName | InvalidPort | InvalidDatabaseName | InvalidCredentials
            | PortInUse => ErrorFamily::Validation,
            OutOfMemory | CpuExhausted | TooManyOpenFiles => ErrorFamily::SystemResource,
            ProcessSpawnFailed | ProcessExitedNonZero | ProcessKilled | ProcessTimeout => {
                ErrorFamily::Process
            }
            Unknown => ErrorFamily::Unknown,
        }
    }

    /// The optional feature that is disabled when this tool is missing.
    ///
    /// Returns `None` for every kind that does not describe an optional tool.
    pub fn optional_feature(self) -> Option<&'static str> {
        match self {
            ErrorKind::GitNotFound => Some("git"),
            ErrorKind::DockerNotFound => Some("docker"),
            ErrorKind::PythonNotFound => Some("python"),
            ErrorKind::PipNotFound => Some("pip"),
            _ => None,
        }
    }

    /// Stable snake_case code, as written to log files and reports.
    pub fn as_str(self) -> &'static str {
        use ErrorKind::*;
        match self {
            DirectoryExists => "directory_exists",
            FileNotFound => "file_not_found",
            PermissionDenied => "permission_denied",
            PathTooLong => "path_too_long",
            DiskFull => "disk_full",
            FileWriteFailed => "file_write_failed",
            TemplateNotFound => "template_not_found",
            NodeNotFound => "node_not_found",
            NpmNotFound => "npm_not_found",
            GitNotFound => "git_not_found",
            DockerNotFound => "docker_not_found",
            PythonNotFound => "python_not_found",
            PipNotFound => "pip_not_found",
            DependencyVersionMismatch => "dependency_version_mismatch",
            DependencyInstallFailed => "dependency_install_failed",
            NetworkTimeout => "network_timeout",
            DnsResolutionFailed => "dns_resolution_failed",
            NetworkUnavailable => "network_unavailable",
            PackageDownloadFailed => "package_download_failed",
            InvalidProjectName => "invalid_project_name",
            InvalidPort => "invalid_port",
            InvalidDatabaseName => "invalid_database_name",
            InvalidCredentials => "invalid_credentials",
            PortInUse => "port_in_use",
            OutOfMemory => "out_of_memory",
            CpuExhausted => "cpu_exhausted",
            TooManyOpenFiles => "too_many_open_files",
            ProcessSpawnFailed => "process_spawn_failed",
            ProcessExitedNonZero => "process_exited_non_zero",
            ProcessKilled => "process_killed",
            ProcessTimeout => "process_timeout",
            Unknown => "unknown",
        }
    }

    /// Parse a code produced by [`ErrorKind::as_str`].
    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|kind| kind.as_str() == code)
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_all_kinds_are_distinct() {
        let unique: HashSet<_> = ErrorKind::ALL.iter().collect();
        assert_eq!(unique.len(), ErrorKind::ALL.len());
    }

    #[test]
    fn test_code_roundtrip_for_every_kind() {
        for kind in ErrorKind::ALL {
            assert_eq!(ErrorKind::from_code(kind.as_str()), Some(kind));
        }
    }

    #[test]
    fn test_unknown_code() {
        assert_eq!(ErrorKind::from_code("no_such_kind"), None);
    }

    #[test]
    fn test_serde_uses_code() {
        let json = serde_json::to_string(&ErrorKind::DirectoryExists).unwrap();
        assert_eq!(json, "\"directory_exists\"");
    }

    #[test]
    fn test_families() {
        assert_eq!(ErrorKind::DiskFull.family(), ErrorFamily::Filesystem);
        assert_eq!(ErrorKind::DockerNotFound.family(), ErrorFamily::Dependency);
        assert_eq!(ErrorKind::DnsResolutionFailed.family(), ErrorFamily::Network);
        assert_eq!(ErrorKind::PortInUse.family(), ErrorFamily::Validation);
        assert_eq!(ErrorKind::OutOfMemory.family(), ErrorFamily::SystemResource);
        assert_eq!(ErrorKind::ProcessKilled.family(), ErrorFamily::Process);
        assert_eq!(ErrorKind::Unknown.family(), ErrorFamily::Unknown);
    }

    #[test]
    fn test_optional_features() {
        assert_eq!(ErrorKind::GitNotFound.optional_feature(), Some("git"));
        assert_eq!(ErrorKind::DockerNotFound.optional_feature(), Some("docker"));
        assert_eq!(ErrorKind::NodeNotFound.optional_feature(), None);
    }
}
