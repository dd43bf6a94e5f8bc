//! User-facing guidance for each [`ErrorKind`].
//!
//! The catalogue is a single exhaustive `match`, so every kind has exactly
//! one descriptor and adding a kind without guidance fails to compile.

use super::ErrorKind;

/// How the recovery layer may continue after an error of a given kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecoveryStrategy {
    /// Nothing can be done automatically; stop and clean up.
    Abort,
    /// Ask the user to pick between explicit alternatives.
    PresentOptions,
    /// Disable the feature backed by a missing optional tool and continue.
    SkipFeature,
    /// Print manual fallback instructions and continue.
    ManualInstructions,
}

/// Static guidance attached to an [`ErrorKind`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ErrorDescriptor {
    /// The kind this descriptor explains.
    pub kind: ErrorKind,
    /// One-line summary of what went wrong.
    pub message: &'static str,
    /// How the user can fix it.
    pub solution: &'static str,
    /// Whether the workflow may continue after this error.
    pub recoverable: bool,
    /// Whether the continuation needs no human decision.
    pub auto_recovery: bool,
    /// Concrete actions offered to the user.
    pub user_actions: &'static [&'static str],
}

impl ErrorDescriptor {
    /// The recovery strategy implied by this descriptor.
    pub fn strategy(&self) -> RecoveryStrategy {
        if !self.recoverable {
            return RecoveryStrategy::Abort;
        }
        if self.kind.optional_feature().is_some() {
            return RecoveryStrategy::SkipFeature;
        }
        if self.auto_recovery {
            RecoveryStrategy::ManualInstructions
        } else {
            RecoveryStrategy::PresentOptions
        }
    }
}

const fn entry(
    kind: ErrorKind,
    message: &'static str,
    solution: &'static str,
    recoverable: bool,
    auto_recovery: bool,
    user_actions: &'static [&'static str],
) -> ErrorDescriptor {
    ErrorDescriptor {
        kind,
        message,
        solution,
        recoverable,
        auto_recovery,
        user_actions,
    }
}

/// Look up the descriptor for `kind`.
pub fn describe(kind: ErrorKind) -> ErrorDescriptor {
    use ErrorKind::*;
    match kind {
        DirectoryExists => entry(
            kind,
            "The project directory already exists",
            "Choose a different project name, remove the existing directory, or overwrite it.",
            true,
            false,
            &["Rename the project", "Delete the existing directory", "Overwrite existing files"],
        ),
        FileNotFound => entry(
            kind,
            "A required file or directory was not found",
            "Check that the path exists and that you are running from the expected directory.",
            false,
            false,
            &["Verify the path", "Re-run from the project root"],
        ),
        PermissionDenied => entry(
            kind,
            "Permission denied",
            "Run the generator in a directory you own, or fix the permissions of the target path.",
            false,
            false,
            &["Check directory ownership", "Choose a writable location"],
        ),
        PathTooLong => entry(
            kind,
            "The path is too long for this platform",
            "Generate the project closer to the filesystem root or use a shorter name.",
            false,
            false,
            &["Use a shorter project name", "Move to a shallower directory"],
        ),
        DiskFull => entry(
            kind,
            "No space left on device",
            "Free some disk space and run the generator again.",
            false,
            false,
            &["Free disk space", "Generate on another volume"],
        ),
        FileWriteFailed => entry(
            kind,
            "A generated file could not be written",
            "Check that the target directory is writable and not locked by another program.",
            false,
            false,
            &["Close programs holding the directory open", "Check permissions"],
        ),
        TemplateNotFound => entry(
            kind,
            "A project template is missing",
            "Reinstall the generator; the bundled templates appear to be incomplete.",
            false,
            false,
            &["Reinstall stackwizard"],
        ),
        NodeNotFound => entry(
            kind,
            "Node.js is not installed",
            "Install Node.js 18 or newer from https://nodejs.org and re-run the generator.",
            false,
            false,
            &["Install Node.js 18+", "Check that `node` is on your PATH"],
        ),
        NpmNotFound => entry(
            kind,
            "npm is not installed",
            "npm ships with Node.js; reinstall Node.js or install npm 9 or newer.",
            false,
            false,
            &["Reinstall Node.js", "Check that `npm` is on your PATH"],
        ),
        GitNotFound => entry(
            kind,
            "git is not installed",
            "Install git to have the project initialised as a repository.",
            true,
            true,
            &["Install git", "Run `git init` manually later"],
        ),
        DockerNotFound => entry(
            kind,
            "Docker is not installed",
            "Install Docker to use the generated docker-compose setup.",
            true,
            true,
            &["Install Docker Desktop or Docker Engine", "Run the services locally instead"],
        ),
        PythonNotFound => entry(
            kind,
            "Python is not installed",
            "Install Python 3.8 or newer to run the backend outside Docker.",
            true,
            true,
            &["Install Python 3.8+", "Run the backend in Docker"],
        ),
        PipNotFound => entry(
            kind,
            "pip is not installed",
            "Install pip to set up the backend virtual environment.",
            true,
            true,
            &["Install pip", "Run `python3 -m ensurepip`"],
        ),
        DependencyVersionMismatch => entry(
            kind,
            "An installed tool is older than required",
            "Upgrade the tool to at least the required version and re-run the generator.",
            false,
            false,
            &["Upgrade the tool", "Use a version manager such as nvm"],
        ),
        DependencyInstallFailed => entry(
            kind,
            "Installing project dependencies failed",
            "Run the install command manually inside the generated project.",
            true,
            true,
            &["cd into the project and run `npm install`", "Check your registry configuration"],
        ),
        NetworkTimeout => entry(
            kind,
            "A network request timed out",
            "Check your connection and run the install step manually once it is stable.",
            true,
            true,
            &["Check your internet connection", "Retry later"],
        ),
        DnsResolutionFailed => entry(
            kind,
            "A host name could not be resolved",
            "Check your DNS settings or proxy configuration.",
            true,
            true,
            &["Check DNS / proxy settings", "Retry later"],
        ),
        NetworkUnavailable => entry(
            kind,
            "The network is unavailable",
            "Connect to the internet, then install dependencies manually.",
            true,
            true,
            &["Check your internet connection"],
        ),
        PackageDownloadFailed => entry(
            kind,
            "A package could not be downloaded",
            "Retry the install manually; the registry may be temporarily unavailable.",
            true,
            true,
            &["Run `npm install` manually", "Check the registry status"],
        ),
        InvalidProjectName => entry(
            kind,
            "The project name is invalid",
            "Use lowercase letters, digits and single hyphens, at most 50 characters.",
            true,
            false,
            &["Enter a different project name"],
        ),
        InvalidPort => entry(
            kind,
            "The port number is invalid",
            "Use a port between 1 and 65535, preferably above 1024.",
            true,
            false,
            &["Enter a different port"],
        ),
        InvalidDatabaseName => entry(
            kind,
            "The database name is invalid",
            "Use lowercase letters, digits and underscores, not starting or ending with `_`.",
            true,
            false,
            &["Enter a different database name"],
        ),
        InvalidCredentials => entry(
            kind,
            "The database credentials are invalid",
            "Use an alphanumeric user name and a password of at least 8 characters.",
            true,
            false,
            &["Enter different credentials"],
        ),
        PortInUse => entry(
            kind,
            "The port is already in use",
            "Stop the process using the port or pick another one.",
            true,
            false,
            &["Choose another port", "Stop the process using the port"],
        ),
        OutOfMemory => entry(
            kind,
            "The system ran out of memory",
            "Close other applications and try again.",
            false,
            false,
            &["Close memory-heavy applications"],
        ),
        CpuExhausted => entry(
            kind,
            "The system is too busy to complete the operation",
            "Wait for other workloads to finish and try again.",
            false,
            false,
            &["Retry when the system is idle"],
        ),
        TooManyOpenFiles => entry(
            kind,
            "Too many open files",
            "Raise the open file limit (for example `ulimit -n 4096`) and try again.",
            false,
            false,
            &["Raise the file descriptor limit"],
        ),
        ProcessSpawnFailed => entry(
            kind,
            "An external command could not be started",
            "Check that the command is installed and executable.",
            false,
            false,
            &["Verify the command is on your PATH"],
        ),
        ProcessExitedNonZero => entry(
            kind,
            "An external command failed",
            "Re-run the command manually to see its full output.",
            false,
            false,
            &["Run the failing command manually"],
        ),
        ProcessKilled => entry(
            kind,
            "The operation was interrupted",
            "Run the generator again; partial output has been cleaned up.",
            false,
            false,
            &["Re-run the generator"],
        ),
        ProcessTimeout => entry(
            kind,
            "An external command took too long",
            "Retry, or run the command manually if it needs more time.",
            true,
            false,
            &["Retry the step", "Run the command manually"],
        ),
        Unknown => entry(
            kind,
            "An unexpected error occurred",
            "Re-run with --debug and include the log file when reporting the issue.",
            false,
            false,
            &["Re-run with --debug", "Report the issue with the log file"],
        ),
    }
}

/// Look up a descriptor by its code, falling back to [`ErrorKind::Unknown`].
pub fn describe_code(code: &str) -> ErrorDescriptor {
    describe(ErrorKind::from_code(code).unwrap_or(ErrorKind::Unknown))
}
