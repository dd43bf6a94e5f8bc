//! Running external commands with a hard time budget.
//!
//! Every child process the generator starts goes through
//! [`run_with_timeout`]. When the budget runs out the child is killed and the
//! call fails with a process-timeout [`DomainError`]; nothing waits forever.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;

use crate::error::{classify_exit_status, classify_message, DomainError, DomainResult, ErrorKind};

/// Captured result of a finished command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code; `None` when the process was terminated by a signal.
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    /// Whether the command exited with status 0.
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// Turns a failed exit into a [`DomainError`].
    ///
    /// The error kind comes from the exit status, refined by the stderr text
    /// when the status alone says nothing more than "non-zero".
    pub fn into_checked(self, program: &str) -> DomainResult<CommandOutput> {
        let Some(kind) = classify_exit_status(self.code) else {
            return Ok(self);
        };
        let kind = match kind {
            ErrorKind::ProcessExitedNonZero => classify_message(&self.stderr).unwrap_or(kind),
            other => other,
        };
        let mut error = DomainError::new(kind, format!("`{}` failed", program))
            .with_detail("command", program)
            .with_detail("stderr", tail(&self.stderr, 20));
        if let Some(code) = self.code {
            error = error.with_detail("exit_code", code);
        }
        Err(error)
    }
}

/// Last `lines` lines of `text`.
fn tail(text: &str, lines: usize) -> String {
    let all: Vec<&str> = text.lines().collect();
    all[all.len().saturating_sub(lines)..].join("\n")
}

/// Runs `program` with `args`, killing it if it outlives `timeout`.
///
/// # Errors
///
/// * [`ErrorKind::ProcessSpawnFailed`] if the program cannot be started; the
///   `reason` detail is `not_found` when it is not on the `PATH`.
/// * [`ErrorKind::ProcessTimeout`] if the time budget is exceeded.
///
/// A non-zero exit is *not* an error here; see [`CommandOutput::into_checked`].
pub async fn run_with_timeout(
    program: &str,
    args: &[&str],
    cwd: Option<&Path>,
    timeout: Duration,
) -> DomainResult<CommandOutput> {
    let mut command = Command::new(program);
    command
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    if let Some(dir) = cwd {
        command.current_dir(dir);
    }

    let child = command.spawn().map_err(|e| {
        let reason = if e.kind() == std::io::ErrorKind::NotFound {
            "not_found"
        } else {
            "spawn_error"
        };
        DomainError::new(
            ErrorKind::ProcessSpawnFailed,
            format!("could not start `{}`: {}", program, e),
        )
        .with_detail("command", program)
        .with_detail("reason", reason)
    })?;

    // Dropping the future on timeout drops the child, which kills it.
    match tokio::time::timeout(timeout, child.wait_with_output()).await {
        Ok(Ok(output)) => Ok(CommandOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        }),
        Ok(Err(e)) => Err(DomainError::new(
            ErrorKind::ProcessExitedNonZero,
            format!("waiting for `{}` failed: {}", program, e),
        )
        .with_detail("command", program)),
        Err(_) => Err(DomainError::new(
            ErrorKind::ProcessTimeout,
            format!("`{}` did not finish within {}s", program, timeout.as_secs()),
        )
        .with_detail("command", program)
        .with_detail("timeout_secs", timeout.as_secs())),
    }
}

/// Runs `npm install` in `dir`.
pub async fn install_dependencies(dir: &Path, timeout: Duration) -> DomainResult<()> {
    run_with_timeout("npm", &["install", "--no-audit", "--no-fund"], Some(dir), timeout)
        .await?
        .into_checked("npm install")
        .map(|_| ())
}
