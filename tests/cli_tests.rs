//! CLI integration tests for the stackwizard binary
//!
//! These tests verify that the CLI commands work correctly by running
//! the actual compiled binary.

use assert_cmd::Command;
use predicates::prelude::*;

/// Get a Command instance for the stackwizard binary
#[allow(deprecated)]
fn stackwizard_cmd() -> Command {
    let mut cmd = Command::cargo_bin("stackwizard").expect("Failed to find stackwizard binary");
    cmd.env("NO_COLOR", "1");
    cmd
}

// ============================================================================
// --version / --help
// ============================================================================

#[test]
fn test_version_flag() {
    stackwizard_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_help_lists_commands() {
    stackwizard_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("new"))
        .stdout(predicate::str::contains("doctor"))
        .stdout(predicate::str::contains("validate"))
        .stdout(predicate::str::contains("cleanup"));
}

// ============================================================================
// validate command tests
// ============================================================================

#[test]
fn test_validate_accepts_project_name() {
    stackwizard_cmd()
        .args(["validate", "project-name", "my-app"])
        .assert()
        .success()
        .stdout(predicate::str::contains("valid"));
}

#[test]
fn test_validate_rejects_leading_hyphen() {
    stackwizard_cmd()
        .args(["validate", "project-name", "--", "-bad"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("cannot start or end with a hyphen"));
}

#[test]
fn test_validate_rejects_surrounding_whitespace() {
    stackwizard_cmd()
        .args(["validate", "project-name", " my-app"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("lowercase letters, numbers and hyphens"));
}

#[test]
fn test_validate_rejects_reserved_name() {
    stackwizard_cmd()
        .args(["validate", "project-name", "node_modules"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("reserved"));
}

#[test]
fn test_validate_rejects_out_of_range_port() {
    stackwizard_cmd()
        .args(["validate", "port", "70000"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("between 1 and 65535"));
}

#[test]
fn test_validate_well_known_port_warns_but_passes() {
    stackwizard_cmd()
        .args(["validate", "port", "443"])
        .assert()
        .success()
        .stdout(predicate::str::contains("HTTPS"));
}

#[test]
fn test_validate_short_password_rejected_by_default() {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    stackwizard_cmd()
        .current_dir(temp_dir.path())
        .args(["validate", "db-password", "short"])
        .assert()
        .code(1);
}

#[test]
fn test_validate_short_password_warns_when_lenient() {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    std::fs::write(temp_dir.path().join("stackwizard.toml"), "strict_passwords = false\n")
        .expect("Failed to write settings");
    stackwizard_cmd()
        .current_dir(temp_dir.path())
        .args(["validate", "db-password", "short"])
        .assert()
        .success()
        .stdout(predicate::str::contains("at least 8 characters"));
}

#[test]
fn test_validate_unknown_field_fails() {
    stackwizard_cmd()
        .args(["validate", "colour", "blue"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown field"));
}

// ============================================================================
// port / cleanup command tests
// ============================================================================

#[test]
fn test_port_in_use_fails() {
    let listener = std::net::TcpListener::bind(("0.0.0.0", 0)).expect("Failed to bind");
    let port = listener.local_addr().unwrap().port().to_string();
    stackwizard_cmd()
        .args(["port", &port])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("in use"));
}

#[test]
fn test_cleanup_removes_directory() {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let target = temp_dir.path().join("my-app");
    std::fs::create_dir_all(target.join("src")).unwrap();
    std::fs::write(target.join("src/main.py"), "print('hi')").unwrap();

    stackwizard_cmd()
        .arg("cleanup")
        .arg(&target)
        .assert()
        .success()
        .stdout(predicate::str::contains("Removed"));
    assert!(!target.exists());
}

#[test]
fn test_cleanup_missing_path_is_noop() {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    stackwizard_cmd()
        .arg("cleanup")
        .arg(temp_dir.path().join("absent"))
        .assert()
        .success()
        .stdout(predicate::str::contains("Nothing to remove"));
}

// ============================================================================
// Settings and invalid input
// ============================================================================

#[test]
fn test_missing_explicit_settings_file_fails() {
    stackwizard_cmd()
        .args(["--config", "does-not-exist.toml", "validate", "port", "8000"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("settings file not found"));
}

#[test]
fn test_debug_mode_writes_log_file() {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let logs = temp_dir.path().join("logs");
    stackwizard_cmd()
        .current_dir(temp_dir.path())
        .env("STACKWIZARD__LOG_DIR", &logs)
        .args(["--debug", "validate", "port", "8000"])
        .assert()
        .success()
        .stderr(predicate::str::contains("Debug log:"));

    let files: Vec<_> = std::fs::read_dir(&logs).unwrap().collect();
    assert_eq!(files.len(), 1);
}

#[test]
fn test_invalid_command_fails() {
    stackwizard_cmd()
        .arg("nonexistent")
        .assert()
        .failure()
        .stderr(predicate::str::contains("error"));
}
