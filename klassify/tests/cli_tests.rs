//! CLI integration tests for klassify.
//!
//! These tests cover help output and the exit codes of runs that fail before
//! a connection is attempted. Each command runs in an empty temporary directory
//! with the `KLASSIFY_*` variables removed, so no `.env` or ambient setting leaks in.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const SETTINGS: [&str; 6] = [
    "KLASSIFY_OUT",
    "KLASSIFY_USER",
    "KLASSIFY_PASSWORD",
    "KLASSIFY_SERVER",
    "KLASSIFY_DATABASE",
    "KLASSIFY_TIMEOUT",
];

/// Get a command for the klassify binary, isolated in `dir`.
fn cmd(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("klassify").unwrap();
    cmd.current_dir(dir.path()).env_remove("RUST_LOG");
    for name in SETTINGS {
        cmd.env_remove(name);
    }
    cmd
}

#[test]
fn test_help_lists_flags_and_env_file_note() {
    let dir = TempDir::new().unwrap();
    cmd(&dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--out"))
        .stdout(predicate::str::contains("--user"))
        .stdout(predicate::str::contains("--password"))
        .stdout(predicate::str::contains("--server"))
        .stdout(predicate::str::contains("--database"))
        .stdout(predicate::str::contains("--timeout"))
        .stdout(predicate::str::contains(".env file"));
}

#[test]
fn test_short_help_flag() {
    let dir = TempDir::new().unwrap();
    cmd(&dir).arg("-h").assert().success();
}

#[test]
fn test_version_flag() {
    let dir = TempDir::new().unwrap();
    cmd(&dir)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("klassify"));
}

#[test]
fn test_missing_database_fails() {
    let dir = TempDir::new().unwrap();
    cmd(&dir)
        .args(["--server", "127.0.0.1,1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("database"));
}

#[test]
fn test_invalid_timeout_env_fails() {
    let dir = TempDir::new().unwrap();
    cmd(&dir)
        .env("KLASSIFY_DATABASE", "Sales")
        .env("KLASSIFY_TIMEOUT", "soon")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Configuration error"));
}

#[test]
fn test_database_from_env_file_is_used() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join(".env"),
        "KLASSIFY_DATABASE=Sales\nKLASSIFY_SERVER=tcp:localhost,notaport\n",
    )
    .unwrap();

    // The database requirement is satisfied by the file; the run then fails on
    // the server's port, before any connection is attempted.
    cmd(&dir)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid port"));
}

#[test]
fn test_negative_timeout_flag_rejected() {
    let dir = TempDir::new().unwrap();
    cmd(&dir)
        .args(["--database", "Sales", "--timeout", "-3"])
        .assert()
        .failure();
}

#[test]
fn test_non_numeric_timeout_flag_rejected() {
    let dir = TempDir::new().unwrap();
    cmd(&dir)
        .args(["--database", "Sales", "--timeout", "soon"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--timeout"));
}
