//! CLI argument parsing tests for Parlance

mod common;

use assert_cmd::Command;
use predicates::prelude::*;

fn parlance() -> Command {
    Command::new(env!("CARGO_BIN_EXE_parlance"))
}

#[test]
fn test_help_flag() {
    parlance()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("conversational agent"))
        .stdout(predicate::str::contains("chat"))
        .stdout(predicate::str::contains("serve"))
        .stdout(predicate::str::contains("--version"));
}

#[test]
fn test_version_flag() {
    parlance()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_no_args_shows_usage() {
    parlance()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn test_unknown_subcommand() {
    parlance()
        .arg("engage")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unrecognized subcommand"));
}

// ============================================================================
// Subcommand help
// ============================================================================

#[test]
fn test_init_help() {
    parlance()
        .args(["init", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Initialize"));
}

#[test]
fn test_chat_help() {
    parlance()
        .args(["chat", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Chat with the agent"))
        .stdout(predicate::str::contains("-m, --message"))
        .stdout(predicate::str::contains("-s, --session"))
        .stdout(predicate::str::contains("-v, --verbose"));
}

#[test]
fn test_serve_help() {
    parlance()
        .args(["serve", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("HTTP gateway"))
        .stdout(predicate::str::contains("--host"))
        .stdout(predicate::str::contains("-p, --port"));
}

#[test]
fn test_serve_rejects_bad_port() {
    parlance()
        .args(["serve", "--port", "not-a-port"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid value"));
}

#[test]
fn test_status_and_tools_help() {
    parlance()
        .args(["status", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("status"));
    parlance()
        .args(["tools", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("tools"));
}
