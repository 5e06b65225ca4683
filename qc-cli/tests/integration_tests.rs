//! Integration tests for the qc-cli argument surface: every subcommand
//! should parse into the arguments an operator actually typed, without
//! needing a live database connection.

use assert_cmd::Command;

#[test]
fn help_lists_every_operator_subcommand() {
    let mut cmd = Command::cargo_bin("qc-cli").unwrap();
    cmd.arg("--help");
    let output = cmd.output().unwrap();
    let stdout = String::from_utf8_lossy(&output.stdout);

    for subcommand in [
        "schemas-list",
        "schemas-history",
        "migrate",
        "migrate-all",
        "migrate-store",
        "locks-list",
        "locks-release",
        "locks-cleanup",
        "connections-stats",
        "connections-close",
        "detect-drift",
    ] {
        assert!(stdout.contains(subcommand), "--help output missing subcommand {subcommand}");
    }
}

#[test]
fn missing_required_argument_is_rejected_before_any_database_connection() {
    let mut cmd = Command::cargo_bin("qc-cli").unwrap();
    cmd.arg("migrate"); // table_name and database_type are required positionals
    cmd.assert().failure();
}

#[test]
fn unknown_subcommand_is_rejected() {
    let mut cmd = Command::cargo_bin("qc-cli").unwrap();
    cmd.arg("not-a-real-command");
    cmd.assert().failure();
}
