//! CLI integration tests for bubble-pg-migrate.
//!
//! These tests verify command-line argument parsing, help output,
//! and exit codes for various error conditions.

use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;

/// Get a command for the bubble-pg-migrate binary.
fn cmd() -> Command {
    Command::cargo_bin("bubble-pg-migrate").unwrap()
}

// =============================================================================
// Help and Version Tests
// =============================================================================

#[test]
fn test_help_shows_all_commands() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("link"))
        .stdout(predicate::str::contains("count"))
        .stdout(predicate::str::contains("health-check"))
        .stdout(predicate::str::contains("reset"));
}

#[test]
fn test_run_subcommand_help() {
    cmd()
        .args(["run", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--dry-run"))
        .stdout(predicate::str::contains("--entity"))
        .stdout(predicate::str::contains("--batch-size"))
        .stdout(predicate::str::contains("--strict"));
}

#[test]
fn test_count_subcommand_help() {
    cmd()
        .args(["count", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--entity"));
}

#[test]
fn test_version_flag() {
    cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("bubble-pg-migrate"));
}

// =============================================================================
// Global Flags Tests
// =============================================================================

#[test]
fn test_output_json_flag_exists() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--output-json"));
}

#[test]
fn test_log_format_flag_exists() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--log-format"))
        .stdout(predicate::str::contains("[default: text]"));
}

#[test]
fn test_verbosity_flag_exists() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--verbosity"))
        .stdout(predicate::str::contains("[default: info]"));
}

// =============================================================================
// Exit Code Tests
// =============================================================================

#[test]
fn test_missing_config_exits_with_code_7() {
    // Missing file is an IO error (code 7), not config error (code 1)
    cmd()
        .args(["--config", "nonexistent_config_file.yaml", "health-check"])
        .assert()
        .code(7);
}

#[test]
fn test_invalid_yaml_exits_with_code_5() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "invalid: yaml: content: [").unwrap();

    cmd()
        .args(["--config", file.path().to_str().unwrap(), "health-check"])
        .assert()
        .code(5);
}

#[test]
fn test_missing_required_fields_exits_with_code_5() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    // Valid YAML but missing required config fields
    writeln!(file, "source:").unwrap();
    writeln!(file, "  base_url: https://app.example.com/api/1.1").unwrap();

    cmd()
        .args(["--config", file.path().to_str().unwrap(), "health-check"])
        .assert()
        .code(5);
}

#[test]
fn test_invalid_field_value_exits_with_code_1() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    // Structurally complete but fails validation (non-http base_url)
    writeln!(file, "source:").unwrap();
    writeln!(file, "  base_url: ftp://app.example.com/api/1.1").unwrap();
    writeln!(file, "  token: secret").unwrap();
    writeln!(file, "target:").unwrap();
    writeln!(file, "  host: localhost").unwrap();
    writeln!(file, "  database: compliance").unwrap();
    writeln!(file, "  user: migrator").unwrap();
    writeln!(file, "  password: pw").unwrap();

    cmd()
        .args(["--config", file.path().to_str().unwrap(), "health-check"])
        .assert()
        .code(1);
}

#[test]
fn test_unknown_entity_exits_with_code_1() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "source:").unwrap();
    writeln!(file, "  base_url: https://app.example.com/api/1.1").unwrap();
    writeln!(file, "  token: secret").unwrap();
    writeln!(file, "target:").unwrap();
    writeln!(file, "  host: localhost").unwrap();
    writeln!(file, "  database: compliance").unwrap();
    writeln!(file, "  user: migrator").unwrap();
    writeln!(file, "  password: pw").unwrap();

    // Entity name is rejected before any connection is attempted
    cmd()
        .args([
            "--config",
            file.path().to_str().unwrap(),
            "reset",
            "widget",
        ])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Unknown entity type"));
}

// =============================================================================
// Subcommand Existence Tests
// =============================================================================

#[test]
fn test_health_check_command_exists() {
    cmd()
        .args(["health-check", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("connections"));
}

#[test]
fn test_link_command_exists() {
    cmd()
        .args(["link", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("foreign keys"));
}

#[test]
fn test_reset_requires_entity_argument() {
    cmd()
        .arg("reset")
        .assert()
        .failure()
        .stderr(predicate::str::contains("ENTITY"));
}

// =============================================================================
// Config Path Tests
// =============================================================================

#[test]
fn test_config_default_path() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("[default: config.yaml]"));
}

#[test]
fn test_short_config_flag() {
    // -c should work as short for --config
    cmd()
        .args(["-c", "some_config.yaml", "--help"])
        .assert()
        .success();
}

// =============================================================================
// No Subcommand Tests
// =============================================================================

#[test]
fn test_no_subcommand_shows_help() {
    cmd()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage:"));
}
