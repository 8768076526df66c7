//! CLI integration tests

use std::process::Command;

fn run_cli(args: &[&str]) -> std::process::Output {
    Command::new("cargo")
        .args(["run", "-q", "-p", "anomaly-cli", "--"])
        .args(args)
        .output()
        .expect("Failed to execute command")
}

/// Test that the CLI shows help
#[test]
fn test_cli_help() {
    let output = run_cli(&["--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI help should succeed");
    assert!(
        stdout.contains("Workload Anomaly Agent"),
        "Should show app name"
    );
    assert!(stdout.contains("get"), "Should show get command");
    assert!(stdout.contains("score"), "Should show score command");
    assert!(stdout.contains("--api-url"), "Should show api-url option");
}

/// Test that the CLI shows version
#[test]
fn test_cli_version() {
    let output = run_cli(&["--version"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI version should succeed");
    assert!(stdout.contains("anomalyctl"), "Should show binary name");
}

/// Test get anomalies subcommand help
#[test]
fn test_get_anomalies_help() {
    let output = run_cli(&["get", "anomalies", "--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "Get anomalies help should succeed");
    assert!(
        stdout.contains("--namespace"),
        "Should show namespace option"
    );
}

/// Test score subcommand help
#[test]
fn test_score_help() {
    let output = run_cli(&["score", "--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "Score help should succeed");
    assert!(stdout.contains("--snapshot"), "Should show snapshot flag");
    assert!(stdout.contains("--predict"), "Should show predict flag");
    assert!(stdout.contains("--cpu"), "Should show cpu option");
    assert!(stdout.contains("--memory"), "Should show memory option");
    assert!(
        stdout.contains("--model-address"),
        "Should show model-address option"
    );
}

/// Test that score without a mode fails
#[test]
fn test_score_without_mode_fails() {
    let output = run_cli(&["score", "--cpu", "1", "--memory", "1"]);
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(!output.status.success(), "Score without a mode should fail");
    assert!(
        stderr.contains("no scorer mode selected"),
        "Should explain the missing mode"
    );
}

/// Test that an invalid output format is rejected
#[test]
fn test_invalid_format_rejected() {
    let output = run_cli(&["--format", "yaml", "get", "anomalies"]);

    assert!(!output.status.success(), "Unknown format should fail");
}
