//! CLI integration tests

use std::process::Command;

/// Test that the CLI shows help
#[test]
fn test_cli_help() {
    let output = Command::new("cargo")
        .args(["run", "-p", "nap-cli", "--", "--help"])
        .output()
        .expect("Failed to execute command");

    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI help should succeed");
    assert!(
        stdout.contains("Network anomaly prediction pipeline"),
        "Should show app description"
    );
    assert!(stdout.contains("collect"), "Should show collect command");
    assert!(stdout.contains("extract"), "Should show extract command");
    assert!(stdout.contains("split"), "Should show split command");
    assert!(stdout.contains("train"), "Should show train command");
}

/// Test that the CLI shows version
#[test]
fn test_cli_version() {
    let output = Command::new("cargo")
        .args(["run", "-p", "nap-cli", "--", "--version"])
        .output()
        .expect("Failed to execute command");

    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI version should succeed");
    assert!(stdout.contains("nap"), "Should show binary name");
}

/// Test collect subcommand help
#[test]
fn test_collect_help() {
    let output = Command::new("cargo")
        .args(["run", "-p", "nap-cli", "--", "collect", "--help"])
        .output()
        .expect("Failed to execute command");

    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "Collect help should succeed");
    assert!(stdout.contains("--url"), "Should show url option");
    assert!(stdout.contains("--since"), "Should show since option");
    assert!(
        stdout.contains("--exclude-host"),
        "Should show exclude-host option"
    );
}

/// Test extract subcommand help
#[test]
fn test_extract_help() {
    let output = Command::new("cargo")
        .args(["run", "-p", "nap-cli", "--", "extract", "--help"])
        .output()
        .expect("Failed to execute command");

    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "Extract help should succeed");
    assert!(
        stdout.contains("--window-minutes"),
        "Should show window option"
    );
    assert!(stdout.contains("--timezone"), "Should show timezone option");
}

/// Test split subcommand help
#[test]
fn test_split_help() {
    let output = Command::new("cargo")
        .args(["run", "-p", "nap-cli", "--", "split", "--help"])
        .output()
        .expect("Failed to execute command");

    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "Split help should succeed");
    assert!(
        stdout.contains("--test-fraction"),
        "Should show test-fraction option"
    );
    assert!(stdout.contains("--seed"), "Should show seed option");
}

/// Test train subcommand help
#[test]
fn test_train_help() {
    let output = Command::new("cargo")
        .args(["run", "-p", "nap-cli", "--", "train", "--help"])
        .output()
        .expect("Failed to execute command");

    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "Train help should succeed");
    assert!(stdout.contains("--epochs"), "Should show epochs option");
    assert!(
        stdout.contains("--learning-rate"),
        "Should show learning-rate option"
    );
}
