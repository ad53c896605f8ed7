//! CLI integration tests

use std::process::{Command, Output};

fn dpx(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_dpx"))
        .args(args)
        .env("NO_COLOR", "1")
        // Nothing listens here; offline commands must not need it
        .env("DPX_API_URL", "http://127.0.0.1:9")
        .output()
        .expect("Failed to execute command")
}

const PIMA_FIRST_RECORD: &[&str] = &[
    "--pregnancies",
    "6",
    "--glucose",
    "148",
    "--blood-pressure",
    "72",
    "--skin-thickness",
    "35",
    "--insulin",
    "0",
    "--bmi",
    "33.6",
    "--diabetes-pedigree-function",
    "0.627",
    "--age",
    "50",
];

/// Test that the CLI shows help
#[test]
fn test_cli_help() {
    let output = dpx(&["--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI help should succeed");
    assert!(
        stdout.contains("Diabetes Risk Predictor"),
        "Should show app name"
    );
    assert!(stdout.contains("predict"), "Should show predict command");
    assert!(stdout.contains("validate"), "Should show validate command");
    assert!(stdout.contains("schema"), "Should show schema command");
    assert!(stdout.contains("model"), "Should show model command");
}

/// Test that the CLI shows version
#[test]
fn test_cli_version() {
    let output = dpx(&["--version"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI version should succeed");
    assert!(stdout.contains("dpx"), "Should show binary name");
}

/// Test predict subcommand help lists every measurement
#[test]
fn test_predict_help() {
    let output = dpx(&["predict", "--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success());
    for flag in [
        "--pregnancies",
        "--glucose",
        "--blood-pressure",
        "--skin-thickness",
        "--insulin",
        "--bmi",
        "--diabetes-pedigree-function",
        "--age",
    ] {
        assert!(stdout.contains(flag), "Should show {}", flag);
    }
}

/// Test model subcommand help
#[test]
fn test_model_help() {
    let output = dpx(&["model", "--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success());
    assert!(stdout.contains("status"));
    assert!(stdout.contains("reload"));
}

/// Local validation accepts a canonical record without a server
#[test]
fn test_validate_offline_success() {
    let mut args = vec!["validate"];
    args.extend_from_slice(PIMA_FIRST_RECORD);
    let output = dpx(&args);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    assert!(stdout.contains("All fields are valid"));
    assert!(stdout.contains("Blood Pressure"));
    assert!(stdout.contains("33.6"));
}

/// Local validation lists every field error and exits non-zero
#[test]
fn test_validate_offline_field_errors() {
    let output = dpx(&[
        "validate",
        "--pregnancies",
        "2.5",
        "--glucose",
        "abc",
        "--blood-pressure",
        "72",
        "--skin-thickness",
        "35",
        "--insulin",
        "0",
        "--bmi",
        "33.6",
        "--dpf",
        "3",
    ]);
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(!output.status.success());
    assert!(stderr.contains("Pregnancies must be a whole number"));
    assert!(stderr.contains("Glucose must be a valid number"));
    assert!(stderr.contains("Diabetes Pedigree Function must be at most 2.42"));
    assert!(stderr.contains("Age is required"));
}

/// JSON output for a valid record
#[test]
fn test_validate_json_output() {
    let mut args = vec!["--format", "json", "validate"];
    args.extend_from_slice(PIMA_FIRST_RECORD);
    let output = dpx(&args);

    assert!(output.status.success());
    let rows: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let rows = rows.as_array().unwrap();
    assert_eq!(rows.len(), 8);
    assert_eq!(rows[0]["feature"], "Pregnancies");
    assert_eq!(rows[7]["value"], 50.0);
}

/// Network commands fail cleanly when the service is unreachable
#[test]
fn test_predict_unreachable_service() {
    let mut args = vec!["predict"];
    args.extend_from_slice(PIMA_FIRST_RECORD);
    let output = dpx(&args);

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Failed to send request"));
}
