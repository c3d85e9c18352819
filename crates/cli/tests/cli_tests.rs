//! CLI integration tests

use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

fn smanalyzer(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_smanalyzer"))
        .args(args)
        .env("RUST_LOG", "error")
        .env("HOME", std::env::temp_dir())
        .output()
        .expect("Failed to execute command")
}

/// Traffic for `checkout` that ends in a spike, and a failing `payments`
fn write_input(dir: &Path) -> String {
    let mut lines = Vec::new();
    for i in 0..12 {
        let value = if i >= 9 { 450.0 } else { 100.0 };
        lines.push(format!(
            r#"{{"entity":"checkout","metric":"request_count","value":{},"timestamp":"2024-01-15T14:{:02}:00Z"}}"#,
            value, i
        ));
    }
    lines.push(
        r#"{"entity":"payments","metric":"error_rate","value":0.2,"timestamp":"2024-01-15T14:30:00Z","labels":{"namespace":"shop"}}"#
            .to_string(),
    );
    lines.push("this line is not json".to_string());

    let path = dir.join("readings.ndjson");
    fs::write(&path, lines.join("\n") + "\n").unwrap();
    path.display().to_string()
}

/// Steady traffic long enough to learn a baseline from
fn write_steady_input(dir: &Path) -> String {
    let lines: Vec<String> = (0..30)
        .map(|i| {
            format!(
                r#"{{"entity":"checkout","metric":"request_count","value":100.0,"timestamp":"2024-01-15T13:{:02}:00Z"}}"#,
                i
            )
        })
        .collect();
    let path = dir.join("steady.ndjson");
    fs::write(&path, lines.join("\n") + "\n").unwrap();
    path.display().to_string()
}

#[test]
fn test_cli_help() {
    let output = smanalyzer(&["--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI help should succeed");
    assert!(stdout.contains("Service Mesh Analyzer"), "Should show app name");
    assert!(stdout.contains("scan"), "Should show scan command");
    assert!(stdout.contains("learn"), "Should show learn command");
    assert!(stdout.contains("monitor"), "Should show monitor command");
    assert!(stdout.contains("status"), "Should show status command");
}

#[test]
fn test_cli_version() {
    let output = smanalyzer(&["--version"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI version should succeed");
    assert!(stdout.contains("smanalyzer"), "Should show binary name");
}

#[test]
fn test_scan_json_output() {
    let dir = TempDir::new().unwrap();
    let input = write_input(dir.path());

    let output = smanalyzer(&["scan", "--input", &input, "--format", "json"]);
    assert!(output.status.success(), "scan should succeed: {:?}", output);

    let anomalies: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let anomalies = anomalies.as_array().unwrap();
    assert_eq!(anomalies.len(), 2);
    assert_eq!(anomalies[0]["entity"], "checkout");
    assert_eq!(anomalies[0]["type"], "traffic_spike");
    assert_eq!(anomalies[1]["entity"], "payments");
    assert_eq!(anomalies[1]["type"], "error_rate_high");
    assert_eq!(anomalies[1]["labels"]["namespace"], "shop");
}

#[test]
fn test_scan_text_output() {
    let dir = TempDir::new().unwrap();
    let input = write_input(dir.path());

    let output = smanalyzer(&["scan", "-i", &input, "--entity", "payments"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success());
    assert!(stdout.contains("Found 1 anomalies"));
    assert!(stdout.contains("High error rate: 20.00%"));
}

#[test]
fn test_learn_then_scan_with_baselines() {
    let dir = TempDir::new().unwrap();
    let steady = write_steady_input(dir.path());
    let snapshot = dir.path().join("baselines.json");
    let snapshot_arg = snapshot.display().to_string();

    let output = smanalyzer(&[
        "learn", "--input", &steady, "--output", &snapshot_arg, "--format", "json",
    ]);
    assert!(output.status.success(), "learn should succeed: {:?}", output);
    let summary: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(summary["learned"][0]["entity"], "checkout");
    assert!(snapshot.exists());

    let input = write_input(dir.path());
    let output = smanalyzer(&[
        "scan", "--input", &input, "--baselines", &snapshot_arg, "--format", "json",
    ]);
    assert!(output.status.success());
    let anomalies: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let types: Vec<&str> = anomalies
        .as_array()
        .unwrap()
        .iter()
        .map(|a| a["type"].as_str().unwrap())
        .collect();
    assert!(types.contains(&"behavioral_anomaly"));
}

#[test]
fn test_status_reports_config_and_input() {
    let dir = TempDir::new().unwrap();
    let input = write_input(dir.path());
    let config = dir.path().join("analyzer.yaml");
    fs::write(&config, "detection:\n  window_size: 5\n").unwrap();

    let output = smanalyzer(&[
        "status",
        "--config",
        &config.display().to_string(),
        "--input",
        &input,
        "--format",
        "json",
    ]);
    assert!(output.status.success(), "status should succeed: {:?}", output);

    let status: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(status["config"]["detection"]["window_size"], 5);
    assert_eq!(status["config"]["clustering"]["k"], 3);
    assert_eq!(status["store"]["entities"], 2);
    assert_eq!(status["store"]["samples"], 13);
}

#[test]
fn test_monitor_single_cycle() {
    let dir = TempDir::new().unwrap();
    let input = write_input(dir.path());

    let output = smanalyzer(&[
        "monitor",
        "--input",
        &input,
        "--max-cycles",
        "1",
        "--format",
        "json",
    ]);
    assert!(output.status.success(), "monitor should succeed: {:?}", output);

    let stdout = String::from_utf8_lossy(&output.stdout);
    let types: Vec<String> = stdout
        .lines()
        .map(|line| {
            let value: serde_json::Value = serde_json::from_str(line).unwrap();
            value["type"].as_str().unwrap().to_string()
        })
        .collect();
    assert_eq!(types, vec!["traffic_spike", "error_rate_high"]);
}

#[test]
fn test_invalid_config_fails() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("bad.yaml");
    fs::write(&config, "clustering:\n  k: 0\n").unwrap();

    let output = smanalyzer(&["status", "--config", &config.display().to_string()]);
    assert!(!output.status.success());
}
