//! Tests for the fleetcost binary
//!
//! Runs the built binary against the fixture snapshot and checks exit
//! status and output shape.

use std::path::PathBuf;
use std::process::Command;
use tempfile::TempDir;

fn fixture_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join("snapshot.json")
}

fn fleetcost(args: &[&str]) -> std::process::Output {
    let temp_dir = TempDir::new().unwrap();
    let missing_config = temp_dir.path().join("none.toml");
    Command::new(env!("CARGO_BIN_EXE_fleetcost"))
        .current_dir(temp_dir.path())
        .arg("--config")
        .arg(&missing_config)
        .args(args)
        .output()
        .expect("Failed to execute fleetcost")
}

#[test]
fn test_report_json_output() {
    let snapshot = fixture_path();
    let output = fleetcost(&["report", "--snapshot", snapshot.to_str().unwrap(), "--output", "json"]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let stdout = String::from_utf8_lossy(&output.stdout);
    let json: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(json["total"]["instances"], 5);
}

#[test]
fn test_report_rejects_wrong_tag_count() {
    let snapshot = fixture_path();
    let output = fleetcost(&[
        "report",
        "--snapshot",
        snapshot.to_str().unwrap(),
        "--group-by",
        "team,purpose,owner",
    ]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("exactly 2 tag names"));
}

#[test]
fn test_pareto_with_explicit_metrics() {
    let snapshot = fixture_path();
    let output = fleetcost(&[
        "pareto",
        "--snapshot",
        snapshot.to_str().unwrap(),
        "--region",
        "us-east-1",
        "--metrics",
        "ecu,memory",
        "--output",
        "csv",
    ]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout.lines().count(), 3);
}

#[test]
fn test_price_missing_type_fails() {
    let snapshot = fixture_path();
    let output = fleetcost(&[
        "price",
        "--snapshot",
        snapshot.to_str().unwrap(),
        "--region",
        "us-east-1",
        "--instance-type",
        "x9.enormous",
    ]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("x9.enormous"));
}

#[test]
fn test_init_writes_config() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("fleetcost.toml");
    let output = fleetcost(&["init", "--path", path.to_str().unwrap()]);
    assert!(output.status.success());
    assert!(path.exists());

    let again = fleetcost(&["init", "--path", path.to_str().unwrap()]);
    assert!(!again.status.success());
}
