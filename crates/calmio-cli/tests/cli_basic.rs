//! Basic CLI E2E tests.
//!
//! Each test runs the built binary against its own temporary data directory.

use std::path::Path;
use std::process::Command;

/// Run a CLI command and return (stdout, stderr, exit code).
fn run_cli(data_dir: &Path, args: &[&str]) -> (String, String, i32) {
    let output = Command::new(env!("CARGO_BIN_EXE_calmio-cli"))
        .args(args)
        .env("CALMIO_DATA_DIR", data_dir)
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to execute CLI command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);

    (stdout, stderr, code)
}

fn run_json(data_dir: &Path, args: &[&str]) -> serde_json::Value {
    let (stdout, stderr, code) = run_cli(data_dir, args);
    assert_eq!(code, 0, "{args:?} failed: {stderr}");
    serde_json::from_str(&stdout).unwrap_or_else(|e| panic!("{args:?} printed invalid JSON ({e}): {stdout}"))
}

#[test]
fn test_session_add_and_streak() {
    let dir = tempfile::tempdir().unwrap();
    let first = run_json(
        dir.path(),
        &["session", "add", "--start", "2023-01-01 08:00", "--seconds", "60", "--breaths", "5", "--inhale", "3", "--exhale", "3"],
    );
    assert_eq!(first["session"]["duration"], 60);
    let codes: Vec<&str> = first["badges"]
        .as_array()
        .unwrap()
        .iter()
        .map(|b| b["code"].as_str().unwrap())
        .collect();
    assert!(codes.contains(&"5_breaths_session"));

    run_json(
        dir.path(),
        &["session", "add", "--start", "2023-01-02 09:00", "--seconds", "120", "--breaths", "6"],
    );
    assert_eq!(run_json(dir.path(), &["stats", "streak"])["streak"], 2);
    assert_eq!(run_json(dir.path(), &["session", "last"])["duration"], 120);
}

#[test]
fn test_weekly_summary() {
    let dir = tempfile::tempdir().unwrap();
    for (start, secs) in [("2023-05-01 10:00", "120"), ("2023-05-02 11:00", "300"), ("2023-05-07 18:00", "240")] {
        run_json(dir.path(), &["session", "add", "--start", start, "--seconds", secs]);
    }
    let week = run_json(dir.path(), &["stats", "week", "--date", "2023-05-03"]);
    assert_eq!(week["total_seconds"], 660);
    assert_eq!(week["minutes_per_day"][1], 5.0);
    assert_eq!(week["longest_session"]["weekday"], "Tuesday");
}

#[test]
fn test_month_rejects_bad_month() {
    let dir = tempfile::tempdir().unwrap();
    let (_, stderr, code) = run_cli(dir.path(), &["stats", "month", "--year", "2023", "--month", "13"]);
    assert_ne!(code, 0);
    assert!(stderr.contains("error"));
}

#[test]
fn test_simulate_records_breaths() {
    let dir = tempfile::tempdir().unwrap();
    let out = run_json(dir.path(), &["session", "simulate", "--pattern", "box", "--cycles", "2"]);
    assert_eq!(out["session"]["breaths"], 2);
    assert_eq!(out["session"]["cycles"].as_array().unwrap().len(), 2);

    let today = run_json(dir.path(), &["session", "today"]);
    assert_eq!(today["sessions"].as_array().unwrap().len(), 1);
}

#[test]
fn test_pattern_list_and_show() {
    let dir = tempfile::tempdir().unwrap();
    let list = run_json(dir.path(), &["pattern", "list"]);
    assert!(list.as_array().unwrap().iter().any(|p| p["id"] == "4-7-8"));

    let show = run_json(dir.path(), &["pattern", "show", "box"]);
    assert_eq!(show["expected_key_states"], serde_json::json!(["pressed", "pressed", "released", "released"]));

    let (_, _, code) = run_cli(dir.path(), &["pattern", "show", "nope"]);
    assert_ne!(code, 0);
}

#[test]
fn test_config_set_and_get() {
    let dir = tempfile::tempdir().unwrap();
    let updated = run_json(dir.path(), &["config", "set", "visual.dark_mode", "true"]);
    assert_eq!(updated["value"], "true");

    let (stdout, _, _) = run_cli(dir.path(), &["config", "get", "visual.dark_mode"]);
    assert_eq!(stdout.trim(), "true");

    let (_, _, code) = run_cli(dir.path(), &["config", "set", "visual.bogus", "1"]);
    assert_ne!(code, 0);
    assert!(dir.path().join("config.toml").exists());

    let (stdout, _, _) = run_cli(dir.path(), &["config", "path"]);
    assert_eq!(stdout.trim(), dir.path().join("config.toml").display().to_string());
}

#[test]
fn test_data_clear_requires_confirmation() {
    let dir = tempfile::tempdir().unwrap();
    run_json(dir.path(), &["session", "add", "--start", "2023-01-01 08:00", "--seconds", "60"]);

    let (_, _, code) = run_cli(dir.path(), &["data", "clear"]);
    assert_ne!(code, 0);
    assert_eq!(run_json(dir.path(), &["data", "export"])["daily_seconds"]["2023-01-01"], 60);

    let (_, _, code) = run_cli(dir.path(), &["data", "clear", "--yes"]);
    assert_eq!(code, 0);
    let export = run_json(dir.path(), &["data", "export"]);
    assert_eq!(export["sessions"], serde_json::json!([]));
}

#[test]
fn test_dev_day_offset_moves_today() {
    let dir = tempfile::tempdir().unwrap();
    let before = run_json(dir.path(), &["dev", "advance-day", "--days", "2"]);
    assert_eq!(before["day_offset"], 2);

    let reset = run_json(dir.path(), &["dev", "reset-offset"]);
    assert_eq!(reset["day_offset"], 0);
}
