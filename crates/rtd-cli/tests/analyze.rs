use assert_cmd::Command;
use serde_json::Value;
use std::fs;
use tempfile::tempdir;

#[test]
fn impulse_session_end_to_end() {
    let temp = tempdir().unwrap();
    let recording = temp.path().join("recording.csv");
    Command::cargo_bin("rtd")
        .unwrap()
        .args([
            "simulate",
            "--kind",
            "impulse",
            "--duration-s",
            "240",
            "--rate-hz",
            "5",
            "--event-time",
            "60",
            "--noise",
            "0.02",
            "--seed",
            "7",
            "--out",
            recording.to_str().unwrap(),
        ])
        .assert()
        .success();

    let config_path = temp.path().join("session.toml");
    fs::write(
        &config_path,
        format!(
            r#"
input = "{}"

[concentration]
channel = "a"

[outliers]
half_window = 7
sigma = 6.0

[smoothing]
window = 3

[[events]]
label = "impulse 1"
kind = "impulse"
time = 60.0
window = [-30.0, 120.0]
baseline = [-30.0, -5.0]
tail = [80.0, 120.0]
"#,
            recording.display()
        ),
    )
    .unwrap();

    let out_dir = temp.path().join("results");
    let output = Command::cargo_bin("rtd")
        .unwrap()
        .args([
            "analyze",
            "--config",
            config_path.to_str().unwrap(),
            "--out",
            out_dir.to_str().unwrap(),
        ])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let summary: Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(summary["events"].as_array().unwrap().len(), 1);
    let props = &summary["events"][0]["properties"];
    assert!(props["area"].as_f64().unwrap() > 0.0);
    let p = |name: &str| props[name].as_f64().unwrap();
    assert!(p("p1") <= p("p5"));
    assert!(p("p5") <= p("p50"));
    assert!(p("p50") <= p("p95"));
    assert!(p("p95") <= p("p99"));
    assert!(p("variance") >= 0.0);

    let curve_path = out_dir.join("impulse-1_curve.csv");
    assert!(curve_path.exists());
    let curve = fs::read_to_string(&curve_path).unwrap();
    assert!(curve.starts_with("time,time_response,rtd,"));
    assert!(out_dir.join("properties.csv").exists());
}

#[test]
fn step_up_session_end_to_end() {
    let temp = tempdir().unwrap();
    let recording = temp.path().join("recording.csv");
    Command::cargo_bin("rtd")
        .unwrap()
        .args([
            "simulate",
            "--kind",
            "step-up",
            "--duration-s",
            "240",
            "--rate-hz",
            "5",
            "--event-time",
            "60",
            "--noise",
            "0",
            "--seed",
            "1",
            "--out",
            recording.to_str().unwrap(),
        ])
        .assert()
        .success();

    let config_path = temp.path().join("session.toml");
    fs::write(
        &config_path,
        format!(
            r#"
input = "{}"

[concentration]
channel = "a"

[[events]]
label = "step 1"
kind = "step-up"
time = 60.0
window = [-30.0, 120.0]
baseline = [-30.0, -5.0]
tail = [40.0, 120.0]
"#,
            recording.display()
        ),
    )
    .unwrap();

    let out_dir = temp.path().join("results");
    let output = Command::cargo_bin("rtd")
        .unwrap()
        .args([
            "analyze",
            "--config",
            config_path.to_str().unwrap(),
            "--out",
            out_dir.to_str().unwrap(),
        ])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let summary: Value = serde_json::from_slice(&output).unwrap();
    let props = &summary["events"][0]["properties"];
    assert!(props["area"].is_null(), "step events carry no area");
    // The logistic transition crosses half height right at the event.
    assert!(props["p50"].as_f64().unwrap().abs() < 2.0);

    let curve = fs::read_to_string(out_dir.join("step-1_curve.csv")).unwrap();
    assert!(curve.starts_with("time,time_response,value,"));
}

#[test]
fn analyze_rejects_missing_config() {
    Command::cargo_bin("rtd")
        .unwrap()
        .args(["analyze", "--config", "/nonexistent/session.toml"])
        .assert()
        .failure();
}
