use assert_cmd::Command;
use serde_json::Value;
use std::fs;
use tempfile::tempdir;

#[test]
fn filter_removes_the_injected_spike() {
    let temp = tempdir().unwrap();
    let input = temp.path().join("recording.csv");
    let mut rows = String::from("Time,R,G,B,X,Y,Z,L*,a*,b*\n");
    for i in 0..40 {
        let a_star = if i == 17 { 110.0 } else { 10.0 };
        rows.push_str(&format!(
            "{}.0,120,80,60,0.4,0.37,0.29,50,{},12\n",
            i, a_star
        ));
    }
    fs::write(&input, rows).unwrap();

    let out = temp.path().join("cleaned.csv");
    let output = Command::cargo_bin("rtd")
        .unwrap()
        .args([
            "filter",
            "--input",
            input.to_str().unwrap(),
            "--out",
            out.to_str().unwrap(),
            "--half-window",
            "5",
            "--sigma",
            "6.0",
        ])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let summary: Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(summary["removed"].as_u64(), Some(1));
    assert_eq!(summary["remaining"].as_u64(), Some(39));

    let cleaned = fs::read_to_string(&out).unwrap();
    // Header plus the surviving rows.
    assert_eq!(cleaned.lines().count(), 40);
    assert!(!cleaned.contains("110"));
}
