use assert_cmd::Command;
use marker_pose::replay::FrameReport;
use predicates::prelude::*;
use std::fs;

const SESSION: &str = r#"{
  "markers": [
    { "marker_id": 1, "marker_size": 50.0, "max_frames_lost": 1 },
    { "marker_id": 4, "marker_size": 50.0 }
  ]
}"#;

const FRONTAL_1: &str = r#"{"width":640,"height":480,"markers":[{"id":1,"corners":[[300,220],[340,220],[340,260],[300,260]]}]}"#;
const EMPTY: &str = r#"{"width":640,"height":480,"markers":[]}"#;

fn cmd() -> Command {
    Command::cargo_bin("marker-pose").expect("binary")
}

#[test]
fn replay_writes_pose_reports_to_stdout() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = dir.path().join("session.json");
    let frames = dir.path().join("frames.jsonl");
    fs::write(&config, SESSION).expect("write config");
    fs::write(&frames, format!("{FRONTAL_1}\n{EMPTY}\n{EMPTY}\n")).expect("write frames");

    let output = cmd()
        .args(["replay", "--config"])
        .arg(&config)
        .arg("--detections")
        .arg(&frames)
        .args(["--log-level", "off"])
        .output()
        .expect("run");
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).expect("utf8");
    let reports: Vec<FrameReport> = stdout
        .lines()
        .map(|l| serde_json::from_str(l).expect("report line"))
        .collect();
    assert_eq!(reports.len(), 3);

    let ids: Vec<u32> = reports[0].poses.iter().map(|p| p.id).collect();
    assert_eq!(ids, vec![1, 4]);

    let visible_1: Vec<bool> = reports.iter().map(|r| r.poses[0].visible).collect();
    assert_eq!(visible_1, vec![true, true, false]);
    assert!(reports.iter().all(|r| !r.poses[1].visible));
    assert!((reports[0].poses[0].position[2] + 800.0).abs() < 1e-6);
}

#[test]
fn log_level_flag_enables_debug_output() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = dir.path().join("session.json");
    let frames = dir.path().join("frames.jsonl");
    fs::write(&config, SESSION).expect("write config");
    fs::write(&frames, format!("{FRONTAL_1}\n")).expect("write frames");

    cmd()
        .args(["replay", "--config"])
        .arg(&config)
        .arg("--detections")
        .arg(&frames)
        .args(["--log-level", "debug"])
        .assert()
        .success()
        .stderr(
            predicate::str::contains("DEBUG")
                .and(predicate::str::contains("frame 0"))
                .and(predicate::str::contains("tracking marker(s) 1, 4")),
        );

    cmd()
        .args(["replay", "--config"])
        .arg(&config)
        .arg("--detections")
        .arg(&frames)
        .args(["--log-level", "warn"])
        .assert()
        .success()
        .stderr(predicate::str::contains("DEBUG").not());
}

#[test]
fn replay_writes_output_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = dir.path().join("session.json");
    let frames = dir.path().join("frames.jsonl");
    let out = dir.path().join("poses.jsonl");
    fs::write(&config, SESSION).expect("write config");
    fs::write(&frames, format!("{FRONTAL_1}\n\n{FRONTAL_1}\n")).expect("write frames");

    cmd()
        .args(["replay", "--config"])
        .arg(&config)
        .arg("--detections")
        .arg(&frames)
        .arg("--output")
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::is_empty());

    let written = fs::read_to_string(&out).expect("read output");
    assert_eq!(written.lines().count(), 2);
}

#[test]
fn malformed_detection_line_fails_with_line_number() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = dir.path().join("session.json");
    let frames = dir.path().join("frames.jsonl");
    fs::write(&config, SESSION).expect("write config");
    fs::write(&frames, format!("{FRONTAL_1}\n{{\"width\": \"wide\"}}\n")).expect("write frames");

    cmd()
        .args(["replay", "--config"])
        .arg(&config)
        .arg("--detections")
        .arg(&frames)
        .assert()
        .failure()
        .stderr(predicate::str::contains("line 2"));
}

#[test]
fn duplicate_marker_ids_are_rejected() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = dir.path().join("session.json");
    let frames = dir.path().join("frames.jsonl");
    fs::write(
        &config,
        r#"{ "markers": [ { "marker_id": 2, "marker_size": 50 }, { "marker_id": 2, "marker_size": 80 } ] }"#,
    )
    .expect("write config");
    fs::write(&frames, "").expect("write frames");

    cmd()
        .args(["replay", "--config"])
        .arg(&config)
        .arg("--detections")
        .arg(&frames)
        .assert()
        .failure()
        .stderr(predicate::str::contains("configured more than once"));
}

#[test]
fn sample_config_round_trips_into_replay() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = dir.path().join("generated.json");

    cmd()
        .args(["sample-config", "--output"])
        .arg(&config)
        .args(["--marker-id", "1", "7", "--strategy", "translation", "--no-flip-z"])
        .assert()
        .success()
        .stdout(predicate::str::contains("wrote"));

    let loaded = marker_pose::SessionConfig::load_json(&config).expect("load");
    assert_eq!(loaded.markers.len(), 2);
    assert!(!loaded.markers[0].output.flip_z);

    let frames = dir.path().join("frames.jsonl");
    fs::write(&frames, format!("{FRONTAL_1}\n")).expect("write frames");
    cmd()
        .args(["replay", "--config"])
        .arg(&config)
        .arg("--detections")
        .arg(&frames)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"visible\":true"));
}

#[test]
fn sample_config_rejects_bad_marker_size() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = dir.path().join("bad.json");

    cmd()
        .args(["sample-config", "--output"])
        .arg(&config)
        .args(["--marker-id", "1", "--marker-size", "0"])
        .assert()
        .failure();
    assert!(!config.exists());
}
