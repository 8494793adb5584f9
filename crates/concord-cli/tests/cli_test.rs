use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

const SCENARIO_A: &str = r#"{"channel": "tool-call-c1", "payload": {"id": "1", "name": "read_file"}}
{"channel": "text-c1", "payload": "Reading the file."}
"#;

fn concord() -> Command {
    let mut cmd = Command::cargo_bin("concord").unwrap();
    cmd.env("NO_COLOR", "1").env_remove("RUST_LOG");
    cmd
}

fn write_log(dir: &TempDir, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    path
}

#[test]
fn test_replay_prints_transcript() {
    let dir = TempDir::new().unwrap();
    let log = write_log(&dir, "session.jsonl", SCENARIO_A);

    concord()
        .current_dir(dir.path())
        .arg("replay")
        .arg(&log)
        .assert()
        .success()
        .stdout(predicate::str::contains("Conversation c1"))
        .stdout(predicate::str::contains("[tool 1 read_file] pending"))
        .stdout(predicate::str::contains("Reading the file."))
        .stdout(predicate::str::contains("2 events applied, 0 skipped"));
}

#[test]
fn test_replay_json_output() {
    let dir = TempDir::new().unwrap();
    let log = write_log(
        &dir,
        "session.jsonl",
        r#"{"channel": "tool-call-c1", "payload": {"id": "2", "name": "edit_file"}}
{"channel": "tool-call-confirmation-c1", "payload": {"requestId": 5, "sessionId": "s", "toolCallId": "2", "confirmation": {"type": "edit"}}}
{"resolve": {"toolCallId": "2", "outcome": "reject"}}
"#,
    );

    let output = concord()
        .current_dir(dir.path())
        .args(["replay", "--json"])
        .arg(&log)
        .output()
        .unwrap();
    assert!(output.status.success());

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let call = &report["conversations"][0]["messages"][0]["parts"][0]["toolCall"];
    assert_eq!(call["status"], "failed");
    assert_eq!(call["result"]["markdown"], "Tool call rejected by user");
    assert_eq!(report["resolutions"][0]["result"], "resolved");
    assert_eq!(report["commands"][1]["command"], "sendConfirmation");
}

#[test]
fn test_replay_missing_file_fails() {
    let dir = TempDir::new().unwrap();

    concord()
        .current_dir(dir.path())
        .args(["replay", "does-not-exist.jsonl"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read event log"));
}

#[test]
fn test_replay_invalid_line_fails() {
    let dir = TempDir::new().unwrap();
    let log = write_log(&dir, "bad.jsonl", "{\"channel\": \"text-c1\", \"payload\": \"a\"}\nnot json\n");

    concord()
        .current_dir(dir.path())
        .arg("replay")
        .arg(&log)
        .assert()
        .failure()
        .stderr(predicate::str::contains("line 2"));
}

#[test]
fn test_config_uses_file_in_working_directory() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("concord.yaml"),
        "history_window: 4\nheuristics:\n  sweep_running_edits: false\n",
    )
    .unwrap();

    concord()
        .current_dir(dir.path())
        .env("HOME", dir.path())
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("concord.yaml"))
        .stdout(predicate::str::contains("\"history_window\": 4"))
        .stdout(predicate::str::contains("\"sweep_running_edits\": false"));
}

#[test]
fn test_heuristics_can_be_disabled() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("strict.json");
    fs::write(&config, r#"{"heuristics": {"fallback_edit_match": false}}"#).unwrap();
    let log = write_log(
        &dir,
        "session.jsonl",
        r#"{"channel": "tool-call-c1", "payload": {"id": "3", "name": "edit_config"}}
{"resolve": {"toolCallId": "none", "outcome": "allow"}}
{"channel": "tool-call-update-c1", "payload": {"toolCallId": "3", "status": "running"}}
{"resolve": {"toolCallId": "none", "outcome": "allow"}}
{"channel": "tool-call-update-c1", "payload": {"toolCallId": "99", "status": "finished", "content": {"error": "boom"}}}
"#,
    );

    concord()
        .current_dir(dir.path())
        .args(["replay", "--config"])
        .arg(&config)
        .arg(&log)
        .assert()
        .success()
        .stdout(predicate::str::contains("[tool 3 edit_config] running"))
        .stdout(predicate::str::contains("resolve none allow: not pending"));
}
