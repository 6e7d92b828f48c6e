//! Command-line tests for the iterloop binary

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use tempfile::TempDir;

struct Env {
    temp: TempDir,
}

impl Env {
    fn new(backend: &str) -> Self {
        let temp = TempDir::new().unwrap();
        let sessions = temp.path().join("sessions");
        let config = format!(
            "log_level: debug\nstorage:\n  backend: {}\n  dir: {}\n",
            backend,
            sessions.display()
        );
        fs::write(temp.path().join("iterloop.yml"), config).unwrap();
        Self { temp }
    }

    fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("iterloop").unwrap();
        cmd.env("HOME", self.temp.path())
            .env("XDG_DATA_HOME", self.temp.path().join("data"))
            .arg("--config")
            .arg(self.temp.path().join("iterloop.yml"));
        cmd
    }

    fn json(&self, args: &[&str]) -> Value {
        let output = self.cmd().args(args).output().unwrap();
        assert!(output.status.success(), "{:?} failed: {:?}", args, output);
        serde_json::from_slice(&output.stdout).unwrap()
    }
}

#[test]
fn test_combos_prints_each_combination() {
    let env = Env::new("memory");
    env.cmd()
        .args(["combos", r#"[[1,2],["a","b"]]"#])
        .assert()
        .success()
        .stdout(predicate::eq("[1,\"a\"]\n[1,\"b\"]\n[2,\"a\"]\n[2,\"b\"]\n"));
}

#[test]
fn test_run_reports_complete_loop() {
    let env = Env::new("memory");
    let report = env.json(&["run", "--inputs", r#"[[1,2],"x"]"#]);

    assert_eq!(report["status"], "complete");
    assert_eq!(report["passes"], 3);
    assert_eq!(report["resubmissions"], 2);
    assert_eq!(report["results"], serde_json::json!([[1, "x"], [2, "x"]]));
}

#[test]
fn test_rejects_non_array_inputs() {
    let env = Env::new("memory");
    env.cmd()
        .args(["run", "--inputs", r#"{"a":1}"#])
        .assert()
        .failure()
        .stderr(predicate::str::contains("JSON array"));
}

#[test]
fn test_handshake_across_invocations() {
    let env = Env::new("jsonl");
    let inputs = r#"[["p","q"]]"#;

    let first = env.json(&["source", "--inputs", inputs]);
    assert_eq!(first["item"], serde_json::json!(["p"]));
    let context = first["context"].to_string();

    let sink = env.json(&["sink", "--result", "1", "--context", &context]);
    let control = sink["resubmit"].to_string();
    assert_eq!(sink["resubmit"]["target_index"], 1);

    env.cmd()
        .args(["sessions", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains(first["context"]["loop_id"].as_str().unwrap()));

    let second = env.json(&["source", "--inputs", inputs, "--control", &control]);
    assert_eq!(second["item"], serde_json::json!(["q"]));
    let sink = env.json(&["sink", "--result", "2", "--context", &second["context"].to_string()]);
    let control = sink["resubmit"].to_string();

    let last = env.json(&["source", "--inputs", inputs, "--control", &control]);
    assert_eq!(last["item"], Value::Null);
    assert_eq!(last["context"]["is_finished"], true);
    let done = env.json(&["sink", "--result", "null", "--context", &last["context"].to_string()]);

    assert_eq!(done["status"], "complete");
    assert_eq!(done["results"], serde_json::json!([1, 2]));

    env.cmd()
        .args(["sessions", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No active loops"));
}

#[test]
fn test_sessions_clear_unknown_loop() {
    let env = Env::new("jsonl");
    env.cmd()
        .args(["sessions", "clear", "missing"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Not found"));
}
