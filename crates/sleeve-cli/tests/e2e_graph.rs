//! E2E CLI tests: `sleeve graph`, `sleeve cycles`, `sleeve versions`,
//! `sleeve extract` and `sleeve completions`.
//!
//! Each test writes its inputs into a temp directory and runs the `sleeve`
//! binary there as a subprocess.

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::{Value, json};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

// ---------------------------------------------------------------------------
// Test Harness
// ---------------------------------------------------------------------------

/// Build a Command targeting the `sleeve` binary, rooted in `dir`.
fn sleeve_cmd(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("sleeve").expect("sleeve binary must exist");
    cmd.current_dir(dir);
    // Suppress tracing output that goes to stderr.
    cmd.env("SLEEVE_LOG", "error");
    cmd.env_remove("FORMAT");
    cmd
}

fn event(op: &str, reconcile: &str, controller: &str, change_id: &str, extra: &Value) -> String {
    let mut record = json!({
        "timestamp": "2024-01-01T00:00:00Z",
        "reconcile_id": reconcile,
        "controller_id": controller,
        "root_event_id": "root",
        "op_type": op,
        "label:discrete.events/change-id": change_id,
    });
    if let (Some(record), Some(extra)) = (record.as_object_mut(), extra.as_object()) {
        record.extend(extra.clone());
    }
    record.to_string()
}

fn pod(object_id: &str) -> Value {
    json!({"kind": "Pod", "object_id": object_id, "version": "v1"})
}

fn version(kind: &str, object_id: &str, change_id: &str) -> String {
    let object = json!({
        "metadata": {
            "labels": {"discrete.events/change-id": change_id},
            "annotations": {"status.ready": "True"},
        }
    });
    json!({
        "kind": format!("/v1, Kind={kind}"),
        "object_id": object_id,
        "version": "5",
        "value": object.to_string(),
    })
    .to_string()
}

fn write_lines(dir: &Path, name: &str, lines: &[String]) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, lines.join("\n")).expect("write input");
    path
}

/// A read of `Pod/x1` followed by a create that inherits its identity.
fn scenario_a(dir: &Path) -> PathBuf {
    write_lines(
        dir,
        "ops.jsonl",
        &[
            event("GET", "r1", "c1", "x1", &pod("p1")),
            event("CREATE", "r1", "c1", "x1", &json!({})),
        ],
    )
}

fn run_json(cmd: &mut Command) -> Value {
    let output = cmd.output().expect("command should not crash");
    assert!(
        output.status.success(),
        "command failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("stdout should be valid JSON")
}

// ---------------------------------------------------------------------------
// graph
// ---------------------------------------------------------------------------

#[test]
fn graph_json_links_read_to_backfilled_write() {
    let dir = TempDir::new().expect("tempdir");
    let events = scenario_a(dir.path());

    let json = run_json(
        sleeve_cmd(dir.path())
            .args(["graph", "--events"])
            .arg(&events)
            .arg("--json"),
    );

    let nodes = json["graph"]["nodes"].as_array().expect("nodes array");
    let edges = json["graph"]["edges"].as_array().expect("edges array");
    assert_eq!(nodes.len(), 2);
    assert_eq!(edges.len(), 1);
    assert_eq!(edges[0]["from"], "read:Pod/x1");
    assert_eq!(edges[0]["to"], "write:Pod/x1");
    assert_eq!(edges[0]["reconcile_id"], "r1");
    assert_eq!(edges[0]["color"], "#ff9999");
    assert!(
        json["fingerprint"]
            .as_str()
            .is_some_and(|hash| hash.starts_with("blake3:"))
    );
    assert_eq!(json["summary"]["cycles"], 1);
}

#[test]
fn graph_fingerprint_is_stable_across_runs() {
    let dir = TempDir::new().expect("tempdir");
    let events = scenario_a(dir.path());

    let first = run_json(sleeve_cmd(dir.path()).args(["graph", "--json", "--events"]).arg(&events));
    let second = run_json(sleeve_cmd(dir.path()).args(["graph", "--json", "--events"]).arg(&events));
    assert_eq!(first["fingerprint"], second["fingerprint"]);
}

#[test]
fn graph_annotates_reads_from_versions() {
    let dir = TempDir::new().expect("tempdir");
    let events = scenario_a(dir.path());
    let versions = write_lines(dir.path(), "versions.jsonl", &[version("Pod", "p1", "x1")]);

    let json = run_json(
        sleeve_cmd(dir.path())
            .args(["graph", "--json", "--events"])
            .arg(&events)
            .arg("--versions")
            .arg(&versions),
    );

    let read = json["graph"]["nodes"]
        .as_array()
        .expect("nodes array")
        .iter()
        .find(|node| node["id"] == "read:Pod/x1")
        .expect("read node")
        .clone();
    assert_eq!(read["annotation"]["status.ready"], "True");
    assert!(
        read["label"]
            .as_str()
            .is_some_and(|label| label.contains("status.ready=True"))
    );
}

#[test]
fn graph_text_lists_nodes_and_edges() {
    let dir = TempDir::new().expect("tempdir");
    let events = scenario_a(dir.path());

    sleeve_cmd(dir.path())
        .args(["--format", "text", "graph", "--events"])
        .arg(&events)
        .assert()
        .success()
        .stdout(predicate::str::contains("node  read:Pod/x1"))
        .stdout(predicate::str::contains("edge  read:Pod/x1 -> write:Pod/x1  r1  #ff9999"));
}

#[test]
fn graph_from_raw_log() {
    let dir = TempDir::new().expect("tempdir");
    let log = [
        "2024-05-01T10:00:00Z INFO starting manager".to_string(),
        format!(
            "2024-05-01T10:00:01Z INFO sleeveless {{\"LogType\": \"sleeve:controller-operation\"}}{}",
            event("GET", "r1", "c1", "x1", &pod("p1"))
        ),
        format!(
            "2024-05-01T10:00:02Z INFO sleeveless {{\"LogType\": \"sleeve:controller-operation\"}}{}",
            event("UPDATE", "r1", "c1", "x9", &pod("p2"))
        ),
    ];
    let log = write_lines(dir.path(), "controller.log", &log);

    let json = run_json(sleeve_cmd(dir.path()).args(["graph", "--json", "--log"]).arg(&log));
    assert_eq!(json["summary"]["events"], 2);
    assert_eq!(json["graph"]["edges"][0]["from"], "read:Pod/x1");
    assert_eq!(json["graph"]["edges"][0]["to"], "write:Pod/x9");
}

#[test]
fn graph_mixed_controllers_is_fatal() {
    let dir = TempDir::new().expect("tempdir");
    let events = write_lines(
        dir.path(),
        "ops.jsonl",
        &[
            event("GET", "r1", "c1", "x1", &pod("p1")),
            event("UPDATE", "r1", "c2", "x2", &pod("p2")),
        ],
    );

    sleeve_cmd(dir.path())
        .args(["graph", "--events"])
        .arg(&events)
        .assert()
        .failure()
        .stderr(predicate::str::contains("E3001"))
        .stderr(predicate::str::contains("reconcile r1 spans controllers c1, c2"));
}

#[test]
fn graph_mixed_controllers_json_error() {
    let dir = TempDir::new().expect("tempdir");
    let events = write_lines(
        dir.path(),
        "ops.jsonl",
        &[
            event("GET", "r1", "c1", "x1", &pod("p1")),
            event("UPDATE", "r1", "c2", "x2", &pod("p2")),
        ],
    );

    let output = sleeve_cmd(dir.path())
        .args(["graph", "--json", "--events"])
        .arg(&events)
        .output()
        .expect("command should not crash");
    assert!(!output.status.success());

    let stderr = String::from_utf8_lossy(&output.stderr);
    let start = stderr.find('{').expect("json error on stderr");
    let end = stderr.rfind('}').expect("json error on stderr");
    let error: Value = serde_json::from_str(&stderr[start..=end]).expect("valid JSON error");
    assert_eq!(error["error"]["error_code"], "E3001");
}

#[test]
fn graph_without_inputs_fails() {
    let dir = TempDir::new().expect("tempdir");

    sleeve_cmd(dir.path())
        .args(["--format", "text", "graph"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no event input"));
}

#[test]
fn graph_reports_malformed_lines() {
    let dir = TempDir::new().expect("tempdir");
    let events = write_lines(
        dir.path(),
        "ops.jsonl",
        &[
            "not json".to_string(),
            event("GET", "r1", "c1", "x1", &pod("p1")),
            event("CREATE", "r1", "c1", "x1", &json!({})),
        ],
    );

    let json = run_json(sleeve_cmd(dir.path()).args(["graph", "--json", "--events"]).arg(&events));
    assert_eq!(json["summary"]["skipped_events"], 1);
    assert_eq!(json["summary"]["edges"], 1);
    let diagnostics = json["diagnostics"].as_array().expect("diagnostics array");
    assert!(diagnostics.iter().any(|d| d["subject"] == "line 1"));
}

#[test]
fn config_flag_overrides_extract_keyword() {
    let dir = TempDir::new().expect("tempdir");
    let config = dir.path().join("custom.toml");
    fs::write(&config, "[extract]\nkeyword = \"tracer\"\n").expect("write config");
    let log = [format!(
        "INFO tracer {{\"LogType\": \"sleeve:controller-operation\"}}{}",
        event("GET", "r1", "c1", "x1", &pod("p1"))
    )];
    let log = write_lines(dir.path(), "controller.log", &log);

    let json = run_json(
        sleeve_cmd(dir.path())
            .args(["graph", "--json", "--log"])
            .arg(&log)
            .arg("--config")
            .arg(&config),
    );
    assert_eq!(json["summary"]["events"], 1);
}

#[test]
fn bad_config_is_reported() {
    let dir = TempDir::new().expect("tempdir");
    let events = scenario_a(dir.path());
    let config = dir.path().join("broken.toml");
    fs::write(&config, "[graph\nsaturation = ").expect("write config");

    sleeve_cmd(dir.path())
        .args(["--format", "text", "graph", "--events"])
        .arg(&events)
        .arg("--config")
        .arg(&config)
        .assert()
        .failure()
        .stderr(predicate::str::contains("error:"));
}

// ---------------------------------------------------------------------------
// cycles
// ---------------------------------------------------------------------------

#[test]
fn cycles_text_lists_readset_and_writeset() {
    let dir = TempDir::new().expect("tempdir");
    let events = scenario_a(dir.path());

    sleeve_cmd(dir.path())
        .args(["--format", "text", "cycles", "--events"])
        .arg(&events)
        .assert()
        .success()
        .stdout(predicate::str::contains("Reconcile ID: r1, Controller: c1"))
        .stdout(predicate::str::contains("Readset:\n\tGET(Pod, id=p1"))
        .stdout(predicate::str::contains("Writeset:\n\tCREATE(Pod, id=p1"));
}

#[test]
fn cycles_hides_read_only_unless_all() {
    let dir = TempDir::new().expect("tempdir");
    let events = write_lines(
        dir.path(),
        "ops.jsonl",
        &[event("LIST", "r2", "c1", "x1", &pod("p1"))],
    );

    let json = run_json(sleeve_cmd(dir.path()).args(["cycles", "--json", "--events"]).arg(&events));
    assert_eq!(json["cycles"].as_array().map(Vec::len), Some(0));

    let json = run_json(
        sleeve_cmd(dir.path())
            .args(["cycles", "--json", "--all", "--events"])
            .arg(&events),
    );
    assert_eq!(json["cycles"][0]["reconcile_id"], "r2");
}

// ---------------------------------------------------------------------------
// versions
// ---------------------------------------------------------------------------

#[test]
fn versions_lists_catalog() {
    let dir = TempDir::new().expect("tempdir");
    let versions = write_lines(dir.path(), "versions.jsonl", &[version("Pod", "p1", "x1")]);

    sleeve_cmd(dir.path())
        .args(["--format", "text", "versions", "--versions"])
        .arg(&versions)
        .assert()
        .success()
        .stdout(predicate::str::contains("Pod/x1  p1@5  status.ready=True"));
}

#[test]
fn versions_requires_input() {
    let dir = TempDir::new().expect("tempdir");

    sleeve_cmd(dir.path())
        .args(["--format", "text", "versions"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no version input"));
}

// ---------------------------------------------------------------------------
// extract
// ---------------------------------------------------------------------------

#[test]
fn extract_splits_streams() {
    let dir = TempDir::new().expect("tempdir");
    let log = [
        "plain line".to_string(),
        "INFO sleeveless {\"LogType\": \"sleeve:controller-operation\"}{\"op\":1}".to_string(),
        "INFO sleeveless {\"LogType\": \"sleeve:object-version\"}{\"v\":1}".to_string(),
        "INFO sleeveless {\"LogType\": \"other\"}{}".to_string(),
    ];
    let log = write_lines(dir.path(), "controller.log", &log);

    let json = run_json(sleeve_cmd(dir.path()).args(["extract", "--json"]).arg(&log));
    assert_eq!(json["events"], json!(["{\"op\":1}"]));
    assert_eq!(json["versions"], json!(["{\"v\":1}"]));
    assert_eq!(json["dropped"], 1);

    sleeve_cmd(dir.path())
        .args(["--format", "text", "extract", "--stream", "versions"])
        .arg(&log)
        .assert()
        .success()
        .stdout(predicate::eq("{\"v\":1}\n"));
}

#[test]
fn extract_missing_file_fails() {
    let dir = TempDir::new().expect("tempdir");

    sleeve_cmd(dir.path())
        .args(["extract", "nope.log"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("nope.log"));
}

// ---------------------------------------------------------------------------
// completions
// ---------------------------------------------------------------------------

#[test]
fn completions_bash() {
    let dir = TempDir::new().expect("tempdir");

    sleeve_cmd(dir.path())
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("sleeve"));
}
