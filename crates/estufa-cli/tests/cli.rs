//! End-to-end checks of the `estufa` binary.

use std::process::{Command, Output};

fn estufa(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_estufa"))
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to run estufa")
}

fn stdout_json(out: &Output) -> serde_json::Value {
    assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));
    serde_json::from_slice(&out.stdout).expect("stdout is not JSON")
}

// ---------------------------------------------------------------------------
// generate
// ---------------------------------------------------------------------------

#[test]
fn generate_array_has_both_installations() {
    let v = stdout_json(&estufa(&["generate", "--seed", "7"]));
    let list = v.as_array().unwrap();
    assert_eq!(list.len(), 2);
    assert_eq!(list[0]["id"], "estufa_test");
    assert_eq!(list[0]["sensors"].as_array().unwrap().len(), 8);
}

#[test]
fn generate_wrapped_and_single_shapes() {
    let wrapped = stdout_json(&estufa(&["generate", "--seed", "7", "--shape", "wrapped"]));
    assert_eq!(wrapped["estufas"].as_array().unwrap().len(), 2);

    let single = stdout_json(&estufa(&["generate", "--seed", "7", "--shape", "single"]));
    assert_eq!(single["id"], "estufa_test");
}

#[test]
fn generate_rejects_unknown_shape() {
    let out = estufa(&["generate", "--shape", "xml"]);
    assert!(!out.status.success());
}

// ---------------------------------------------------------------------------
// list
// ---------------------------------------------------------------------------

#[test]
fn offline_list_json_is_synthetic() {
    let v = stdout_json(&estufa(&["list", "--offline", "--json"]));
    assert_eq!(v["source"], "synthetic");
    let rows = v["estufas"].as_array().unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["sensor_count"], 8);
    let avg = rows[0]["humidity_average"].as_f64().unwrap();
    assert!((0.0..=100.0).contains(&avg));
}

#[test]
fn offline_list_table_names_installations() {
    let out = estufa(&["list", "--offline"]);
    assert!(out.status.success());
    let text = String::from_utf8_lossy(&out.stdout);
    assert!(text.contains("[synthetic data]"));
    assert!(text.contains("estufa_test"));
    assert!(text.contains("estufa_1"));
}

#[test]
fn list_with_missing_config_fails() {
    let out = estufa(&["list", "--offline", "--config", "/nonexistent/estufa.json"]);
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("/nonexistent/estufa.json"));
}

#[test]
fn monitor_rejects_unknown_window() {
    let out = estufa(&["monitor", "--offline", "--window", "7m"]);
    assert!(!out.status.success());
}
