//! Integration tests for the `clockgate` CLI binary.
//!
//! Parsing, help and completions run without any terminal. Gateway-bound
//! commands run against wiremock terminals described by a temp config file.
#![allow(clippy::unwrap_used)]

use std::io::Write;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ── Helpers ─────────────────────────────────────────────────────────

/// Build a command for the `clockgate` binary with env isolation.
///
/// Clears `CLOCKGATE_*` variables and points config directories at a
/// nonexistent path so tests never touch the user's real configuration.
fn clockgate_cmd() -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("clockgate");
    cmd.env("HOME", "/tmp/clockgate-test-nonexistent")
        .env("XDG_CONFIG_HOME", "/tmp/clockgate-test-nonexistent")
        .env_remove("CLOCKGATE_CONFIG")
        .env_remove("CLOCKGATE_OUTPUT")
        .env_remove("CLOCKGATE_DEVICE_PASSWORD")
        .env_remove("RUST_LOG");
    cmd
}

/// Concatenate stdout + stderr from a command output for flexible matching.
fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

/// Write a config describing one NORTH terminal per address.
fn fleet_config(addresses: &[String]) -> tempfile::NamedTempFile {
    let mut toml = String::from(
        "[defaults]\nscheme = \"http\"\ntimeout_ms = 5000\n\n\
         [credentials]\nlogin = \"admin\"\npassword = \"secret\"\nkeyring = false\n",
    );
    for (i, address) in addresses.iter().enumerate() {
        toml.push_str(&format!(
            "\n[[devices]]\nid = \"north-{n:02}\"\nsite = \"NORTH\"\n\
             label = \"REP {n:02}\"\naddress = \"{address}\"\n",
            n = i + 1
        ));
    }
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    file.write_all(toml.as_bytes()).unwrap();
    file
}

/// A terminal that accepts any login with session `tok`.
async fn terminal() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/login.fcgi"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "session": "tok" })))
        .mount(&server)
        .await;
    server
}

/// Run the binary off the async runtime so the mock servers keep serving.
async fn run(mut cmd: assert_cmd::Command) -> std::process::Output {
    tokio::task::spawn_blocking(move || cmd.output().unwrap())
        .await
        .unwrap()
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let output = clockgate_cmd().output().unwrap();
    assert_eq!(output.status.code(), Some(2), "Expected exit code 2");
    let text = combined_output(&output);
    assert!(text.contains("Usage"), "Expected 'Usage' in output:\n{text}");
}

#[test]
fn test_help_flag() {
    clockgate_cmd().arg("--help").assert().success().stdout(
        predicate::str::contains("time-clock")
            .and(predicate::str::contains("health"))
            .and(predicate::str::contains("users"))
            .and(predicate::str::contains("coils")),
    );
}

#[test]
fn test_version_flag() {
    clockgate_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("clockgate"));
}

#[test]
fn test_users_help_lists_mutations() {
    clockgate_cmd().args(["users", "--help"]).assert().success().stdout(
        predicate::str::contains("update-photo")
            .and(predicate::str::contains("remove-photo"))
            .and(predicate::str::contains("add")),
    );
}

// ── Shell completions ───────────────────────────────────────────────

#[test]
fn test_completions_bash() {
    clockgate_cmd()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty().not());
}

#[test]
fn test_completions_zsh() {
    clockgate_cmd()
        .args(["completions", "zsh"])
        .assert()
        .success()
        .stdout(predicate::str::contains("#compdef"));
}

#[test]
fn test_completions_fish() {
    clockgate_cmd()
        .args(["completions", "fish"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty().not());
}

// ── Error cases ─────────────────────────────────────────────────────

#[test]
fn test_invalid_subcommand() {
    let output = clockgate_cmd().arg("foobar").output().unwrap();
    assert!(!output.status.success(), "Expected failure for invalid subcommand");
    let text = combined_output(&output);
    assert!(
        text.contains("unrecognized") || text.contains("foobar"),
        "Expected error mentioning invalid subcommand:\n{text}"
    );
}

#[test]
fn test_invalid_output_format() {
    let output = clockgate_cmd()
        .args(["--output", "xml", "devices"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn test_mutation_requires_payload() {
    let output = clockgate_cmd()
        .args(["users", "update", "--site", "NORTH"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    let text = combined_output(&output);
    assert!(text.contains("--data") || text.contains("--from-file"), "{text}");
}

#[test]
fn test_health_without_devices() {
    let output = clockgate_cmd().arg("health").output().unwrap();
    assert_eq!(output.status.code(), Some(1));
    assert!(combined_output(&output).contains("No terminals configured"));
}

// ── Config ──────────────────────────────────────────────────────────

#[test]
fn test_config_path_honours_flag() {
    clockgate_cmd()
        .args(["--config", "/tmp/elsewhere/clockgate.toml", "config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("/tmp/elsewhere/clockgate.toml"));
}

#[test]
fn test_config_show_masks_password() {
    let file = fleet_config(&["10.0.1.10".into()]);
    clockgate_cmd()
        .args(["--config", file.path().to_str().unwrap(), "config", "show"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("********")
                .and(predicate::str::contains("secret").not())
                .and(predicate::str::contains("north-01")),
        );
}

#[test]
fn test_devices_plain_lists_ids() {
    let file = fleet_config(&["10.0.1.10".into(), "10.0.1.11".into()]);
    clockgate_cmd()
        .args(["--config", file.path().to_str().unwrap(), "-o", "plain", "devices"])
        .assert()
        .success()
        .stdout("north-01\nnorth-02\n");
}

#[test]
fn test_devices_unknown_site() {
    let file = fleet_config(&["10.0.1.10".into()]);
    let output = clockgate_cmd()
        .args(["--config", file.path().to_str().unwrap(), "devices", "--site", "SOUTH"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(4));
    assert!(combined_output(&output).contains("no devices configured for site SOUTH"));
}

#[test]
fn test_invalid_payload_exits_with_usage() {
    let file = fleet_config(&["10.0.1.10".into()]);
    let output = clockgate_cmd()
        .args(["--config", file.path().to_str().unwrap()])
        .args(["users", "update", "--site", "NORTH", "--data", r#"{"name":"Ana"}"#])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("CPF is required"));
}

// ── Against mock terminals ──────────────────────────────────────────

#[tokio::test(flavor = "multi_thread")]
async fn test_health_json_against_terminals() {
    let (a, b) = (terminal().await, terminal().await);
    Mock::given(method("POST"))
        .and(path("/session_is_valid.fcgi"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&a)
        .await;
    Mock::given(method("POST"))
        .and(path("/session_is_valid.fcgi"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&b)
        .await;
    let file = fleet_config(&[a.address().to_string(), b.address().to_string()]);

    let mut cmd = clockgate_cmd();
    cmd.args(["--config", file.path().to_str().unwrap(), "-o", "json", "health"]);
    let output = run(cmd).await;

    assert!(output.status.success(), "{}", combined_output(&output));
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["total"], 2);
    assert_eq!(report["online"], 1);
    assert_eq!(report["data"][0]["id"], "north-01");
    assert_eq!(report["data"][0]["status"], "online");
    assert_eq!(report["data"][1]["status"], "offline");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_partial_mutation_exits_nonzero() {
    let (a, b) = (terminal().await, terminal().await);
    Mock::given(method("POST"))
        .and(path("/remove_users.fcgi"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&a)
        .await;
    Mock::given(method("POST"))
        .and(path("/remove_users.fcgi"))
        .respond_with(ResponseTemplate::new(500).set_body_string("db locked"))
        .mount(&b)
        .await;
    let file = fleet_config(&[a.address().to_string(), b.address().to_string()]);

    let mut cmd = clockgate_cmd();
    cmd.args(["--config", file.path().to_str().unwrap(), "-o", "json"])
        .args(["users", "remove", "--site", "north", "--data", r#"{"cpf":"123"}"#]);
    let output = run(cmd).await;

    assert_eq!(output.status.code(), Some(1));
    let summary: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(summary["action"], "remove-user");
    assert_eq!(summary["success"], 1);
    assert_eq!(summary["failure"], 1);
    assert_eq!(summary["results"][1]["statusCode"], 500);
    assert!(combined_output(&output).contains("1 of 2 terminals failed"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_user_count_plain() {
    let server = terminal().await;
    Mock::given(method("POST"))
        .and(path("/count_users.fcgi"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "count": 17 })))
        .mount(&server)
        .await;
    let file = fleet_config(&[server.address().to_string()]);

    let mut cmd = clockgate_cmd();
    cmd.args(["--config", file.path().to_str().unwrap(), "-o", "plain", "count", "-s", "NORTH"]);
    let output = run(cmd).await;

    assert!(output.status.success(), "{}", combined_output(&output));
    assert_eq!(String::from_utf8_lossy(&output.stdout), "17\n");
}
