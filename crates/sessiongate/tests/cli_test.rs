//! Integration tests for the `sessiongate` CLI binary.
//!
//! These tests cover argument parsing, help output, shell completions,
//! config handling and the exit codes of `check`, using temporary config
//! files and a local mock server instead of real providers.
#![allow(clippy::unwrap_used)]

use std::path::{Path, PathBuf};

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ── Helpers ─────────────────────────────────────────────────────────

/// Build a [`Command`] for the `sessiongate` binary with env isolation.
///
/// Clears all `SESSIONGATE_*` env vars and points config directories at
/// `home` so tests never touch the user's real configuration.
fn sessiongate_cmd(home: &Path) -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("sessiongate");
    cmd.env("HOME", home)
        .env("XDG_CONFIG_HOME", home)
        .env("NO_COLOR", "1")
        .env_remove("RUST_LOG")
        .env_remove("SESSIONGATE_CONFIG")
        .env_remove("SESSIONGATE_OUTPUT")
        .env_remove("SESSIONGATE_GATE__RECHECK_DELAY_SECS")
        .env_remove("SESSIONGATE_GATE__ACCOUNTING");
    cmd
}

/// Concatenate stdout + stderr from a command output for flexible matching.
fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

/// Write `body` as the config file inside `dir` and return its path.
fn write_config(dir: &TempDir, body: &str) -> PathBuf {
    let path = dir.path().join("config.toml");
    std::fs::write(&path, body).unwrap();
    path
}

fn provider_config(url: &str) -> String {
    format!(
        r#"
[gate]
recheck_delay_secs = 1

[providers."gc.com"]
url = "{url}"
username = "cacher"
password_env = "SESSIONGATE_TEST_GC_PASSWORD"
timeout = 2
"#
    )
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let home = TempDir::new().unwrap();
    let output = sessiongate_cmd(home.path()).output().unwrap();
    assert_eq!(output.status.code(), Some(2), "Expected exit code 2");
    let text = combined_output(&output);
    assert!(text.contains("Usage"), "Expected 'Usage' in output:\n{text}");
}

#[test]
fn test_help_flag() {
    let home = TempDir::new().unwrap();
    sessiongate_cmd(home.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(
            predicate::str::contains("check")
                .and(predicate::str::contains("watch"))
                .and(predicate::str::contains("providers")),
        );
}

#[test]
fn test_version_flag() {
    let home = TempDir::new().unwrap();
    sessiongate_cmd(home.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("sessiongate"));
}

#[test]
fn test_unknown_output_format_is_usage_error() {
    let home = TempDir::new().unwrap();
    sessiongate_cmd(home.path())
        .args(["--output", "yaml", "providers"])
        .assert()
        .code(2);
}

// ── Shell completions ───────────────────────────────────────────────

#[test]
fn test_completions_bash() {
    let home = TempDir::new().unwrap();
    sessiongate_cmd(home.path())
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty().not());
}

#[test]
fn test_completions_zsh() {
    let home = TempDir::new().unwrap();
    sessiongate_cmd(home.path())
        .args(["completions", "zsh"])
        .assert()
        .success()
        .stdout(predicate::str::contains("sessiongate"));
}

// ── Config ──────────────────────────────────────────────────────────

#[test]
fn test_config_path_honors_flag() {
    let home = TempDir::new().unwrap();
    let custom = home.path().join("custom.toml");
    sessiongate_cmd(home.path())
        .arg("--config")
        .arg(&custom)
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("custom.toml"));
}

#[test]
fn test_config_show_masks_password() {
    let home = TempDir::new().unwrap();
    let cfg = write_config(
        &home,
        r#"
[providers."gc.com"]
url = "https://www.geocaching.com"
username = "cacher"
password = "hunter2"
"#,
    );

    sessiongate_cmd(home.path())
        .arg("--config")
        .arg(&cfg)
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("password = \"****\"")
                .and(predicate::str::contains("hunter2").not()),
        );
}

#[test]
fn test_config_show_applies_env_override() {
    let home = TempDir::new().unwrap();
    let cfg = write_config(&home, "");

    sessiongate_cmd(home.path())
        .env("SESSIONGATE_GATE__RECHECK_DELAY_SECS", "42")
        .arg("--config")
        .arg(&cfg)
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("recheck_delay_secs = 42"));
}

#[test]
fn test_set_password_for_unknown_provider() {
    let home = TempDir::new().unwrap();
    let cfg = write_config(&home, "");

    let output = sessiongate_cmd(home.path())
        .arg("--config")
        .arg(&cfg)
        .args(["config", "set-password", "--provider", "oc.de"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("oc.de"));
}

// ── Providers ───────────────────────────────────────────────────────

#[test]
fn test_providers_plain_lists_names() {
    let home = TempDir::new().unwrap();
    let cfg = write_config(
        &home,
        r#"
[providers."oc.de"]
url = "https://www.opencaching.de"
enabled = false

[providers."gc.com"]
url = "https://www.geocaching.com"
"#,
    );

    sessiongate_cmd(home.path())
        .arg("--config")
        .arg(&cfg)
        .args(["--output", "plain", "providers"])
        .assert()
        .success()
        .stdout("gc.com\noc.de\n");
}

#[test]
fn test_providers_json_reports_password_source() {
    let home = TempDir::new().unwrap();
    let cfg = write_config(&home, &provider_config("https://www.geocaching.com"));

    let output = sessiongate_cmd(home.path())
        .arg("--config")
        .arg(&cfg)
        .args(["--output", "json", "providers"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json[0]["name"], "gc.com");
    assert_eq!(json[0]["password_source"], "env");
}

// ── Check ───────────────────────────────────────────────────────────

#[test]
fn test_check_without_providers_is_usage_error() {
    let home = TempDir::new().unwrap();
    let cfg = write_config(&home, "");

    let output = sessiongate_cmd(home.path())
        .arg("--config")
        .arg(&cfg)
        .args(["--connectivity", "offline", "check"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("No session providers"));
}

#[test]
fn test_check_rejects_unknown_accounting() {
    let home = TempDir::new().unwrap();
    let mut body = provider_config("https://www.geocaching.com");
    body = body.replace("recheck_delay_secs = 1", "accounting = \"sometimes\"");
    let cfg = write_config(&home, &body);

    sessiongate_cmd(home.path())
        .env("SESSIONGATE_TEST_GC_PASSWORD", "secret")
        .arg("--config")
        .arg(&cfg)
        .args(["--connectivity", "offline", "check"])
        .assert()
        .code(2);
}

#[test]
fn test_check_offline_reports_issue() {
    let home = TempDir::new().unwrap();
    let cfg = write_config(&home, &provider_config("https://www.geocaching.com"));

    sessiongate_cmd(home.path())
        .env("SESSIONGATE_TEST_GC_PASSWORD", "secret")
        .arg("--config")
        .arg(&cfg)
        .args(["--connectivity", "offline", "--output", "plain", "check"])
        .assert()
        .code(3)
        .stdout("issue\n");
}

#[test]
fn test_check_unreachable_provider_reports_issue_after_recheck() {
    let home = TempDir::new().unwrap();
    let cfg = write_config(&home, &provider_config("http://127.0.0.1:1"));

    sessiongate_cmd(home.path())
        .env("SESSIONGATE_TEST_GC_PASSWORD", "secret")
        .arg("--config")
        .arg(&cfg)
        .args(["--connectivity", "online", "--output", "plain", "check"])
        .assert()
        .code(3)
        .stdout("issue\n");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_check_succeeds_when_login_accepted() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/login"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let home = TempDir::new().unwrap();
    let cfg = write_config(&home, &provider_config(&server.uri()));
    let home_path = home.path().to_path_buf();

    let output = tokio::task::spawn_blocking(move || {
        sessiongate_cmd(&home_path)
            .env("SESSIONGATE_TEST_GC_PASSWORD", "secret")
            .arg("--config")
            .arg(&cfg)
            .args(["--connectivity", "online", "--output", "json", "check"])
            .output()
            .unwrap()
    })
    .await
    .unwrap();

    assert_eq!(output.status.code(), Some(0), "{}", combined_output(&output));
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["login_issue"], false);
    assert_eq!(json["state"], "succeeded");
    assert_eq!(json["dispatched"], 1);
    assert_eq!(json["providers"][0]["logged_in"], true);
}
