//! End-to-end CLI tests for the hostfetch binary.

#![allow(deprecated)]

mod support;
use support::socket_guard::start_mock_server_or_skip;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Builds a command isolated from the user's config file.
fn hostfetch(config_home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("hostfetch").unwrap();
    cmd.env("XDG_CONFIG_HOME", config_home.path())
        .env_remove("RUST_LOG");
    cmd
}

async fn mount_ok_and_missing(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/ok"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"<html>ok</html>"))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(server)
        .await;
}

/// Test that --help displays usage information and exits with code 0.
#[test]
fn test_binary_help_displays_usage() {
    let config_home = TempDir::new().unwrap();
    hostfetch(&config_home)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("per-host-limit"));
}

/// Test that --version displays version and exits with code 0.
#[test]
fn test_binary_version_displays_version() {
    let config_home = TempDir::new().unwrap();
    hostfetch(&config_home)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("hostfetch"));
}

/// Test that invalid flags cause non-zero exit.
#[test]
fn test_binary_invalid_flag_returns_error() {
    let config_home = TempDir::new().unwrap();
    hostfetch(&config_home)
        .arg("--invalid-flag")
        .assert()
        .failure()
        .stderr(predicate::str::contains("error"));
}

#[test]
fn test_binary_rejects_zero_per_host_limit() {
    let config_home = TempDir::new().unwrap();
    hostfetch(&config_home)
        .args(["-c", "0"])
        .assert()
        .failure();
}

#[test]
fn test_binary_empty_stdin_succeeds_without_output() {
    let config_home = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    hostfetch(&config_home)
        .arg("-o")
        .arg(out.path())
        .write_stdin("\n# nothing here\n")
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
    assert_eq!(std::fs::read_dir(out.path()).unwrap().count(), 0);
}

#[test]
fn test_binary_missing_input_file_fails_with_code_one() {
    let config_home = TempDir::new().unwrap();
    let missing = config_home.path().join("no-such-list.txt");
    let assert = hostfetch(&config_home)
        .arg("-f")
        .arg(&missing)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read URL list"));
    assert_eq!(assert.get_output().status.code(), Some(1));
}

#[test]
fn test_binary_invalid_config_file_fails() {
    let config_home = TempDir::new().unwrap();
    let config = config_home.path().join("custom.toml");
    std::fs::write(&config, "per_host_limit = 0\n").unwrap();
    hostfetch(&config_home)
        .arg("--config")
        .arg(&config)
        .write_stdin("")
        .assert()
        .failure()
        .stderr(predicate::str::contains("per_host_limit"));
}

#[tokio::test]
async fn test_binary_partial_failure_exit_code_two_and_summary() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    mount_ok_and_missing(&server).await;

    let config_home = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    let ok_url = format!("{}/ok", server.uri());
    let missing_url = format!("{}/missing", server.uri());

    let assert = hostfetch(&config_home)
        .arg("-q")
        .arg("-o")
        .arg(out.path())
        .arg(&ok_url)
        .arg(&missing_url)
        .assert()
        .failure();
    let output = assert.get_output();
    assert_eq!(output.status.code(), Some(2), "partial success must yield exit code 2");

    let stdout = String::from_utf8_lossy(&output.stdout);
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with(&format!("ok 0 {ok_url} ")));
    assert!(lines[0].ends_with("url_0.html"));
    assert!(lines[1].starts_with(&format!("err 1 {missing_url} ")));
    assert!(lines[1].contains("404"));

    assert_eq!(
        std::fs::read(out.path().join("url_0.html")).unwrap(),
        b"<html>ok</html>"
    );
    assert!(!out.path().join("url_1.html").exists());
}

#[tokio::test]
async fn test_binary_all_failed_exit_code_one() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    mount_ok_and_missing(&server).await;

    let config_home = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    let assert = hostfetch(&config_home)
        .arg("-q")
        .arg("-o")
        .arg(out.path())
        .arg(format!("{}/missing", server.uri()))
        .assert()
        .failure();
    assert_eq!(assert.get_output().status.code(), Some(1));
}

#[tokio::test]
async fn test_binary_file_input_with_duplicates_fetches_once() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .and(path("/page"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"page"))
        .expect(1)
        .mount(&server)
        .await;

    let config_home = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    let list = config_home.path().join("urls.txt");
    let url = format!("{}/page", server.uri());
    std::fs::write(&list, format!("# batch\n{url}\n\n{url}\n")).unwrap();

    let assert = hostfetch(&config_home)
        .arg("-q")
        .arg("-o")
        .arg(out.path())
        .arg("-f")
        .arg(&list)
        .assert()
        .success();

    let stdout = String::from_utf8_lossy(&assert.get_output().stdout).into_owned();
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with("ok 0 "));
    assert!(lines[1].starts_with(&format!("dup 1 {url} ")));
    assert!(lines[1].ends_with("(of 0)"));
    assert!(out.path().join("url_0.html").exists());
    assert!(!out.path().join("url_1.html").exists());
}

#[tokio::test]
async fn test_binary_json_summary() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    mount_ok_and_missing(&server).await;

    let config_home = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    let assert = hostfetch(&config_home)
        .args(["-q", "--json"])
        .arg("-o")
        .arg(out.path())
        .arg(format!("{}/ok", server.uri()))
        .arg(format!("{}/missing", server.uri()))
        .assert();

    let stdout = String::from_utf8_lossy(&assert.get_output().stdout).into_owned();
    let records: Vec<serde_json::Value> = stdout
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0]["idx"], 0);
    assert_eq!(records[0]["status"], "ok");
    assert_eq!(records[1]["status"], "error");
    assert_eq!(records[1]["error_kind"], "http_status");
}

#[tokio::test]
async fn test_binary_reads_defaults_from_xdg_config() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    mount_ok_and_missing(&server).await;

    let config_home = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    std::fs::create_dir_all(config_home.path().join("hostfetch")).unwrap();
    std::fs::write(
        config_home.path().join("hostfetch").join("config.toml"),
        format!("output_dir = \"{}\"\nverbosity = \"quiet\"\n", out.path().display()),
    )
    .unwrap();

    hostfetch(&config_home)
        .arg(format!("{}/ok", server.uri()))
        .assert()
        .success();
    assert!(out.path().join("url_0.html").exists());
}
