//! Integration tests for exec mode streaming.


use assert_cmd::cargo::cargo_bin_cmd;
use fixtures::{error_sse, sse_response, text_sse};
use predicates::prelude::*;
use tempfile::TempDir;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer};

fn can_bind_localhost() -> bool {
    std::net::TcpListener::bind("127.0.0.1:0").is_ok()
}

#[tokio::test]
async fn test_exec_streams_text_to_stdout() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let tern_home = TempDir::new().unwrap();
    let temp_dir = TempDir::new().unwrap();
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .and(header("x-api-key", "test-api-key"))
        .and(header("anthropic-version", "2023-06-01"))
        .respond_with(sse_response(&text_sse("Hello from the agent.")))
        .expect(1)
        .mount(&mock_server)
        .await;

    cargo_bin_cmd!("tern")
        .env("TERN_HOME", tern_home.path())
        .env("TERN_BLOCK_REAL_API", "1")
        .env("ANTHROPIC_API_KEY", "test-api-key")
        .env("ANTHROPIC_BASE_URL", mock_server.uri())
        .args([
            "--root",
            temp_dir.path().to_str().unwrap(),
            "exec",
            "-p",
            "Say hello",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Hello from the agent."));
}

#[tokio::test]
async fn test_exec_mid_stream_error_exits_nonzero() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let tern_home = TempDir::new().unwrap();
    let temp_dir = TempDir::new().unwrap();
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(sse_response(&error_sse(
            "overloaded_error",
            "API is temporarily overloaded",
        )))
        .expect(1)
        .mount(&mock_server)
        .await;

    cargo_bin_cmd!("tern")
        .env("TERN_HOME", tern_home.path())
        .env("TERN_BLOCK_REAL_API", "1")
        .env("ANTHROPIC_API_KEY", "test-api-key")
        .env("ANTHROPIC_BASE_URL", mock_server.uri())
        .args([
            "--root",
            temp_dir.path().to_str().unwrap(),
            "exec",
            "-p",
            "Say hello",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("api_error"))
        .stderr(predicate::str::contains("overloaded_error"));
}

#[tokio::test]
async fn test_exec_http_error_exits_nonzero() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let tern_home = TempDir::new().unwrap();
    let temp_dir = TempDir::new().unwrap();
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(wiremock::ResponseTemplate::new(401).set_body_string(
            r#"{"type":"error","error":{"type":"authentication_error","message":"invalid x-api-key"}}"#,
        ))
        .expect(1)
        .mount(&mock_server)
        .await;

    cargo_bin_cmd!("tern")
        .env("TERN_HOME", tern_home.path())
        .env("TERN_BLOCK_REAL_API", "1")
        .env("ANTHROPIC_API_KEY", "bad-key")
        .env("ANTHROPIC_BASE_URL", mock_server.uri())
        .args([
            "--root",
            temp_dir.path().to_str().unwrap(),
            "exec",
            "-p",
            "Say hello",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid x-api-key"));
}

#[tokio::test]
async fn test_exec_missing_api_key_fails() {
    let tern_home = TempDir::new().unwrap();
    let temp_dir = TempDir::new().unwrap();

    cargo_bin_cmd!("tern")
        .env("TERN_HOME", tern_home.path())
        .env("TERN_BLOCK_REAL_API", "1")
        .env_remove("ANTHROPIC_API_KEY")
        .args([
            "--root",
            temp_dir.path().to_str().unwrap(),
            "exec",
            "-p",
            "Say hello",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("ANTHROPIC_API_KEY"));
}
