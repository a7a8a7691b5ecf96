//! Tool server process launch against small shell scripts.
#![cfg(unix)]

use std::time::Duration;

use toolpilot::error::PilotError;
use toolpilot::mcp::{ServerLauncher, ServerSpec};

fn shell(script: &str) -> ServerSpec {
    ServerSpec::new("sh", vec!["-c".into(), script.into()])
        .with_startup_timeout(Duration::from_secs(5))
}

#[tokio::test]
async fn ready_marker_releases_launch() {
    let spec = shell("echo 'loading credentials'; echo 'SERVER_READY'; sleep 5")
        .with_ready_marker("SERVER_READY");
    let server = ServerLauncher::new(spec).launch().await.unwrap();

    assert!(server.id().is_some());
}

#[tokio::test]
async fn exit_before_marker_reports_stderr() {
    let spec = shell("echo 'token.json is not writable' >&2; exit 3")
        .with_ready_marker("SERVER_READY");
    let err = ServerLauncher::new(spec).launch().await.unwrap_err();

    match err {
        PilotError::ServerStartup(message) => {
            assert!(message.contains("closed stdout"), "{message}");
            assert!(message.contains("token.json is not writable"), "{message}");
        }
        other => panic!("expected startup failure, got {other:?}"),
    }
}

#[tokio::test]
async fn silent_server_hits_startup_timeout() {
    let spec = shell("sleep 10")
        .with_ready_marker("SERVER_READY")
        .with_startup_timeout(Duration::from_millis(300));
    let err = ServerLauncher::new(spec).launch().await.unwrap_err();

    assert!(matches!(err, PilotError::ServerStartup(msg) if msg.contains("SERVER_READY")));
}

#[tokio::test]
async fn connect_fails_when_server_never_speaks_mcp() {
    let result = toolpilot::mcp::connect(shell("exit 0")).await;

    assert!(result.is_err());
}

#[tokio::test]
async fn silent_handshake_hits_startup_timeout() {
    let spec = shell("sleep 30").with_startup_timeout(Duration::from_millis(300));
    let result = tokio::time::timeout(Duration::from_secs(5), toolpilot::mcp::connect(spec))
        .await
        .expect("connect should give up on its own");

    match result {
        Err(PilotError::ServerStartup(message)) => {
            assert!(message.contains("MCP initialize timed out"), "{message}");
        }
        Err(other) => panic!("expected startup failure, got {other:?}"),
        Ok(_) => panic!("handshake against a silent server should fail"),
    }
}
