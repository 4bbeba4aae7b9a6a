use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use codepad_core::{CodepadConfig, SessionManager};
use codepad_server::{CodepadServer, ServerConfig};
use serde_json::{json, Value};
use std::time::Duration;
use tempfile::TempDir;
use tower::ServiceExt;

fn has_python() -> bool {
    which::which("python3").is_ok()
}

fn app(root: &TempDir) -> (Router, SessionManager) {
    let mut config = CodepadConfig::default();
    config.execution.workspace_root = root.path().to_path_buf();
    config.execution.execution_timeout_secs = 2;
    config.sessions.initial_capture_ms = 300;
    config.sessions.settle_delay_ms = 300;
    config.sessions.cleanup_grace_ms = 2000;
    config.sessions.kill_grace_ms = 500;
    let manager = SessionManager::new(&config);
    let router = CodepadServer::new(manager.clone(), ServerConfig::from(&config.server)).build_router();
    (router, manager)
}

async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), 1024 * 1024).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn test_interactive_session_over_http() {
    if !has_python() {
        eprintln!("skipping: python3 not installed");
        return;
    }
    let root = TempDir::new().unwrap();
    let (app, _manager) = app(&root);
    let code = "name = input('Name: ')\nprint('Hello, ' + name)\ninput('Again: ')\n";

    let (status, started) = call(
        &app,
        "POST",
        "/execute/start",
        Some(json!({ "code": code, "language": "Python" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(started["waitingForInput"], true);
    let session_id = started["sessionId"].as_str().unwrap().to_string();

    let (status, reply) = call(
        &app,
        "POST",
        "/api/execute/input",
        Some(json!({ "sessionId": session_id, "input": "Ada" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(reply["output"].as_str().unwrap().contains("Hello, Ada"), "{}", reply);
    assert_eq!(reply["waitingForInput"], true);

    let (status, polled) = call(&app, "GET", &format!("/execute/output/{}", session_id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(polled["output"], reply["output"]);

    let (status, killed) = call(
        &app,
        "POST",
        "/execute/kill",
        Some(json!({ "sessionId": session_id })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(killed["success"], true);

    let (status, _) = call(&app, "GET", &format!("/execute/output/{}", session_id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(std::fs::read_dir(root.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_input_after_exit_is_gone() {
    if !has_python() {
        eprintln!("skipping: python3 not installed");
        return;
    }
    let root = TempDir::new().unwrap();
    let (app, manager) = app(&root);

    let (_, started) = call(
        &app,
        "POST",
        "/execute/start",
        Some(json!({ "code": "print('done')", "language": "py" })),
    )
    .await;
    let session_id = started["sessionId"].as_str().unwrap().to_string();
    tokio::time::sleep(Duration::from_millis(500)).await;

    let (status, body) = call(
        &app,
        "POST",
        "/execute/input",
        Some(json!({ "sessionId": session_id, "input": "late" })),
    )
    .await;
    assert_eq!(status, StatusCode::GONE);
    assert_eq!(body["type"], "session_terminated");

    manager.shutdown().await;
}

#[tokio::test]
async fn test_run_once_returns_combined_output() {
    if !has_python() {
        eprintln!("skipping: python3 not installed");
        return;
    }
    let root = TempDir::new().unwrap();
    let (app, _manager) = app(&root);

    let (status, body) = call(
        &app,
        "POST",
        "/execute/once",
        Some(json!({ "code": "print(sum(map(int, input().split())))", "language": "python", "stdin": "2 3\n" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["stdout"], "5\n");
    assert_eq!(body["exitCode"], 0);

    let (status, body) = call(
        &app,
        "POST",
        "/execute/once",
        Some(json!({ "code": "while True: pass", "language": "python" })),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["type"], "timeout");
    assert_eq!(std::fs::read_dir(root.path()).unwrap().count(), 0);
}
