//! Router behavior, driven in-process through `tower::ServiceExt::oneshot`.

use axum::body::{to_bytes, Body};
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use relay_core::{router, ManualClock, RelayConfig, RelayService};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

fn app() -> (Router, RelayService, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(1_000_000));
    let service = RelayService::with_clock(RelayConfig::default(), clock.clone());
    (router(service.clone()), service, clock)
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => request
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

async fn register(app: &Router, id: Value, name: &str) {
    let (status, body) = send(
        app,
        Method::POST,
        "/api",
        Some(json!({ "action": "register", "userid": id, "username": name, "gameId": 42 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "success": true }));
}

#[tokio::test]
async fn test_banner() {
    let (app, _, _) = app();
    let response = app
        .oneshot(Request::get("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert!(String::from_utf8_lossy(&bytes).contains("/api/players"));
}

#[tokio::test]
async fn test_register_and_list_players() {
    let (app, _, clock) = app();
    register(&app, json!(100), "Alice").await;

    let (status, body) = send(&app, Method::GET, "/api/players", None).await;
    assert_eq!(status, StatusCode::OK);
    let players = body["players"].as_array().unwrap();
    assert_eq!(players.len(), 1);
    assert_eq!(players[0]["userid"], "100");
    assert_eq!(players[0]["username"], "Alice");
    assert_eq!(players[0]["gameId"], "42");
    assert_eq!(players[0]["online"], true);

    clock.advance(Duration::from_secs(15));
    let (_, body) = send(&app, Method::GET, "/api/players", None).await;
    assert_eq!(body["players"][0]["online"], false);
}

#[tokio::test]
async fn test_numeric_metadata_and_asset_id() {
    let (app, service, _) = app();

    let (status, body) = send(
        &app,
        Method::POST,
        "/api",
        Some(json!({
            "action": "register",
            "userid": 100,
            "username": "Alice",
            "gameId": 920587237,
            "jobId": "7f3c-11"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "success": true }));

    let (_, body) = send(&app, Method::GET, "/api/players", None).await;
    assert_eq!(body["players"][0]["gameId"], "920587237");
    assert_eq!(body["players"][0]["jobId"], "7f3c-11");

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/command",
        Some(json!({ "userid": 100, "command": "playsound", "assetId": 123456 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = send(&app, Method::GET, "/api?userid=100", None).await;
    assert_eq!(body["type"], "play_asset");
    assert_eq!(body["assetId"], "123456");
    assert_eq!(service.stats().await.pending_commands, 0);
}

#[tokio::test]
async fn test_heartbeat_unknown_client() {
    let (app, _, _) = app();
    let (status, body) = send(
        &app,
        Method::POST,
        "/api",
        Some(json!({ "action": "heartbeat", "userid": "ghost" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "success": false }));
}

#[tokio::test]
async fn test_client_action_validation() {
    let (app, _, _) = app();

    let (status, body) = send(&app, Method::POST, "/api", Some(json!({ "action": "register" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "success": false, "error": "userid required" }));

    let (status, _) = send(
        &app,
        Method::POST,
        "/api",
        Some(json!({ "action": "dance", "userid": "100" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_legacy_command_round_trip() {
    let (app, _, _) = app();
    register(&app, json!("100"), "Alice").await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/command",
        Some(json!({ "userid": 100, "command": "freeze", "reason": "spamming" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "success": true, "count": 1 }));

    let (_, body) = send(&app, Method::GET, "/api?userid=100", None).await;
    assert_eq!(body["command"], "freeze");
    assert_eq!(body["type"], "action");
    assert_eq!(body["reason"], "spamming");

    let (_, body) = send(&app, Method::GET, "/api?userid=100", None).await;
    assert_eq!(body, json!({}));
}

#[tokio::test]
async fn test_typed_fan_out_and_stats() {
    let (app, _, _) = app();
    register(&app, json!("100"), "Alice").await;
    register(&app, json!("200"), "Bob").await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/command",
        Some(json!({
            "userids": ["100", "200", "100"],
            "command": { "type": "teleport", "x": 1.0, "y": 2.0, "z": 3.0 }
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 2);

    let (_, stats) = send(&app, Method::GET, "/api/stats", None).await;
    assert_eq!(
        stats,
        json!({ "totalPlayers": 2, "onlinePlayers": 2, "pendingCommands": 2 })
    );

    let (_, body) = send(&app, Method::GET, "/api?userid=200", None).await;
    assert_eq!(body["type"], "teleport");
    assert_eq!(body["y"], 2.0);
}

#[tokio::test]
async fn test_command_rejections() {
    let (app, service, _) = app();

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/command",
        Some(json!({ "userids": [], "command": "kick" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/command",
        Some(json!({ "userid": "100" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/command",
        Some(json!({ "userids": ["100"], "command": { "type": "walk_speed", "speed": -1.0 } })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert_eq!(service.stats().await.pending_commands, 0);
}

#[tokio::test]
async fn test_poll_requires_userid() {
    let (app, _, _) = app();
    let (status, body) = send(&app, Method::GET, "/api", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "userid required");
}

#[tokio::test]
async fn test_delete_routes() {
    let (app, _, _) = app();
    register(&app, json!("100"), "Alice").await;
    register(&app, json!("200"), "Bob").await;
    register(&app, json!("300"), "Carol").await;

    let (_, body) = send(&app, Method::DELETE, "/api/players/300", None).await;
    assert_eq!(body, json!({ "success": true }));
    let (_, body) = send(&app, Method::DELETE, "/api/players/300", None).await;
    assert_eq!(body, json!({ "success": false }));

    let delete = json!({ "userids": ["100", 200] });
    let (_, body) = send(&app, Method::POST, "/api/players/delete", Some(delete.clone())).await;
    assert_eq!(body, json!({ "success": true, "count": 2 }));
    let (_, body) = send(&app, Method::POST, "/api/players/delete", Some(delete)).await;
    assert_eq!(body, json!({ "success": true, "count": 0 }));
}

#[tokio::test]
async fn test_chat_exec_result_and_logs() {
    let (app, _, _) = app();
    register(&app, json!("100"), "Alice").await;

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/chat",
        Some(json!({ "userid": "100", "sender": "admin", "message": "hello", "isAdmin": true })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let (_, chat) = send(&app, Method::GET, "/api/chat/100", None).await;
    assert_eq!(chat[0]["message"], "hello");
    assert_eq!(chat[0]["isAdmin"], true);

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/exec-result",
        Some(json!({ "userid": 100, "success": true, "output": "done" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let (_, result) = send(&app, Method::GET, "/api/exec-result/100", None).await;
    assert_eq!(result["success"], true);
    assert_eq!(result["output"], "done");
    let (_, result) = send(&app, Method::GET, "/api/exec-result/100", None).await;
    assert_eq!(result, json!({}));

    let (_, logs) = send(&app, Method::GET, "/api/logs/100", None).await;
    let actions: Vec<&str> = logs
        .as_array()
        .unwrap()
        .iter()
        .map(|entry| entry["action"].as_str().unwrap())
        .collect();
    assert_eq!(actions, vec!["succeeded", "admin_message", "registered"]);
}

#[tokio::test]
async fn test_health() {
    let (app, _, _) = app();
    register(&app, json!("100"), "Alice").await;

    let (status, body) = send(&app, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["clientCount"], 1);
    assert_eq!(body["onlineCount"], 1);
    assert_eq!(body["pendingCommandCount"], 0);
}

#[tokio::test]
async fn test_unknown_reads_are_empty() {
    let (app, _, _) = app();
    let (_, chat) = send(&app, Method::GET, "/api/chat/nobody", None).await;
    assert_eq!(chat, json!([]));
    let (_, logs) = send(&app, Method::GET, "/api/logs/nobody", None).await;
    assert_eq!(logs, json!([]));
}
