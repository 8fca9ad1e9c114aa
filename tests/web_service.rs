//! 本地 HTTP 后台服务集成测试

#![cfg(feature = "web")]

use std::sync::Arc;

use serde_json::{json, Value};

use subtrans::messaging::BackgroundService;
use subtrans::web::{create_router, AppState, HealthResponse};

#[allow(dead_code)]
mod common {
    include!("common/mod.rs");
}

use common::{MockBackend, MockReply};

async fn spawn_server() -> String {
    spawn_server_with(MockReply::Fixed("Merhaba".to_string())).await
}

async fn spawn_server_with(reply: MockReply) -> String {
    let service = BackgroundService::new(MockBackend::new(reply));
    let app = create_router(Arc::new(AppState { service }));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{}", address)
}

#[tokio::test]
async fn test_message_endpoint() {
    let base = spawn_server().await;

    let response = reqwest::Client::new()
        .post(format!("{}/api/message", base))
        .body(json!({"action": "translate", "text": "Hello", "targetLang": "tr"}).to_string())
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 200);
    let body: Value = serde_json::from_str(&response.text().await.unwrap()).unwrap();
    assert_eq!(body, json!({"success": true, "translation": "Merhaba"}));
}

#[tokio::test]
async fn test_message_endpoint_rejects_bad_requests() {
    let base = spawn_server().await;

    let response = reqwest::Client::new()
        .post(format!("{}/api/message", base))
        .body("{\"action\":\"translate\"")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 400);
    let body: Value = serde_json::from_str(&response.text().await.unwrap()).unwrap();
    assert_eq!(body["success"], json!(false));
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_message_endpoint_reports_backend_failure() {
    let base = spawn_server_with(MockReply::Fail).await;

    let response = reqwest::Client::new()
        .post(format!("{}/api/message", base))
        .body(json!({"action": "translate", "text": "Hello", "targetLang": "tr"}).to_string())
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 502);
    let body: Value = serde_json::from_str(&response.text().await.unwrap()).unwrap();
    assert_eq!(body["success"], json!(false));
    assert!(body.get("translation").is_none());
}

#[tokio::test]
async fn test_health_endpoint() {
    let base = spawn_server().await;

    let body = reqwest::get(format!("{}/api/health", base))
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    let health: HealthResponse = serde_json::from_str(&body).unwrap();

    assert_eq!(health.status, "ok");
    assert_eq!(health.backend, "mock");
}
