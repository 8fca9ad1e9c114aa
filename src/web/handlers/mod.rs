//! Web 路由处理器

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::Json};

use crate::messaging::{BackgroundService, Response};
use crate::web::types::{AppState, HealthResponse};

/// 消息通道请求
///
/// 格式错误的请求返回 400，后端翻译失败返回 502，响应体均为 `success:false`。
pub async fn message(
    State(state): State<Arc<AppState>>,
    body: String,
) -> (StatusCode, Json<Response>) {
    let request = match BackgroundService::parse_json(&body) {
        Ok(request) => request,
        Err(message) => return (StatusCode::BAD_REQUEST, Json(Response::error(message))),
    };

    let response = state.service.handle(request).await;
    let status = if response.success {
        StatusCode::OK
    } else {
        StatusCode::BAD_GATEWAY
    };
    (status, Json(response))
}

/// 健康检查
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        backend: state.service.backend_name().to_string(),
    })
}
