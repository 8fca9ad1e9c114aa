//! Web 路由定义

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};

use crate::web::{
    handlers::{health, message},
    types::AppState,
};

/// 创建路由
pub fn create_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/message", post(message))
        .route("/api/health", get(health))
}
