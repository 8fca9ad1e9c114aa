//! Web 服务器模块
//!
//! 把后台翻译服务暴露为本地 HTTP 接口：
//!
//! - `POST /api/message`: 消息通道请求，返回通道响应
//! - `GET /api/health`: 健康检查

pub mod config;
pub mod handlers;
pub mod routes;
pub mod types;

pub use config::WebConfig;
pub use routes::create_routes;
pub use types::{AppState, HealthResponse};

use std::sync::Arc;

use axum::Router;
use tower_http::cors::CorsLayer;

use crate::core::{SubtitleError, SubtitleResult};
use crate::messaging::BackgroundService;

/// Web 服务器
pub struct WebServer {
    config: WebConfig,
    service: BackgroundService,
}

impl WebServer {
    pub fn new(config: WebConfig, service: BackgroundService) -> Self {
        Self { config, service }
    }

    /// 启动 Web 服务器，直到出错才返回
    pub async fn start(&self) -> SubtitleResult<()> {
        let app = create_router(Arc::new(AppState {
            service: self.service.clone(),
        }));

        let address = self.config.address();
        let listener = tokio::net::TcpListener::bind(&address)
            .await
            .map_err(|e| SubtitleError::Config(format!("无法监听 {}: {}", address, e)))?;

        tracing::info!("后台服务已启动: http://{}", address);

        axum::serve(listener, app).await?;
        Ok(())
    }
}

/// 创建带 CORS 的路由器
pub fn create_router(app_state: Arc<AppState>) -> Router {
    create_routes()
        .with_state(app_state)
        .layer(CorsLayer::permissive())
}
