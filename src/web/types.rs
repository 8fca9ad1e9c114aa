//! Web 模块的数据类型定义

use serde::{Deserialize, Serialize};

use crate::messaging::BackgroundService;

/// 应用状态
#[derive(Clone)]
pub struct AppState {
    pub service: BackgroundService,
}

/// 健康检查响应
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub backend: String,
}
