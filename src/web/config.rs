//! Web 服务器配置

use crate::config::AppConfig;

/// Web 服务器配置
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebConfig {
    pub bind_addr: String,
    pub port: u16,
}

impl WebConfig {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            bind_addr: config.bind_addr.clone(),
            port: config.port,
        }
    }

    /// 监听地址
    pub fn address(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }
}

impl Default for WebConfig {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}
