//! 配置管理模块
//!
//! 配置来源按优先级从低到高：内置默认值 → 配置文件 → `SUBTRANS_` 前缀的
//! 环境变量（加载前会先读取 `.env` 文件）。

use std::path::{Path, PathBuf};
use std::time::Duration;

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::core::{SubtitleError, SubtitleResult};

/// 配置常量
pub mod constants {
    pub const DEFAULT_ENDPOINT: &str = "https://translate.googleapis.com/translate_a/single";
    pub const DEFAULT_LANGUAGE: &str = "tr";
    pub const DEFAULT_THROTTLE_MS: u64 = 300;
    pub const DEFAULT_FLIGHT_TIMEOUT_MS: u64 = 5000;
    pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 5000;
    pub const DEFAULT_MIN_CANDIDATE_WIDTH: f32 = 100.0;
    pub const DEFAULT_USER_AGENT: &str = concat!("subtrans/", env!("CARGO_PKG_VERSION"));
    pub const DEFAULT_LOG_LEVEL: &str = "info";
    pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1";
    pub const DEFAULT_PORT: u16 = 7080;

    pub const ENV_PREFIX: &str = "SUBTRANS";

    pub const CONFIG_PATHS: &[&str] = &[
        "subtrans.toml",
        ".subtrans.toml",
        "~/.config/subtrans/config.toml",
    ];
}

/// 应用配置
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    /// 翻译接口地址
    pub endpoint: String,
    /// 默认目标语言，也用于“已是目标语言”判断
    pub default_language: String,
    /// 单次 HTTP 请求超时
    pub request_timeout_ms: u64,
    /// 单飞守卫的安全超时
    pub flight_timeout_ms: u64,
    /// 两次检测之间的最小间隔
    pub throttle_ms: u64,
    /// 部分站点的字幕候选元素最小宽度（px）
    pub min_candidate_width: f32,
    pub user_agent: String,
    pub log_level: String,
    pub bind_addr: String,
    pub port: u16,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            endpoint: constants::DEFAULT_ENDPOINT.to_string(),
            default_language: constants::DEFAULT_LANGUAGE.to_string(),
            request_timeout_ms: constants::DEFAULT_REQUEST_TIMEOUT_MS,
            flight_timeout_ms: constants::DEFAULT_FLIGHT_TIMEOUT_MS,
            throttle_ms: constants::DEFAULT_THROTTLE_MS,
            min_candidate_width: constants::DEFAULT_MIN_CANDIDATE_WIDTH,
            user_agent: constants::DEFAULT_USER_AGENT.to_string(),
            log_level: constants::DEFAULT_LOG_LEVEL.to_string(),
            bind_addr: constants::DEFAULT_BIND_ADDR.to_string(),
            port: constants::DEFAULT_PORT,
        }
    }
}

impl AppConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn flight_timeout(&self) -> Duration {
        Duration::from_millis(self.flight_timeout_ms)
    }

    pub fn throttle(&self) -> Duration {
        Duration::from_millis(self.throttle_ms)
    }

    /// 验证配置
    pub fn validate(&self) -> SubtitleResult<()> {
        if self.endpoint.trim().is_empty() {
            return Err(SubtitleError::Config("翻译接口地址不能为空".to_string()));
        }

        Url::parse(&self.endpoint)
            .map_err(|e| SubtitleError::Config(format!("无效的翻译接口地址 {}: {}", self.endpoint, e)))?;

        if self.flight_timeout_ms == 0 {
            return Err(SubtitleError::Config("flight_timeout_ms 不能为0".to_string()));
        }

        if self.default_language.trim().is_empty() {
            return Err(SubtitleError::Config("默认语言不能为空".to_string()));
        }

        Ok(())
    }
}

/// 配置加载器
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config: AppConfig,
    source: Option<PathBuf>,
}

impl ConfigManager {
    /// 加载配置；`explicit` 指定时只读取该文件，否则使用找到的第一个默认路径
    pub fn load(explicit: Option<&Path>) -> SubtitleResult<Self> {
        Self::load_dotenv();

        let mut builder = Config::builder().add_source(Config::try_from(&AppConfig::default())?);

        let source = match explicit {
            Some(path) => {
                if !path.exists() {
                    return Err(SubtitleError::Config(format!(
                        "配置文件不存在: {}",
                        path.display()
                    )));
                }
                Some(path.to_path_buf())
            }
            None => Self::find_config_file(),
        };

        if let Some(path) = &source {
            tracing::info!("加载配置文件: {}", path.display());
            builder = builder.add_source(File::from(path.as_path()).required(true));
        } else {
            tracing::debug!("未找到配置文件，使用默认配置");
        }

        builder = builder.add_source(Environment::with_prefix(constants::ENV_PREFIX).try_parsing(true));

        let config: AppConfig = builder.build()?.try_deserialize()?;
        config.validate()?;

        Ok(Self { config, source })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn into_config(self) -> AppConfig {
        self.config
    }

    /// 实际读取的配置文件
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    fn find_config_file() -> Option<PathBuf> {
        constants::CONFIG_PATHS
            .iter()
            .map(|path| PathBuf::from(shellexpand::tilde(path).as_ref()))
            .find(|path| path.exists())
    }

    fn load_dotenv() {
        match dotenv::dotenv() {
            Ok(path) => tracing::debug!("已加载环境变量文件: {}", path.display()),
            Err(e) => tracing::trace!("未加载 .env 文件: {}", e),
        }
    }

    /// 生成示例配置文件
    pub fn generate_example_config(path: &Path) -> SubtitleResult<()> {
        let content = toml::to_string_pretty(&AppConfig::default())
            .map_err(|e| SubtitleError::Config(format!("序列化配置失败: {}", e)))?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
