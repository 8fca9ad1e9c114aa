//! 翻译模块
//!
//! - **backend**: 翻译后端接口与公共翻译接口实现
//! - **cache**: 以原文为键的进程内缓存
//! - **client**: 缓存、单飞守卫和安全超时组合而成的客户端
//! - **error**: 错误类型与分类
//! - **flight**: 单飞守卫
//! - **language**: 目标语言启发式判断
//!
//! # 基本用法
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use subtrans::config::AppConfig;
//! use subtrans::translation::{ClientOptions, GoogleTranslateBackend, TranslationClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = AppConfig::default();
//! let backend = Arc::new(GoogleTranslateBackend::from_config(&config)?);
//! let client = TranslationClient::new(backend, ClientOptions::from_config(&config))?;
//!
//! let result = client.translate("Hello", "tr").await;
//! println!("{}", result.text);
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod cache;
pub mod client;
pub mod error;
pub mod flight;
pub mod language;

pub use backend::{parse_response, GoogleTranslateBackend, TranslateBackend};
pub use cache::{CacheStats, TranslationCache};
pub use client::{ClientOptions, Translation, TranslationClient, TranslationStatus};
pub use error::{ErrorCategory, TranslationError, TranslationResult};
pub use flight::{FlightPermit, SingleFlight};
pub use language::LanguageMarker;
