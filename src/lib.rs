//! # subtrans
//!
//! 在视频页面上检测当前显示的字幕，发送给翻译后端，并以覆盖层的形式
//! 显示译文而不破坏页面布局。
//!
//! ## 模块组织
//!
//! - `core` - 错误类型与会话控制器
//! - `config` - 配置加载
//! - `detection` - 各站点字幕来源与检测器
//! - `translation` - 翻译后端、缓存与客户端
//! - `overlay` - 译文覆盖层渲染
//! - `settings` - 用户设置与设置存储
//! - `messaging` - 页面与后台之间的消息通道
//! - `parsers` - HTML/CSS 解析、选择器与几何信息
//! - `web` - 本地 HTTP 后台服务（可选）

pub mod config;
pub mod core;
pub mod detection;
pub mod messaging;
pub mod overlay;
pub mod parsers;
pub mod settings;
pub mod translation;
#[cfg(feature = "web")]
pub mod web;

pub use crate::config::{AppConfig, ConfigManager};
pub use crate::core::{CheckOutcome, Phase, SubtitleError, SubtitleResult, SubtitleTranslator};
pub use crate::detection::{Detection, Detector, DetectorConfig, SubtitleSource};
pub use crate::overlay::OverlayRenderer;
pub use crate::settings::{MemoryStore, Settings, SettingsStore};
pub use crate::translation::{Translation, TranslationClient, TranslationStatus};
