//! 字幕检测
//!
//! [`Detector`] 在每次 DOM 变化通知时依次询问各字幕来源，第一个给出结果的
//! 来源获胜。检测结果与上一次接受的字幕相同（忽略大小写和首尾空白）时
//! 视为重复，不再翻译。两次检测之间有最小间隔，间隔内的检测直接跳过。

pub mod sources;

use std::time::{Duration, Instant};

use markup5ever_rcdom::Handle;

use crate::config::AppConfig;
use crate::core::SubtitleResult;
use crate::parsers::html::preview;

pub use sources::{
    default_sources, DailymotionSource, Detection, GenericSource, NetflixSource, SubtitleSource,
    YouTubeSource,
};

/// 检测器配置
#[derive(Debug, Clone)]
pub struct DetectorConfig {
    pub throttle: Duration,
    pub min_candidate_width: f32,
}

impl DetectorConfig {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            throttle: config.throttle(),
            min_candidate_width: config.min_candidate_width,
        }
    }
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

/// 一次检测的结果
#[derive(Debug, Clone)]
pub enum CheckResult {
    /// 距上次检测不足节流间隔
    Throttled,
    /// 没有来源给出字幕
    NoSubtitle,
    /// 与上次接受的字幕相同
    Duplicate(Detection),
    /// 新字幕
    Detected(Detection),
}

/// 节流器：窗口内只放行一次
#[derive(Debug, Clone)]
pub struct Throttle {
    window: Duration,
    last: Option<Instant>,
}

impl Throttle {
    pub fn new(window: Duration) -> Self {
        Self { window, last: None }
    }

    /// 窗口已过时记录本次并返回 `true`
    pub fn try_pass(&mut self) -> bool {
        let now = Instant::now();
        if let Some(last) = self.last {
            if now.duration_since(last) < self.window {
                return false;
            }
        }
        self.last = Some(now);
        true
    }

    pub fn reset(&mut self) {
        self.last = None;
    }
}

/// 比较用的规范化文本
pub fn normalize(text: &str) -> String {
    text.trim().to_lowercase()
}

/// 字幕检测器
pub struct Detector {
    sources: Vec<Box<dyn SubtitleSource>>,
    throttle: Throttle,
    last_seen: String,
}

impl Detector {
    pub fn new(config: &DetectorConfig) -> SubtitleResult<Self> {
        Ok(Self::with_sources(
            default_sources(config.min_candidate_width)?,
            config.throttle,
        ))
    }

    pub fn with_sources(sources: Vec<Box<dyn SubtitleSource>>, throttle: Duration) -> Self {
        Self {
            sources,
            throttle: Throttle::new(throttle),
            last_seen: String::new(),
        }
    }

    pub fn source_names(&self) -> Vec<&'static str> {
        self.sources.iter().map(|source| source.name()).collect()
    }

    /// 上一次接受的字幕
    pub fn last_seen(&self) -> &str {
        &self.last_seen
    }

    /// 忘掉上一次接受的字幕，下一次检测到同一行时会重新处理
    pub fn forget_last_seen(&mut self) {
        self.last_seen.clear();
    }

    /// 不更新任何状态，只返回当前优先级最高的检测结果
    pub fn detect(&self, root: &Handle) -> Option<Detection> {
        self.sources.iter().find_map(|source| source.detect(root))
    }

    /// 执行一次检测；新字幕会成为新的“上一次字幕”
    pub fn check(&mut self, root: &Handle) -> CheckResult {
        if !self.throttle.try_pass() {
            return CheckResult::Throttled;
        }

        let Some(detection) = self.detect(root) else {
            return CheckResult::NoSubtitle;
        };

        if normalize(&detection.text) == normalize(&self.last_seen) {
            tracing::trace!("重复字幕: {}", preview(&detection.text, 50));
            return CheckResult::Duplicate(detection);
        }

        tracing::debug!(
            source = detection.source,
            "检测到字幕: {}",
            preview(&detection.text, 50)
        );
        self.last_seen = detection.text.clone();
        CheckResult::Detected(detection)
    }
}
