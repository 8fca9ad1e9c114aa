//! 核心类型与会话控制器
//!
//! [`SubtitleTranslator`] 持有设置快照、检测器、翻译客户端和渲染器，
//! 每次 DOM 变化通知时执行一轮 `检测 → 翻译 → 渲染`。控制器运行在单线程
//! 运行时上，内部状态用 `Cell`/`RefCell` 保存，借用从不跨越 `.await`。

use std::cell::{Cell, RefCell};
use std::io;
use std::sync::Arc;

use markup5ever_rcdom::Handle;
use thiserror::Error;
use tokio::sync::broadcast;

use crate::detection::{CheckResult, Detector};
use crate::overlay::OverlayRenderer;
use crate::parsers::html::preview;
use crate::settings::{
    increment_counter, load_settings, Settings, SettingsChanges, SettingsStore, ENABLED,
    TARGET_LANGUAGE,
};
use crate::translation::{TranslationClient, TranslationError, TranslationStatus};

/// 通用错误类型
#[derive(Error, Debug)]
pub enum SubtitleError {
    /// DOM 解析或操作失败
    #[error("DOM错误: {0}")]
    Dom(String),

    /// 无法解析的选择器
    #[error("无效的选择器 `{selector}`: {reason}")]
    InvalidSelector { selector: String, reason: String },

    #[error("配置错误: {0}")]
    Config(String),

    #[error("设置存储错误: {0}")]
    Settings(String),

    #[error("IO错误: {0}")]
    Io(#[from] io::Error),

    #[error(transparent)]
    Translation(#[from] TranslationError),
}

impl From<config::ConfigError> for SubtitleError {
    fn from(error: config::ConfigError) -> Self {
        SubtitleError::Config(error.to_string())
    }
}

pub type SubtitleResult<T> = Result<T, SubtitleError>;

/// 控制器当前所处阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    Detecting,
    Translating,
    Rendering,
}

/// 一轮检测的结果
#[derive(Debug)]
pub enum CheckOutcome {
    /// 未在观察（已禁用）
    Inactive,
    Throttled,
    NoSubtitle,
    /// 与上一条字幕相同
    Duplicate,
    /// 关闭了自动翻译
    AutoTranslateOff,
    /// 已有翻译在途，本次丢弃
    Busy,
    /// 空文本或已是目标语言
    Skipped,
    /// 翻译或渲染失败，页面保持原字幕
    Failed(SubtitleError),
    Rendered {
        source: &'static str,
        overlays: usize,
    },
}

/// 离开作用域时把阶段复位为 `Idle`
///
/// 只有从 `Idle` 进入的一轮检测持有阶段；与在途翻译重叠的检测不改动它。
struct PhaseGuard<'a> {
    cell: &'a Cell<Phase>,
    owned: bool,
}

impl<'a> PhaseGuard<'a> {
    fn enter(cell: &'a Cell<Phase>, phase: Phase) -> Self {
        let owned = cell.get() == Phase::Idle;
        if owned {
            cell.set(phase);
        }
        Self { cell, owned }
    }

    fn advance(&self, phase: Phase) {
        if self.owned {
            self.cell.set(phase);
        }
    }
}

impl Drop for PhaseGuard<'_> {
    fn drop(&mut self) {
        if self.owned {
            self.cell.set(Phase::Idle);
        }
    }
}

/// 字幕翻译会话
pub struct SubtitleTranslator {
    settings: RefCell<Settings>,
    observing: Cell<bool>,
    phase: Cell<Phase>,
    detector: RefCell<Detector>,
    client: TranslationClient,
    renderer: OverlayRenderer,
    store: Option<Arc<dyn SettingsStore>>,
}

impl SubtitleTranslator {
    /// 创建会话；设置为启用时立即开始观察
    pub fn new(settings: Settings, detector: Detector, client: TranslationClient) -> Self {
        let observing = settings.enabled;
        if observing {
            tracing::info!("字幕翻译已启动，目标语言: {}", settings.target_language);
        }

        Self {
            settings: RefCell::new(settings),
            observing: Cell::new(observing),
            phase: Cell::new(Phase::Idle),
            detector: RefCell::new(detector),
            client,
            renderer: OverlayRenderer::new(),
            store: None,
        }
    }

    /// 关联设置存储，成功的网络翻译会累加 `translationCount`
    pub fn with_store(mut self, store: Arc<dyn SettingsStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// 从存储读取设置后创建会话
    pub async fn from_store(
        store: Arc<dyn SettingsStore>,
        detector: Detector,
        client: TranslationClient,
    ) -> SubtitleResult<Self> {
        let settings = load_settings(store.as_ref()).await?;
        Ok(Self::new(settings, detector, client).with_store(store))
    }

    pub fn start_observing(&self) {
        if !self.observing.replace(true) {
            tracing::info!("开始观察字幕");
        }
    }

    /// 停止观察；已渲染的覆盖层保留在页面上
    pub fn stop_observing(&self) {
        if self.observing.replace(false) {
            tracing::info!("停止观察字幕");
        }
    }

    pub fn is_observing(&self) -> bool {
        self.observing.get()
    }

    pub fn phase(&self) -> Phase {
        self.phase.get()
    }

    pub fn settings(&self) -> Settings {
        self.settings.borrow().clone()
    }

    pub fn client(&self) -> &TranslationClient {
        &self.client
    }

    /// 应用一次设置差异
    pub fn apply_changes(&self, changes: &SettingsChanges) -> Vec<&'static str> {
        let changed = self.settings.borrow_mut().apply_changes(changes);
        let settings = self.settings();

        if changed.contains(&ENABLED) {
            if settings.enabled {
                self.start_observing();
            } else {
                self.stop_observing();
            }
        }

        if changed.contains(&TARGET_LANGUAGE) {
            tracing::info!("目标语言切换为 {}，清空翻译缓存", settings.target_language);
            self.client.clear_cache();
            self.detector.borrow_mut().forget_last_seen();
        }

        changed
    }

    /// 应用订阅中积压的所有设置差异，返回处理的差异数
    pub fn drain_changes(&self, rx: &mut broadcast::Receiver<SettingsChanges>) -> usize {
        let mut applied = 0;
        loop {
            match rx.try_recv() {
                Ok(changes) => {
                    self.apply_changes(&changes);
                    applied += 1;
                }
                Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                    tracing::warn!("设置变更通知积压，丢失 {} 条", skipped);
                }
                Err(broadcast::error::TryRecvError::Empty)
                | Err(broadcast::error::TryRecvError::Closed) => break,
            }
        }
        applied
    }

    /// 执行一轮检测、翻译和渲染
    pub async fn check_subtitles(&self, root: &Handle) -> CheckOutcome {
        if !self.observing.get() {
            return CheckOutcome::Inactive;
        }

        let phase = PhaseGuard::enter(&self.phase, Phase::Detecting);

        let result = self.detector.borrow_mut().check(root);
        let detection = match result {
            CheckResult::Throttled => return CheckOutcome::Throttled,
            CheckResult::NoSubtitle => return CheckOutcome::NoSubtitle,
            CheckResult::Duplicate(_) => return CheckOutcome::Duplicate,
            CheckResult::Detected(detection) => detection,
        };

        let (auto_translate, target_lang) = {
            let settings = self.settings.borrow();
            (settings.auto_translate, settings.target_language.clone())
        };
        if !auto_translate {
            return CheckOutcome::AutoTranslateOff;
        }

        phase.advance(Phase::Translating);
        let translation = self.client.translate(&detection.text, &target_lang).await;

        // 翻译期间可能被禁用
        if !self.observing.get() {
            tracing::debug!("翻译返回时已停止观察，丢弃结果");
            return CheckOutcome::Inactive;
        }

        match translation.status {
            TranslationStatus::Network | TranslationStatus::Cache => {}
            TranslationStatus::Dropped => return CheckOutcome::Busy,
            TranslationStatus::Empty | TranslationStatus::AlreadyInTarget => {
                return CheckOutcome::Skipped
            }
            TranslationStatus::Failed(error) => return CheckOutcome::Failed(error.into()),
        }

        phase.advance(Phase::Rendering);
        let show_original = self.settings.borrow().show_original;
        let overlays = match self.renderer.render(
            root,
            &detection.elements,
            &detection.text,
            &translation.text,
            show_original,
        ) {
            Ok(overlays) => overlays,
            Err(error) => {
                tracing::warn!("渲染覆盖层失败: {}", error);
                return CheckOutcome::Failed(error);
            }
        };

        tracing::info!(
            source = detection.source,
            "已显示译文: {}",
            preview(&translation.text, 50)
        );

        if matches!(translation.status, TranslationStatus::Network) {
            self.record_translation().await;
        }

        CheckOutcome::Rendered {
            source: detection.source,
            overlays,
        }
    }

    /// 删除页面上的覆盖层
    pub fn clear_overlays(&self, root: &Handle) -> usize {
        self.renderer.cleanup(root)
    }

    async fn record_translation(&self) {
        let Some(store) = &self.store else {
            return;
        };
        match increment_counter(store.as_ref()).await {
            Ok(count) => tracing::debug!("累计翻译 {} 条", count),
            Err(error) => tracing::warn!("更新翻译计数失败: {}", error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::DetectorConfig;
    use crate::parsers::html::{find_by_class, html_to_dom};
    use crate::translation::{ClientOptions, TranslateBackend, TranslationResult};
    use futures::future::BoxFuture;
    use futures::FutureExt;
    use serde_json::json;
    use std::time::Duration;

    struct Upper;

    impl TranslateBackend for Upper {
        fn name(&self) -> &'static str {
            "upper"
        }

        fn translate<'a>(
            &'a self,
            text: &'a str,
            _target_lang: &'a str,
        ) -> BoxFuture<'a, TranslationResult<String>> {
            async move { Ok(text.to_uppercase()) }.boxed()
        }
    }

    fn translator(settings: Settings) -> SubtitleTranslator {
        let detector = Detector::new(&DetectorConfig {
            throttle: Duration::ZERO,
            min_candidate_width: 100.0,
        })
        .unwrap();
        let client = TranslationClient::new(Arc::new(Upper), ClientOptions::default()).unwrap();
        SubtitleTranslator::new(settings, detector, client)
    }

    fn page(text: &str) -> Handle {
        let html = format!(
            "<html><body><div class=\"ytp-caption-window\"><span class=\"ytp-caption-segment\">{}</span></div></body></html>",
            text
        );
        html_to_dom(html.as_bytes(), "utf-8").unwrap().document
    }

    fn diff(value: serde_json::Value) -> SettingsChanges {
        serde_json::from_value(value).unwrap()
    }

    #[tokio::test]
    async fn renders_translation() {
        let translator = translator(Settings::default());
        let root = page("good night");

        let outcome = translator.check_subtitles(&root).await;
        assert!(matches!(
            outcome,
            CheckOutcome::Rendered {
                source: "youtube",
                overlays: 1
            }
        ));
        assert_eq!(translator.phase(), Phase::Idle);
        assert_eq!(find_by_class(&root, crate::overlay::OVERLAY_CLASS).len(), 1);
    }

    #[tokio::test]
    async fn disabled_session_does_nothing() {
        let translator = translator(Settings {
            enabled: false,
            ..Settings::default()
        });

        assert!(!translator.is_observing());
        let outcome = translator.check_subtitles(&page("good night")).await;
        assert!(matches!(outcome, CheckOutcome::Inactive));
    }

    #[tokio::test]
    async fn auto_translate_off_skips_translation() {
        let translator = translator(Settings {
            auto_translate: false,
            ..Settings::default()
        });

        let outcome = translator.check_subtitles(&page("good night")).await;
        assert!(matches!(outcome, CheckOutcome::AutoTranslateOff));
        assert!(translator.client().cache().is_empty());
    }

    #[tokio::test]
    async fn language_change_clears_cache() {
        let translator = translator(Settings::default());
        translator.check_subtitles(&page("good night")).await;
        assert_eq!(translator.client().cache().size(), 1);

        let changed = translator.apply_changes(&diff(json!({
            "targetLanguage": {"newValue": "de", "oldValue": "tr"}
        })));
        assert_eq!(changed, vec![TARGET_LANGUAGE]);
        assert!(translator.client().cache().is_empty());

        // 同一行字幕在新语言下重新处理
        let outcome = translator.check_subtitles(&page("good night")).await;
        assert!(matches!(outcome, CheckOutcome::Rendered { .. }));
    }

    #[test]
    fn enabled_toggle_controls_observation() {
        let translator = translator(Settings::default());

        translator.apply_changes(&diff(json!({"enabled": {"newValue": false}})));
        assert!(!translator.is_observing());

        translator.apply_changes(&diff(json!({"enabled": {"newValue": true}})));
        assert!(translator.is_observing());
    }
}
