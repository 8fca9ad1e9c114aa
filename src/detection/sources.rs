//! 各站点的字幕来源
//!
//! 每个来源只回答一个问题：当前页面上有没有它认识的、可见且足够长的
//! 字幕文本。来源之间不合并结果，由 [`super::Detector`] 按优先级依次询问。

use markup5ever_rcdom::Handle;

use crate::core::SubtitleResult;
use crate::overlay::OVERLAY_CLASS;
use crate::parsers::html::{bounding_rect, text_content_excluding, within_class, SelectorList};

/// 一次检测结果
#[derive(Debug, Clone)]
pub struct Detection {
    /// 来源名称
    pub source: &'static str,
    /// 去掉首尾空白后的字幕文本
    pub text: String,
    /// 承载字幕的元素，按文档顺序
    pub elements: Vec<Handle>,
}

/// 字幕来源
pub trait SubtitleSource {
    fn name(&self) -> &'static str;

    /// 在 `root` 之下查找字幕
    fn detect(&self, root: &Handle) -> Option<Detection>;
}

/// 查询匹配元素，跳过渲染器自己插入的覆盖层
fn query(selector: &SelectorList, root: &Handle) -> Vec<Handle> {
    selector
        .query_all(root)
        .into_iter()
        .filter(|node| !within_class(node, OVERLAY_CLASS))
        .collect()
}

fn element_text(node: &Handle) -> String {
    text_content_excluding(node, OVERLAY_CLASS)
}

/// 多个片段以空格拼接后去掉首尾空白
fn joined_text(elements: &[Handle]) -> String {
    elements
        .iter()
        .map(element_text)
        .collect::<Vec<_>>()
        .join(" ")
        .trim()
        .to_string()
}

fn longer_than(text: &str, min_chars: usize) -> bool {
    text.chars().count() > min_chars
}

/// 片段式字幕：所有匹配元素的文本拼接为一条字幕
struct SegmentSource {
    name: &'static str,
    selector: SelectorList,
}

impl SegmentSource {
    fn new(name: &'static str, selector: &str) -> SubtitleResult<Self> {
        Ok(Self {
            name,
            selector: SelectorList::parse(selector)?,
        })
    }

    fn detect_segments(&self, root: &Handle) -> Option<Detection> {
        let elements = query(&self.selector, root);
        if elements.is_empty() {
            return None;
        }

        let text = joined_text(&elements);
        if !longer_than(&text, 1) {
            return None;
        }

        Some(Detection {
            source: self.name,
            text,
            elements,
        })
    }
}

/// YouTube 播放器：`.ytp-caption-segment`
pub struct YouTubeSource(SegmentSource);

impl YouTubeSource {
    pub fn new() -> SubtitleResult<Self> {
        SegmentSource::new("youtube", ".ytp-caption-segment").map(Self)
    }
}

impl SubtitleSource for YouTubeSource {
    fn name(&self) -> &'static str {
        self.0.name
    }

    fn detect(&self, root: &Handle) -> Option<Detection> {
        self.0.detect_segments(root)
    }
}

/// Netflix 播放器：`.player-timedtext-text-container span`
pub struct NetflixSource(SegmentSource);

impl NetflixSource {
    pub fn new() -> SubtitleResult<Self> {
        SegmentSource::new("netflix", ".player-timedtext-text-container span").map(Self)
    }
}

impl SubtitleSource for NetflixSource {
    fn name(&self) -> &'static str {
        self.0.name
    }

    fn detect(&self, root: &Handle) -> Option<Detection> {
        self.0.detect_segments(root)
    }
}

/// Dailymotion 播放器的候选选择器，按顺序尝试
pub const DAILYMOTION_SELECTORS: &[&str] = &[
    ".dmp-subtitles-line",
    ".dmp-subtitle",
    "[class*=\"subtitle\"]",
    "video + div[class*=\"subtitle\"]",
    "video ~ div[class*=\"text\"]",
];

/// Dailymotion 播放器
///
/// 页面上类名含 `subtitle` 的元素很多，只接受可见、宽度超过阈值的候选，
/// 并且只取第一个，避免重复翻译同一行。
pub struct DailymotionSource {
    selectors: Vec<SelectorList>,
    min_width: f32,
}

impl DailymotionSource {
    pub fn new(min_width: f32) -> SubtitleResult<Self> {
        let selectors = DAILYMOTION_SELECTORS
            .iter()
            .map(|selector| SelectorList::parse(selector))
            .collect::<SubtitleResult<Vec<_>>>()?;

        Ok(Self {
            selectors,
            min_width,
        })
    }

    fn qualifies(&self, node: &Handle) -> Option<String> {
        let rect = bounding_rect(node);
        if !rect.is_visible() || rect.width <= self.min_width {
            return None;
        }

        let text = element_text(node).trim().to_string();
        longer_than(&text, 1).then_some(text)
    }
}

impl SubtitleSource for DailymotionSource {
    fn name(&self) -> &'static str {
        "dailymotion"
    }

    fn detect(&self, root: &Handle) -> Option<Detection> {
        for selector in &self.selectors {
            for node in query(selector, root) {
                if let Some(text) = self.qualifies(&node) {
                    tracing::trace!("dailymotion 候选命中: {}", selector);
                    return Some(Detection {
                        source: self.name(),
                        text,
                        elements: vec![node],
                    });
                }
            }
        }
        None
    }
}

/// 通用规则：类名含 caption / subtitle / timedtext 的第一个元素
pub struct GenericSource {
    selector: SelectorList,
}

impl GenericSource {
    pub fn new() -> SubtitleResult<Self> {
        Ok(Self {
            selector: SelectorList::parse(
                "[class*=\"caption\"], [class*=\"subtitle\"], [class*=\"timedtext\"]",
            )?,
        })
    }
}

impl SubtitleSource for GenericSource {
    fn name(&self) -> &'static str {
        "generic"
    }

    /// 总是取第一个足够长的候选，不跳过与上一条字幕相同的元素；去重交给 `Detector`
    fn detect(&self, root: &Handle) -> Option<Detection> {
        query(&self.selector, root).into_iter().find_map(|node| {
            let text = element_text(&node).trim().to_string();
            longer_than(&text, 2).then(|| Detection {
                source: self.name(),
                text,
                elements: vec![node],
            })
        })
    }
}

/// 按优先级排列的内置来源
pub fn default_sources(min_candidate_width: f32) -> SubtitleResult<Vec<Box<dyn SubtitleSource>>> {
    Ok(vec![
        Box::new(YouTubeSource::new()?),
        Box::new(DailymotionSource::new(min_candidate_width)?),
        Box::new(NetflixSource::new()?),
        Box::new(GenericSource::new()?),
    ])
}
