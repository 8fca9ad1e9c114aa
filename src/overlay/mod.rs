//! 译文覆盖层
//!
//! 渲染时先清理上一代覆盖层，再把每个字幕元素隐藏（只改透明度，不从 DOM
//! 中移除），并在其父元素末尾追加一个绝对定位的覆盖层，位置与字幕元素
//! 重合。页面上任何时刻只存在一代覆盖层。

use markup5ever_rcdom::Handle;

use crate::core::{SubtitleError, SubtitleResult};
use crate::parsers::css::format_px;
use crate::parsers::html::dom::element_children;
use crate::parsers::html::{
    add_class, append_child, bounding_rect, detach_node, escape_html, find_by_class, get_body,
    get_inline_style, get_node_attr, get_parent_node, html_to_dom, remove_class, set_inline_style,
    set_node_attr, Rect,
};

pub const OVERLAY_CLASS: &str = "subtrans-overlay";
pub const ACTIVE_CLASS: &str = "subtrans-active";
pub const TRANSLATED_CLASS: &str = "subtrans-translated";
pub const ORIGINAL_CLASS: &str = "subtrans-original";
pub const ORIGINAL_TEXT_ATTR: &str = "data-original-text";

const OVERLAY_Z_INDEX: &str = "999999";

/// 覆盖层的 HTML 片段，文本均已转义
pub fn overlay_markup(rect: &Rect, translated: &str, original: Option<&str>) -> String {
    let width = if rect.width > 0.0 {
        format_px(rect.width)
    } else {
        "auto".to_string()
    };
    let style = format!(
        "position: absolute; left: {}; top: {}; width: {}; height: auto; z-index: {}; pointer-events: none;",
        format_px(rect.left),
        format_px(rect.top),
        width,
        OVERLAY_Z_INDEX,
    );

    let mut markup = format!(
        "<div class=\"{}\" style=\"{}\"><span class=\"{}\">{}</span>",
        OVERLAY_CLASS,
        style,
        TRANSLATED_CLASS,
        escape_html(translated)
    );
    if let Some(original) = original {
        markup.push_str(&format!(
            "<span class=\"{}\">{}</span>",
            ORIGINAL_CLASS,
            escape_html(original)
        ));
    }
    markup.push_str("</div>");
    markup
}

/// 覆盖层渲染器
#[derive(Debug, Clone, Default)]
pub struct OverlayRenderer;

impl OverlayRenderer {
    pub fn new() -> Self {
        Self
    }

    /// 为 `elements` 渲染新一代覆盖层，返回创建的覆盖层数量
    pub fn render(
        &self,
        root: &Handle,
        elements: &[Handle],
        original: &str,
        translated: &str,
        show_original: bool,
    ) -> SubtitleResult<usize> {
        self.cleanup(root);

        let mut created = 0;
        for element in elements {
            let Some(parent) = get_parent_node(element) else {
                tracing::warn!("字幕元素已脱离文档，跳过");
                continue;
            };

            if get_node_attr(element, ORIGINAL_TEXT_ATTR).is_none() {
                set_node_attr(element, ORIGINAL_TEXT_ATTR, Some(original.to_string()));
            }

            // 几何信息要在修改内联样式之前读取
            let rect = bounding_rect(element);

            let mut style = get_inline_style(element);
            style.set("opacity", "0");
            style.set("pointer-events", "none");
            set_inline_style(element, &style);
            add_class(element, ACTIVE_CLASS);

            let mut parent_style = get_inline_style(&parent);
            parent_style.set("position", "relative");
            set_inline_style(&parent, &parent_style);

            let overlay = build_overlay(&rect, translated, show_original.then_some(original))?;
            append_child(&parent, &overlay);
            created += 1;
        }

        tracing::debug!("已渲染 {} 个覆盖层", created);
        Ok(created)
    }

    /// 删除所有覆盖层并恢复被隐藏的字幕元素，返回删除的覆盖层数量
    pub fn cleanup(&self, root: &Handle) -> usize {
        let overlays = find_by_class(root, OVERLAY_CLASS);
        for overlay in &overlays {
            detach_node(overlay);
        }

        for element in find_by_class(root, ACTIVE_CLASS) {
            let mut style = get_inline_style(&element);
            style.remove("opacity");
            style.remove("pointer-events");
            set_inline_style(&element, &style);
            remove_class(&element, ACTIVE_CLASS);
        }

        overlays.len()
    }
}

fn build_overlay(rect: &Rect, translated: &str, original: Option<&str>) -> SubtitleResult<Handle> {
    let markup = format!(
        "<html><body>{}</body></html>",
        overlay_markup(rect, translated, original)
    );
    let fragment = html_to_dom(markup.as_bytes(), "utf-8")?;

    let overlay = get_body(&fragment.document)
        .and_then(|body| element_children(&body).into_iter().next())
        .ok_or_else(|| SubtitleError::Dom("无法构建覆盖层节点".to_string()))?;

    // 片段文档释放时会清空其中每个节点的子节点，必须先摘下覆盖层
    detach_node(&overlay);
    Ok(overlay)
}
