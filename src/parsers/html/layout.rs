//! 元素几何信息
//!
//! DOM 快照没有布局引擎，元素的盒子取自其内联样式中的 `left`、`top`、
//! `width`、`height`（`px`）。播放器通常就是用内联样式定位字幕窗口的。

use markup5ever_rcdom::Handle;

use crate::parsers::css::{parse_px, InlineStyle};

use super::dom::{get_node_attr, set_node_attr};

/// 元素的包围盒（相对偏移父元素）
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Rect {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    /// 宽高均大于零
    pub fn is_visible(&self) -> bool {
        self.width > 0.0 && self.height > 0.0
    }
}

/// 读取元素的内联样式
pub fn get_inline_style(node: &Handle) -> InlineStyle {
    get_node_attr(node, "style")
        .map(|css| InlineStyle::parse(&css))
        .unwrap_or_default()
}

/// 写回内联样式，样式为空时删除 `style` 属性
pub fn set_inline_style(node: &Handle, style: &InlineStyle) {
    if style.is_empty() {
        set_node_attr(node, "style", None);
    } else {
        set_node_attr(node, "style", Some(style.to_css()));
    }
}

/// 计算元素的包围盒
///
/// `display: none` 或 `visibility: hidden` 的元素返回空盒子。
pub fn bounding_rect(node: &Handle) -> Rect {
    let style = get_inline_style(node);

    let hidden = style
        .get("display")
        .map_or(false, |v| v.eq_ignore_ascii_case("none"))
        || style
            .get("visibility")
            .map_or(false, |v| v.eq_ignore_ascii_case("hidden"));
    if hidden {
        return Rect::default();
    }

    let length = |name: &str| style.get(name).and_then(parse_px).unwrap_or(0.0);

    Rect {
        left: length("left"),
        top: length("top"),
        width: length("width"),
        height: length("height"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsers::html::dom::{find_by_class, html_to_dom};

    fn node(html: &str) -> Handle {
        let dom = html_to_dom(html.as_bytes(), "utf-8").unwrap();
        find_by_class(&dom.document, "target")[0].clone()
    }

    #[test]
    fn reads_geometry_from_inline_style() {
        let rect = bounding_rect(&node(
            r#"<div class="target" style="position:absolute; left: 40px; top: 300px; width: 640px; height: 48px"></div>"#,
        ));

        assert_eq!(
            rect,
            Rect {
                left: 40.0,
                top: 300.0,
                width: 640.0,
                height: 48.0
            }
        );
        assert!(rect.is_visible());
    }

    #[test]
    fn hidden_elements_have_empty_box() {
        let rect = bounding_rect(&node(
            r#"<div class="target" style="display: none; width: 640px; height: 48px"></div>"#,
        ));
        assert!(!rect.is_visible());

        let rect = bounding_rect(&node(r#"<div class="target">no style</div>"#));
        assert!(!rect.is_visible());
    }

    #[test]
    fn style_round_trip_through_attribute() {
        let target = node(r#"<div class="target" style="width: 10px"></div>"#);

        let mut style = get_inline_style(&target);
        style.set("opacity", "0");
        set_inline_style(&target, &style);
        assert_eq!(
            get_node_attr(&target, "style").unwrap(),
            "width: 10px; opacity: 0;"
        );

        set_inline_style(&target, &InlineStyle::default());
        assert!(get_node_attr(&target, "style").is_none());
    }
}
