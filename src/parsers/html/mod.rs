//! HTML解析和处理模块
//!
//! - `utils`: 基础工具函数和常量
//! - `dom`: 基础DOM操作
//! - `selector`: CSS 选择器解析与匹配
//! - `layout`: 基于内联样式的几何信息
//! - `serializer`: 序列化功能

pub mod dom;
pub mod layout;
pub mod selector;
pub mod serializer;
pub mod utils;

pub use dom::{
    add_class, append_child, detach_node, find_by_class, get_body, get_node_attr, get_node_name,
    get_parent_node, has_class, html_to_dom, remove_class, set_node_attr, text_content,
    text_content_excluding, within_class,
};
pub use layout::{bounding_rect, get_inline_style, set_inline_style, Rect};
pub use selector::SelectorList;
pub use serializer::serialize_document;
pub use utils::{escape_html, preview, WHITESPACES};
