//! # 解析器模块
//!
//! - `html` - HTML文档解析、DOM操作、选择器匹配、序列化
//! - `css` - 内联样式解析与长度处理

pub mod css;
pub mod html;

pub use css::InlineStyle;
pub use html::{html_to_dom, serialize_document, SelectorList};
