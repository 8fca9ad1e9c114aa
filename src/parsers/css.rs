//! CSS 解析器模块
//!
//! 基于 cssparser 处理元素的内联样式（`style` 属性）：
//!
//! - **声明解析**: 将 `style` 属性拆分为有序的 `属性: 值` 列表
//! - **声明修改**: 设置或删除单个属性，保持其余声明原样
//! - **长度解析**: 解析 `px` 长度，用于读取字幕元素的几何信息
//!
//! # 使用示例
//!
//! ```rust
//! use subtrans::parsers::css::{parse_px, InlineStyle};
//!
//! let mut style = InlineStyle::parse("left: 10px; width: 320px");
//! style.set("opacity", "0");
//! assert_eq!(style.get("width").and_then(parse_px), Some(320.0));
//! assert_eq!(style.to_css(), "left: 10px; width: 320px; opacity: 0;");
//! ```

use cssparser::{serialize_identifier, Delimiter, ParseError, Parser, ParserInput, Token};

/// 有序的内联样式声明列表
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InlineStyle {
    declarations: Vec<(String, String)>,
}

impl InlineStyle {
    /// 解析 `style` 属性内容
    ///
    /// 无法解析的声明会被跳过；重复的属性以最后一次出现为准。
    pub fn parse(css: &str) -> Self {
        let mut input = ParserInput::new(css);
        let mut parser = Parser::new(&mut input);
        let mut style = InlineStyle::default();

        while !parser.is_exhausted() {
            let declaration: Result<(String, String), ParseError<'_, ()>> =
                parser.parse_until_after(Delimiter::Semicolon, |p| {
                    let name = p.expect_ident()?.to_ascii_lowercase();
                    p.expect_colon()?;
                    let start = p.position();
                    while p.next().is_ok() {}
                    Ok((name, p.slice_from(start).trim().to_string()))
                });

            if let Ok((name, value)) = declaration {
                if !value.is_empty() {
                    style.set(&name, &value);
                }
            }
        }

        style
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.declarations
            .iter()
            .find(|(prop, _)| prop.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// 设置属性值，已存在时原地替换
    pub fn set(&mut self, name: &str, value: &str) {
        let name = name.to_ascii_lowercase();
        match self.declarations.iter_mut().find(|(prop, _)| *prop == name) {
            Some(existing) => existing.1 = value.to_string(),
            None => self.declarations.push((name, value.to_string())),
        }
    }

    /// 删除属性，返回是否确实存在
    pub fn remove(&mut self, name: &str) -> bool {
        let before = self.declarations.len();
        self.declarations
            .retain(|(prop, _)| !prop.eq_ignore_ascii_case(name));
        before != self.declarations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty()
    }

    /// 序列化为 `style` 属性内容
    pub fn to_css(&self) -> String {
        self.declarations
            .iter()
            .map(|(name, value)| format!("{}: {};", format_ident(name), value))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// 格式化CSS标识符
pub fn format_ident(ident: &str) -> String {
    let mut res: String = "".to_string();
    let _ = serialize_identifier(ident, &mut res);
    res.trim_end().to_string()
}

/// 解析 `px` 长度；无单位的 `0` 视为 0
pub fn parse_px(value: &str) -> Option<f32> {
    let mut input = ParserInput::new(value);
    let mut parser = Parser::new(&mut input);

    let length = match parser.next() {
        Ok(Token::Dimension { value, unit, .. }) if unit.eq_ignore_ascii_case("px") => Some(*value),
        Ok(Token::Number { value, .. }) if *value == 0.0 => Some(0.0),
        _ => None,
    };

    length.filter(|_| parser.is_exhausted())
}

/// 格式化 `px` 长度，整数值不带小数部分
pub fn format_px(value: f32) -> String {
    if value.fract() == 0.0 {
        format!("{}px", value as i64)
    } else {
        format!("{}px", value)
    }
}
