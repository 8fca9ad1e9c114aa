//! 目标语言启发式判断
//!
//! 当目标语言是默认语言、且原文已经含有该语言特有的字符时，跳过翻译。
//! 只对字符特征明显的语言提供规则，其余语言总是翻译。

use regex::Regex;

use super::error::TranslationResult;

/// 语言特有字符表
const LANGUAGE_MARKERS: &[(&str, &str)] = &[
    ("tr", "[çğıöşüÇĞİÖŞÜ]"),
    ("de", "[äöüßÄÖÜ]"),
    ("es", "[ñÑ¿¡]"),
    ("pl", "[ąćęłńśźżĄĆĘŁŃŚŹŻ]"),
    ("ru", "[\u{0400}-\u{04FF}]"),
    ("el", "[\u{0370}-\u{03FF}]"),
    ("ja", "[\u{3040}-\u{30FF}]"),
    ("ko", "[\u{AC00}-\u{D7AF}]"),
    ("ar", "[\u{0600}-\u{06FF}]"),
];

/// 默认语言的字符特征检测
#[derive(Debug, Clone)]
pub struct LanguageMarker {
    language: String,
    pattern: Option<Regex>,
}

impl LanguageMarker {
    /// 为 `language` 构建检测规则；没有规则的语言永远不会被判定为“已是目标语言”
    pub fn new(language: &str) -> TranslationResult<Self> {
        let pattern = LANGUAGE_MARKERS
            .iter()
            .find(|(code, _)| code.eq_ignore_ascii_case(language))
            .map(|(_, pattern)| Regex::new(pattern))
            .transpose()?;

        Ok(Self {
            language: language.to_string(),
            pattern,
        })
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    /// `text` 译入 `target_lang` 时是否可以跳过
    pub fn already_in_target(&self, text: &str, target_lang: &str) -> bool {
        if !target_lang.eq_ignore_ascii_case(&self.language) {
            return false;
        }
        self.pattern
            .as_ref()
            .map_or(false, |pattern| pattern.is_match(text))
    }
}
