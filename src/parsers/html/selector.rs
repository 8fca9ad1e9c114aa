//! CSS 选择器
//!
//! 字幕来源的定位规则是一组 CSS 选择器。这里基于 cssparser 的词法分析实现一个
//! 够用的子集，直接在 rcdom 树上匹配：
//!
//! - 类型选择器、`*`、`.class`、`#id`
//! - 属性选择器：`[a]`、`[a=v]`、`[a~=v]`、`[a|=v]`、`[a^=v]`、`[a$=v]`、`[a*=v]`
//! - 组合器：后代（空白）、`>`、`+`、`~`
//! - 逗号分隔的选择器列表
//!
//! 不支持伪类和伪元素，遇到时返回解析错误。

use std::fmt;

use cssparser::{BasicParseErrorKind, Delimiter, ParseError, Parser, ParserInput, Token};
use markup5ever_rcdom::Handle;

use crate::core::{SubtitleError, SubtitleResult};

use super::dom::{
    for_each_descendant_element, get_classes, get_node_attr, get_node_name, get_parent_node,
    is_element, preceding_element_siblings,
};
use super::utils::WHITESPACES;

/// 已解析的选择器列表
#[derive(Debug, Clone)]
pub struct SelectorList {
    source: String,
    selectors: Vec<ComplexSelector>,
}

#[derive(Debug, Clone)]
struct ComplexSelector {
    compounds: Vec<Compound>,
    /// `combinators[i]` 连接 `compounds[i]` 与 `compounds[i + 1]`
    combinators: Vec<Combinator>,
}

#[derive(Debug, Clone, Default)]
struct Compound {
    universal: bool,
    local_name: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    attributes: Vec<AttributeSelector>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Combinator {
    Descendant,
    Child,
    NextSibling,
    SubsequentSibling,
}

#[derive(Debug, Clone)]
struct AttributeSelector {
    name: String,
    operation: AttributeOperation,
}

#[derive(Debug, Clone)]
enum AttributeOperation {
    Exists,
    Equals(String),
    Includes(String),
    DashMatch(String),
    Prefix(String),
    Suffix(String),
    Substring(String),
}

impl SelectorList {
    /// 解析选择器列表
    pub fn parse(selectors: &str) -> SubtitleResult<Self> {
        let mut input = ParserInput::new(selectors);
        let mut parser = Parser::new(&mut input);
        let mut parsed = Vec::new();

        loop {
            let complex: Result<ComplexSelector, ParseError<'_, ()>> =
                parser.parse_until_before(Delimiter::Comma, |p| parse_complex(p));

            match complex {
                Ok(complex) => parsed.push(complex),
                Err(e) => {
                    return Err(SubtitleError::InvalidSelector {
                        selector: selectors.to_string(),
                        reason: format!("{:?} (列 {})", e.kind, e.location.column),
                    })
                }
            }

            match parser.next() {
                Ok(Token::Comma) => continue,
                _ => break,
            }
        }

        Ok(Self {
            source: selectors.to_string(),
            selectors: parsed,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// 判断元素是否匹配列表中的任一选择器
    pub fn matches(&self, node: &Handle) -> bool {
        is_element(node)
            && self
                .selectors
                .iter()
                .any(|selector| selector.matches_from(node, selector.compounds.len() - 1))
    }

    /// 按文档顺序返回 `root` 之下所有匹配的元素
    pub fn query_all(&self, root: &Handle) -> Vec<Handle> {
        let mut found = Vec::new();
        for_each_descendant_element(root, &mut |node| {
            if self.matches(node) {
                found.push(node.clone());
            }
        });
        found
    }

    /// 第一个匹配的元素
    pub fn query_first(&self, root: &Handle) -> Option<Handle> {
        self.query_all(root).into_iter().next()
    }
}

impl fmt::Display for SelectorList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.source)
    }
}

impl Compound {
    fn is_empty(&self) -> bool {
        !self.universal
            && self.local_name.is_none()
            && self.id.is_none()
            && self.classes.is_empty()
            && self.attributes.is_empty()
    }

    fn matches(&self, node: &Handle) -> bool {
        if let Some(local_name) = &self.local_name {
            match get_node_name(node) {
                Some(name) if name.eq_ignore_ascii_case(local_name) => {}
                _ => return false,
            }
        }

        if let Some(id) = &self.id {
            if get_node_attr(node, "id").as_deref() != Some(id.as_str()) {
                return false;
            }
        }

        if !self.classes.is_empty() {
            let node_classes = get_classes(node);
            if !self
                .classes
                .iter()
                .all(|class| node_classes.iter().any(|c| c == class))
            {
                return false;
            }
        }

        self.attributes.iter().all(|attr| attr.matches(node))
    }
}

impl AttributeSelector {
    fn matches(&self, node: &Handle) -> bool {
        let Some(value) = get_node_attr(node, &self.name) else {
            return false;
        };

        match &self.operation {
            AttributeOperation::Exists => true,
            AttributeOperation::Equals(expected) => value == *expected,
            AttributeOperation::Includes(expected) => {
                !expected.is_empty() && value.split(WHITESPACES).any(|word| word == expected)
            }
            AttributeOperation::DashMatch(expected) => {
                value == *expected || value.starts_with(&format!("{}-", expected))
            }
            AttributeOperation::Prefix(expected) => {
                !expected.is_empty() && value.starts_with(expected.as_str())
            }
            AttributeOperation::Suffix(expected) => {
                !expected.is_empty() && value.ends_with(expected.as_str())
            }
            AttributeOperation::Substring(expected) => {
                !expected.is_empty() && value.contains(expected.as_str())
            }
        }
    }
}

impl ComplexSelector {
    /// 从右向左匹配：`compounds[index]` 对应 `node`
    fn matches_from(&self, node: &Handle, index: usize) -> bool {
        if !self.compounds[index].matches(node) {
            return false;
        }
        if index == 0 {
            return true;
        }

        match self.combinators[index - 1] {
            Combinator::Descendant => {
                let mut ancestor = get_parent_node(node);
                while let Some(current) = ancestor {
                    if is_element(&current) && self.matches_from(&current, index - 1) {
                        return true;
                    }
                    ancestor = get_parent_node(&current);
                }
                false
            }
            Combinator::Child => get_parent_node(node)
                .filter(is_element)
                .map_or(false, |parent| self.matches_from(&parent, index - 1)),
            Combinator::NextSibling => preceding_element_siblings(node)
                .last()
                .map_or(false, |sibling| self.matches_from(sibling, index - 1)),
            Combinator::SubsequentSibling => preceding_element_siblings(node)
                .iter()
                .any(|sibling| self.matches_from(sibling, index - 1)),
        }
    }
}

fn parse_complex<'i, 't>(
    parser: &mut Parser<'i, 't>,
) -> Result<ComplexSelector, ParseError<'i, ()>> {
    let mut compounds = Vec::new();
    let mut combinators = Vec::new();
    let mut current = Compound::default();
    let mut pending: Option<Combinator> = None;
    let mut saw_whitespace = false;

    loop {
        let token = match parser.next_including_whitespace() {
            Ok(token) => token.clone(),
            Err(_) => break,
        };

        match token {
            Token::WhiteSpace(_) => saw_whitespace = true,
            Token::Delim(c @ ('>' | '+' | '~')) => {
                if current.is_empty() || pending.is_some() {
                    return Err(parser.new_unexpected_token_error(Token::Delim(c)));
                }
                pending = Some(match c {
                    '>' => Combinator::Child,
                    '+' => Combinator::NextSibling,
                    _ => Combinator::SubsequentSibling,
                });
            }
            token => {
                if !current.is_empty() && (pending.is_some() || saw_whitespace) {
                    compounds.push(std::mem::take(&mut current));
                    combinators.push(pending.take().unwrap_or(Combinator::Descendant));
                }
                saw_whitespace = false;
                parse_simple(parser, token, &mut current)?;
            }
        }
    }

    if current.is_empty() || pending.is_some() {
        return Err(parser.new_error(BasicParseErrorKind::EndOfInput));
    }
    compounds.push(current);

    Ok(ComplexSelector {
        compounds,
        combinators,
    })
}

fn parse_simple<'i, 't>(
    parser: &mut Parser<'i, 't>,
    token: Token<'i>,
    compound: &mut Compound,
) -> Result<(), ParseError<'i, ()>> {
    match token {
        Token::Ident(name) if compound.is_empty() => {
            compound.local_name = Some(name.to_ascii_lowercase());
        }
        Token::Delim('*') if compound.is_empty() => compound.universal = true,
        Token::IDHash(id) | Token::Hash(id) => compound.id = Some(id.to_string()),
        Token::Delim('.') => {
            let class = match parser.next_including_whitespace()? {
                Token::Ident(class) => class.to_string(),
                other => {
                    let other = other.clone();
                    return Err(parser.new_unexpected_token_error(other));
                }
            };
            compound.classes.push(class);
        }
        Token::SquareBracketBlock => {
            let attribute = parser.parse_nested_block(|p| parse_attribute(p))?;
            compound.attributes.push(attribute);
        }
        other => return Err(parser.new_unexpected_token_error(other)),
    }
    Ok(())
}

fn parse_attribute<'i, 't>(
    parser: &mut Parser<'i, 't>,
) -> Result<AttributeSelector, ParseError<'i, ()>> {
    let name = parser.expect_ident()?.to_ascii_lowercase();

    let operator = match parser.next() {
        Ok(token) => token.clone(),
        Err(_) => {
            return Ok(AttributeSelector {
                name,
                operation: AttributeOperation::Exists,
            })
        }
    };

    let value = parser.expect_ident_or_string()?.to_string();
    let operation = match operator {
        Token::Delim('=') => AttributeOperation::Equals(value),
        Token::IncludeMatch => AttributeOperation::Includes(value),
        Token::DashMatch => AttributeOperation::DashMatch(value),
        Token::PrefixMatch => AttributeOperation::Prefix(value),
        Token::SuffixMatch => AttributeOperation::Suffix(value),
        Token::SubstringMatch => AttributeOperation::Substring(value),
        other => return Err(parser.new_unexpected_token_error(other)),
    };
    parser.expect_exhausted()?;

    Ok(AttributeSelector { name, operation })
}
