use std::rc::Rc;

use encoding_rs::Encoding;
use html5ever::parse_document;
use html5ever::tendril::TendrilSink;
use markup5ever_rcdom::{Handle, NodeData, RcDom};

use crate::core::{SubtitleError, SubtitleResult};

use super::utils::WHITESPACES;

/// 将 HTML 字节转换为 DOM
pub fn html_to_dom(data: &[u8], document_encoding: &str) -> SubtitleResult<RcDom> {
    let s: String = match Encoding::for_label(document_encoding.as_bytes()) {
        Some(encoding) => {
            let (string, _, _) = encoding.decode(data);
            string.to_string()
        }
        None => String::from_utf8_lossy(data).to_string(),
    };

    parse_document(RcDom::default(), Default::default())
        .from_utf8()
        .read_from(&mut s.as_bytes())
        .map_err(|e| SubtitleError::Dom(format!("无法解析HTML: {}", e)))
}

/// 根据名称获取子节点
pub fn get_child_node_by_name(parent: &Handle, node_name: &str) -> Option<Handle> {
    let children = parent.children.borrow();
    let matching_children = children.iter().find(|child| match child.data {
        NodeData::Element { ref name, .. } => &*name.local == node_name,
        _ => false,
    });
    matching_children.cloned()
}

/// 获取文档的 body 节点
pub fn get_body(document: &Handle) -> Option<Handle> {
    get_child_node_by_name(document, "html").and_then(|html| get_child_node_by_name(&html, "body"))
}

/// 获取节点属性值
pub fn get_node_attr(node: &Handle, attr_name: &str) -> Option<String> {
    match &node.data {
        NodeData::Element { attrs, .. } => attrs
            .borrow()
            .iter()
            .find(|attr| &*attr.name.local == attr_name)
            .map(|attr| attr.value.to_string()),
        _ => None,
    }
}

/// 获取节点名称
pub fn get_node_name(node: &Handle) -> Option<&'_ str> {
    match &node.data {
        NodeData::Element { name, .. } => Some(name.local.as_ref()),
        _ => None,
    }
}

pub fn is_element(node: &Handle) -> bool {
    matches!(node.data, NodeData::Element { .. })
}

/// 获取父节点
///
/// `parent` 是 `Cell<Option<Weak>>`，读取时需要放回原值
pub fn get_parent_node(child: &Handle) -> Option<Handle> {
    let weak = child.parent.take();
    let parent = weak.as_ref().and_then(|node| node.upgrade());
    child.parent.set(weak);
    parent
}

/// 设置节点属性，`None` 表示删除该属性
pub fn set_node_attr(node: &Handle, attr_name: &str, attr_value: Option<String>) {
    use html5ever::interface::{Attribute, QualName};
    use html5ever::tendril::format_tendril;
    use html5ever::{namespace_url, ns, LocalName};

    if let NodeData::Element { attrs, .. } = &node.data {
        let attrs_mut = &mut attrs.borrow_mut();
        let mut i = 0;
        let mut found_existing_attr: bool = false;

        while i < attrs_mut.len() {
            if &attrs_mut[i].name.local == attr_name {
                found_existing_attr = true;

                if let Some(attr_value) = attr_value.as_deref() {
                    attrs_mut[i].value.clear();
                    attrs_mut[i].value.push_slice(attr_value);
                } else {
                    // Remove attr completely if attr_value is not defined
                    attrs_mut.remove(i);
                    continue;
                }
            }

            i += 1;
        }

        if !found_existing_attr {
            if let Some(attr_value) = attr_value {
                attrs_mut.push(Attribute {
                    name: QualName::new(None, ns!(), LocalName::from(attr_name)),
                    value: format_tendril!("{}", attr_value),
                });
            }
        }
    };
}

/// 节点的 class 列表
pub fn get_classes(node: &Handle) -> Vec<String> {
    get_node_attr(node, "class")
        .map(|value| {
            value
                .split(WHITESPACES)
                .filter(|c| !c.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

pub fn has_class(node: &Handle, class_name: &str) -> bool {
    get_classes(node).iter().any(|c| c == class_name)
}

/// `node` 本身或其任一祖先带有 `class_name`
pub fn within_class(node: &Handle, class_name: &str) -> bool {
    let mut current = Some(node.clone());
    while let Some(node) = current {
        if has_class(&node, class_name) {
            return true;
        }
        current = get_parent_node(&node);
    }
    false
}

pub fn add_class(node: &Handle, class_name: &str) {
    let mut classes = get_classes(node);
    if !classes.iter().any(|c| c == class_name) {
        classes.push(class_name.to_string());
        set_node_attr(node, "class", Some(classes.join(" ")));
    }
}

pub fn remove_class(node: &Handle, class_name: &str) {
    let classes = get_classes(node);
    if classes.iter().any(|c| c == class_name) {
        let remaining: Vec<String> = classes.into_iter().filter(|c| c != class_name).collect();
        let value = if remaining.is_empty() {
            None
        } else {
            Some(remaining.join(" "))
        };
        set_node_attr(node, "class", value);
    }
}

/// 子元素列表（忽略文本和注释节点）
pub fn element_children(node: &Handle) -> Vec<Handle> {
    node.children
        .borrow()
        .iter()
        .filter(|child| is_element(child))
        .cloned()
        .collect()
}

/// 在同一父节点下排在 `node` 之前的兄弟元素，按文档顺序
pub fn preceding_element_siblings(node: &Handle) -> Vec<Handle> {
    let Some(parent) = get_parent_node(node) else {
        return Vec::new();
    };

    let mut siblings = Vec::new();
    for child in parent.children.borrow().iter() {
        if Rc::ptr_eq(child, node) {
            break;
        }
        if is_element(child) {
            siblings.push(child.clone());
        }
    }
    siblings
}

/// 按文档顺序（先序）访问 `root` 之下的所有元素，不包括 `root` 本身
pub fn for_each_descendant_element<F: FnMut(&Handle)>(root: &Handle, visit: &mut F) {
    for child in root.children.borrow().iter() {
        if is_element(child) {
            visit(child);
        }
        for_each_descendant_element(child, visit);
    }
}

/// 按文档顺序查找带有指定 class 的所有元素
pub fn find_by_class(root: &Handle, class_name: &str) -> Vec<Handle> {
    let mut found = Vec::new();
    for_each_descendant_element(root, &mut |node| {
        if has_class(node, class_name) {
            found.push(node.clone());
        }
    });
    found
}

/// 元素的文本内容，跳过带有 `skip_class` 的子树
pub fn text_content_excluding(node: &Handle, skip_class: &str) -> String {
    let mut text = String::new();
    collect_text(node, skip_class, &mut text);
    text
}

fn collect_text(node: &Handle, skip_class: &str, text: &mut String) {
    match &node.data {
        NodeData::Text { contents } => text.push_str(&contents.borrow()),
        NodeData::Element { .. } if !skip_class.is_empty() && has_class(node, skip_class) => {}
        _ => {
            for child in node.children.borrow().iter() {
                collect_text(child, skip_class, text);
            }
        }
    }
}

/// 元素的完整文本内容
pub fn text_content(node: &Handle) -> String {
    text_content_excluding(node, "")
}

/// 将节点从其父节点中移除
pub fn detach_node(node: &Handle) {
    if let Some(parent) = get_parent_node(node) {
        parent
            .children
            .borrow_mut()
            .retain(|child| !Rc::ptr_eq(child, node));
    }
    node.parent.set(None);
}

/// 将 `child` 追加为 `parent` 的最后一个子节点
pub fn append_child(parent: &Handle, child: &Handle) {
    detach_node(child);
    child.parent.set(Some(Rc::downgrade(parent)));
    parent.children.borrow_mut().push(child.clone());
}
