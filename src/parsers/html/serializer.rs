use encoding_rs::Encoding;
use html5ever::serialize::{serialize, SerializeOpts};
use markup5ever_rcdom::{RcDom, SerializableHandle};

use crate::core::{SubtitleError, SubtitleResult};

/// 序列化文档
///
/// `document_encoding` 为空或无法识别时输出 UTF-8
pub fn serialize_document(dom: &RcDom, document_encoding: &str) -> SubtitleResult<Vec<u8>> {
    let mut buf: Vec<u8> = Vec::new();

    let serializable: SerializableHandle = dom.document.clone().into();
    serialize(&mut buf, &serializable, SerializeOpts::default())
        .map_err(|e| SubtitleError::Dom(format!("无法序列化DOM: {}", e)))?;

    if !document_encoding.is_empty() {
        if let Some(encoding) = Encoding::for_label(document_encoding.as_bytes()) {
            let s: &str = &String::from_utf8_lossy(&buf);
            let (data, _, _) = encoding.encode(s);
            buf = data.to_vec();
        }
    }

    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsers::html::dom::html_to_dom;

    #[test]
    fn serializes_parsed_document() {
        let dom = html_to_dom(b"<p class=\"a\">Hello &amp; bye</p>", "utf-8").unwrap();
        let html = String::from_utf8(serialize_document(&dom, "utf-8").unwrap()).unwrap();

        assert!(html.contains("<p class=\"a\">Hello &amp; bye</p>"));
    }
}
