//! HTML5-correct serialization of arena documents.
//!
//! - Void elements never get end tags
//! - Text content is escaped
//! - Attribute values are escaped and double-quoted
//! - Raw text elements (script, style) are not escaped

use indextree::NodeId;

use crate::dom::{Document, ElementData, NodeKind};

/// HTML5 void elements - these never have end tags.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

/// Raw text elements - content is not escaped.
const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

fn is_void_element(tag: &str) -> bool {
    VOID_ELEMENTS.contains(&tag)
}

fn is_raw_text_element(tag: &str) -> bool {
    RAW_TEXT_ELEMENTS.contains(&tag)
}

/// Serialize the children of a node (innerHTML).
pub fn inner_html(doc: &Document, id: NodeId) -> String {
    let mut out = String::new();
    let raw = doc.tag(id).is_some_and(is_raw_text_element);
    for child in doc.children(id) {
        write_node(doc, child, raw, &mut out);
    }
    out
}

/// Serialize a node and its subtree (outerHTML).
pub fn outer_html(doc: &Document, id: NodeId) -> String {
    let mut out = String::new();
    write_node(doc, id, false, &mut out);
    out
}

/// Serialize the whole document, including the DOCTYPE.
pub fn document_html(doc: &Document) -> String {
    let mut out = String::new();
    if let Some(doctype) = &doc.doctype {
        out.push_str("<!DOCTYPE ");
        out.push_str(doctype);
        out.push('>');
    }
    write_node(doc, doc.root, false, &mut out);
    out
}

fn write_node(doc: &Document, id: NodeId, raw_text: bool, out: &mut String) {
    match &doc.get(id).kind {
        NodeKind::Document => {
            for child in doc.children(id) {
                write_node(doc, child, false, out);
            }
        }
        NodeKind::Element(elem) => write_element(doc, id, elem, out),
        NodeKind::Text(text) => {
            if raw_text {
                out.push_str(text);
            } else {
                escape_text(text, out);
            }
        }
        NodeKind::Comment(text) => {
            out.push_str("<!--");
            out.push_str(text.as_ref());
            out.push_str("-->");
        }
    }
}

fn write_element(doc: &Document, id: NodeId, elem: &ElementData, out: &mut String) {
    let tag = elem.tag.as_ref();

    out.push('<');
    out.push_str(tag);

    for (name, value) in &elem.attrs {
        out.push(' ');
        out.push_str(name);
        out.push_str("=\"");
        escape_attr(value, out);
        out.push('"');
    }

    if is_void_element(tag) {
        out.push('>');
        return;
    }

    out.push('>');

    let raw = is_raw_text_element(tag);
    for child in doc.children(id) {
        write_node(doc, child, raw, out);
    }

    out.push_str("</");
    out.push_str(tag);
    out.push('>');
}

fn escape_text(text: &str, out: &mut String) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
}

fn escape_attr(value: &str, out: &mut String) {
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
}
