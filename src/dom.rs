//! Arena-based DOM shared by every selection.
//!
//! All nodes live in one indextree `Arena` (contiguous memory, cheap ids).
//! Strings are `StrTendril`s so text parsed from source HTML shares the
//! source buffer via refcounting instead of being copied.

use html5ever::tendril::StrTendril;
use indexmap::IndexMap;
use indextree::{Arena, NodeId};

/// Document = Arena plus a root element and an optional DOCTYPE.
#[derive(Debug, Clone)]
pub struct Document {
    /// THE tree - all nodes live here
    pub arena: Arena<NodeData>,

    /// Root node (usually `<html>` element)
    pub root: NodeId,

    /// DOCTYPE if present (usually "html")
    pub doctype: Option<StrTendril>,
}

/// What goes in each arena slot
#[derive(Debug, Clone)]
pub struct NodeData {
    pub kind: NodeKind,
    pub ns: Namespace,
}

impl NodeData {
    pub(crate) fn element(tag: StrTendril) -> Self {
        NodeData {
            kind: NodeKind::Element(ElementData {
                tag,
                attrs: IndexMap::new(),
            }),
            ns: Namespace::Html,
        }
    }

    pub(crate) fn text(text: StrTendril) -> Self {
        NodeData {
            kind: NodeKind::Text(text),
            ns: Namespace::Html,
        }
    }
}

/// Node types
#[derive(Debug, Clone)]
pub enum NodeKind {
    /// Document root (invisible, parent of `<html>`)
    Document,
    /// Element with tag and attributes
    Element(ElementData),
    /// Text content (StrTendril is refcounted - cheap to clone)
    Text(StrTendril),
    /// HTML comment
    Comment(StrTendril),
}

/// Element data (tag + attributes)
#[derive(Debug, Clone)]
pub struct ElementData {
    /// Tag name (lowercase for HTML)
    pub tag: StrTendril,

    /// Attributes - keys are String, values are StrTendril.
    /// IndexMap preserves insertion order for consistent serialization.
    pub attrs: IndexMap<String, StrTendril>,
}

/// XML namespace
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Namespace {
    Html,
    Svg,
    MathMl,
}

impl Namespace {
    pub fn from_url(url: &str) -> Self {
        match url {
            "http://www.w3.org/1999/xhtml" => Namespace::Html,
            "http://www.w3.org/2000/svg" => Namespace::Svg,
            "http://www.w3.org/1998/Math/MathML" => Namespace::MathMl,
            _ => Namespace::Html, // default
        }
    }

    pub fn url(&self) -> &'static str {
        match self {
            Namespace::Html => "http://www.w3.org/1999/xhtml",
            Namespace::Svg => "http://www.w3.org/2000/svg",
            Namespace::MathMl => "http://www.w3.org/1998/Math/MathML",
        }
    }
}

impl Document {
    /// Create an empty HTML5 document: `<html>` with `<head>` and `<body>`.
    pub fn new() -> Self {
        let mut arena = Arena::new();
        let document = arena.new_node(NodeData {
            kind: NodeKind::Document,
            ns: Namespace::Html,
        });
        let html = arena.new_node(NodeData::element("html".into()));
        let head = arena.new_node(NodeData::element("head".into()));
        let body = arena.new_node(NodeData::element("body".into()));
        document.append(html, &mut arena);
        html.append(head, &mut arena);
        html.append(body, &mut arena);

        Document {
            arena,
            root: html,
            doctype: Some("html".into()),
        }
    }

    /// Get immutable reference to node data
    pub fn get(&self, id: NodeId) -> &NodeData {
        self.arena[id].get()
    }

    /// Get mutable reference to node data
    pub fn get_mut(&mut self, id: NodeId) -> &mut NodeData {
        self.arena[id].get_mut()
    }

    /// Iterate children of a node
    pub fn children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        id.children(&self.arena)
    }

    /// Iterate only the element children of a node
    pub fn element_children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        id.children(&self.arena).filter(|&c| self.is_element(c))
    }

    /// Get the `<body>` element if present
    pub fn body(&self) -> Option<NodeId> {
        self.find_root_child("body")
    }

    /// Get the `<head>` element if present
    pub fn head(&self) -> Option<NodeId> {
        self.find_root_child("head")
    }

    fn find_root_child(&self, tag: &str) -> Option<NodeId> {
        self.root.children(&self.arena).find(|&id| {
            if let NodeKind::Element(elem) = &self.arena[id].get().kind {
                elem.tag.as_ref() == tag
            } else {
                false
            }
        })
    }

    /// True if the node is an element
    pub fn is_element(&self, id: NodeId) -> bool {
        matches!(self.get(id).kind, NodeKind::Element(_))
    }

    /// Element data, if the node is an element
    pub fn elem(&self, id: NodeId) -> Option<&ElementData> {
        match &self.get(id).kind {
            NodeKind::Element(elem) => Some(elem),
            _ => None,
        }
    }

    /// Mutable element data, if the node is an element
    pub fn elem_mut(&mut self, id: NodeId) -> Option<&mut ElementData> {
        match &mut self.get_mut(id).kind {
            NodeKind::Element(elem) => Some(elem),
            _ => None,
        }
    }

    /// Tag name, if the node is an element
    pub fn tag(&self, id: NodeId) -> Option<&str> {
        self.elem(id).map(|e| e.tag.as_ref())
    }

    /// Parent of a node, skipping the invisible document node
    pub fn parent_element(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.arena[id].parent()?;
        self.is_element(parent).then_some(parent)
    }

    /// Get an attribute value
    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.elem(id)?.attrs.get(name).map(|v| v.as_ref())
    }

    /// Set an attribute value (no-op on non-elements)
    pub fn set_attr(&mut self, id: NodeId, name: &str, value: &str) {
        if let Some(elem) = self.elem_mut(id) {
            elem.attrs.insert(name.to_string(), StrTendril::from(value));
        }
    }

    /// Remove an attribute. Returns the old value if it existed.
    pub fn remove_attr(&mut self, id: NodeId, name: &str) -> Option<StrTendril> {
        self.elem_mut(id)?.attrs.shift_remove(name)
    }

    /// Create a detached element node
    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.arena.new_node(NodeData::element(StrTendril::from(tag)))
    }

    /// Create a detached text node
    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.arena.new_node(NodeData::text(StrTendril::from(text)))
    }

    /// Detach a node from its parent (the node and its subtree stay alive)
    pub fn detach(&mut self, id: NodeId) {
        id.detach(&mut self.arena);
    }

    /// Append `child` as the last child of `parent`
    pub fn append(&mut self, parent: NodeId, child: NodeId) {
        parent.append(child, &mut self.arena);
    }

    /// Insert `child` as the first child of `parent`
    pub fn prepend(&mut self, parent: NodeId, child: NodeId) {
        parent.prepend(child, &mut self.arena);
    }

    /// Detach every child of a node
    pub fn clear_children(&mut self, id: NodeId) {
        let children: Vec<NodeId> = id.children(&self.arena).collect();
        for child in children {
            child.detach(&mut self.arena);
        }
    }

    /// Concatenated text of the node and all descendants
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(id, &mut out);
        out
    }

    fn collect_text(&self, id: NodeId, out: &mut String) {
        match &self.get(id).kind {
            NodeKind::Text(t) => out.push_str(t),
            NodeKind::Comment(_) => {}
            _ => {
                for child in id.children(&self.arena) {
                    self.collect_text(child, out);
                }
            }
        }
    }

    /// Replace the node's content with a single text node.
    /// An empty string just clears the children.
    pub fn set_text_content(&mut self, id: NodeId, text: &str) {
        self.clear_children(id);
        if !text.is_empty() {
            let text_node = self.create_text(text);
            self.append(id, text_node);
        }
    }

    /// Deep-copy a subtree from another document's arena into this one.
    /// Returns the id of the copied root, detached.
    pub fn import(&mut self, src: &Document, src_id: NodeId) -> NodeId {
        let data = src.get(src_id).clone();
        let copy = self.arena.new_node(data);
        let children: Vec<NodeId> = src_id.children(&src.arena).collect();
        for child in children {
            let child_copy = self.import(src, child);
            copy.append(child_copy, &mut self.arena);
        }
        copy
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_structure() {
        let doc = Document::new();
        assert_eq!(doc.tag(doc.root), Some("html"));
        assert!(doc.head().is_some());
        assert!(doc.body().is_some());
        assert_eq!(doc.doctype.as_deref(), Some("html"));
    }

    #[test]
    fn attr_roundtrip() {
        let mut doc = Document::new();
        let div = doc.create_element("div");
        assert_eq!(doc.attr(div, "id"), None);
        doc.set_attr(div, "id", "main");
        assert_eq!(doc.attr(div, "id"), Some("main"));
        assert_eq!(doc.remove_attr(div, "id").as_deref(), Some("main"));
        assert_eq!(doc.attr(div, "id"), None);
    }

    #[test]
    fn text_content_walks_descendants() {
        let mut doc = Document::new();
        let div = doc.create_element("div");
        let hello = doc.create_text("Hello ");
        let span = doc.create_element("span");
        let world = doc.create_text("world");
        doc.append(div, hello);
        doc.append(span, world);
        doc.append(div, span);
        assert_eq!(doc.text_content(div), "Hello world");
    }

    #[test]
    fn set_text_content_replaces_children() {
        let mut doc = Document::new();
        let div = doc.create_element("div");
        let span = doc.create_element("span");
        doc.append(div, span);
        doc.set_text_content(div, "plain");
        assert_eq!(doc.children(div).count(), 1);
        assert_eq!(doc.text_content(div), "plain");
        doc.set_text_content(div, "");
        assert_eq!(doc.children(div).count(), 0);
    }

    #[test]
    fn detach_keeps_subtree() {
        let mut doc = Document::new();
        let body = doc.body().unwrap();
        let div = doc.create_element("div");
        let text = doc.create_text("kept");
        doc.append(div, text);
        doc.append(body, div);
        assert_eq!(doc.parent_element(div), Some(body));

        doc.detach(div);
        assert_eq!(doc.parent_element(div), None);
        assert_eq!(doc.text_content(div), "kept");
        assert_eq!(doc.children(body).count(), 0);
    }

    #[test]
    fn import_deep_copies() {
        let mut src = Document::new();
        let div = src.create_element("div");
        src.set_attr(div, "class", "box");
        let text = src.create_text("content");
        src.append(div, text);

        let mut dst = Document::new();
        let copy = dst.import(&src, div);
        assert_eq!(dst.tag(copy), Some("div"));
        assert_eq!(dst.attr(copy, "class"), Some("box"));
        assert_eq!(dst.text_content(copy), "content");
        // Source untouched
        assert_eq!(src.text_content(div), "content");
    }
}
