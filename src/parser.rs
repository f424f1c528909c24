//! HTML5 parsing via html5ever's TreeSink, building directly into the arena.
//!
//! Uses html5ever's tree construction algorithm, which includes
//! browser-compatible error recovery: anything a browser accepts, this
//! accepts. Parsed strings are subtendrils of the source buffer, so text is
//! not copied.

use html5ever::tendril::{StrTendril, TendrilSink};
use html5ever::tree_builder::{ElemName, ElementFlags, NodeOrText, QuirksMode, TreeSink};
use html5ever::{Attribute, LocalName, QualName, parse_document};
use html5ever::{local_name, namespace_url, ns};
use indexmap::IndexMap;
use indextree::{Arena, NodeId};
use std::borrow::Cow;
use std::cell::RefCell;

use crate::dom::{Document, ElementData, Namespace, NodeData, NodeKind};
use crate::tracing_macros::trace;

/// Parse a full HTML document into an arena-based [`Document`].
pub fn parse(html: &str) -> Document {
    let sink = ArenaSink::new();
    // html5ever creates subtendrils that share this buffer via refcounting
    let tendril = StrTendril::from(html);
    parse_document(sink, Default::default()).one(tendril)
}

/// Parse an HTML fragment and graft its top-level nodes into `doc`'s arena.
///
/// The fragment goes through a full document parse in a scratch arena, then
/// the resulting `<head>`/`<body>` content is deep-copied into `doc`,
/// detached. Metadata content (`<style>`, `<script>`, `<title>`...) lands in
/// the scratch head and is collected first, everything else comes from the
/// scratch body.
///
/// With `elements_only`, top-level text and comments are dropped - the
/// behavior of wrapping markup through the selection factory. Without it,
/// every node kind survives - innerHTML behavior.
pub fn import_fragment(doc: &mut Document, html: &str, elements_only: bool) -> Vec<NodeId> {
    let scratch = parse(html);
    let mut top_level: Vec<NodeId> = Vec::new();
    for section in [scratch.head(), scratch.body()].into_iter().flatten() {
        top_level.extend(scratch.children(section));
    }

    let mut out = Vec::new();
    for id in top_level {
        if elements_only && !scratch.is_element(id) {
            continue;
        }
        out.push(doc.import(&scratch, id));
    }
    trace!("imported fragment: {} top-level node(s)", out.len());
    out
}

/// Owned element name wrapper
#[derive(Debug, Clone)]
struct OwnedElemName(QualName);

impl ElemName for OwnedElemName {
    fn ns(&self) -> &html5ever::Namespace {
        &self.0.ns
    }

    fn local_name(&self) -> &LocalName {
        &self.0.local
    }
}

/// TreeSink implementation for building the arena-based DOM
struct ArenaSink {
    /// The arena under construction - RefCell for interior mutability
    arena: RefCell<Arena<NodeData>>,

    /// Document node (parent of `<html>`)
    document: NodeId,

    /// DOCTYPE encountered during parse
    doctype: RefCell<Option<StrTendril>>,
}

impl ArenaSink {
    fn new() -> Self {
        let mut arena = Arena::new();

        let document = arena.new_node(NodeData {
            kind: NodeKind::Document,
            ns: Namespace::Html,
        });

        ArenaSink {
            arena: RefCell::new(arena),
            document,
            doctype: RefCell::new(None),
        }
    }
}

impl TreeSink for ArenaSink {
    type Handle = NodeId;
    type Output = Document;
    type ElemName<'a>
        = OwnedElemName
    where
        Self: 'a;

    fn finish(self) -> Self::Output {
        let arena = self.arena.into_inner();

        // Find the root element (usually <html>)
        let root = self
            .document
            .children(&arena)
            .next()
            .unwrap_or(self.document);

        Document {
            arena,
            root,
            doctype: self.doctype.into_inner(),
        }
    }

    fn parse_error(&self, _msg: Cow<'static, str>) {
        // Ignore parse errors (html5ever recovers automatically)
    }

    fn get_document(&self) -> Self::Handle {
        self.document
    }

    fn set_quirks_mode(&self, _mode: QuirksMode) {
        // Quirks mode has no effect on the tree we build
    }

    fn same_node(&self, a: &Self::Handle, b: &Self::Handle) -> bool {
        a == b
    }

    fn elem_name<'a>(&'a self, target: &'a Self::Handle) -> OwnedElemName {
        let arena = self.arena.borrow();
        let node = &arena[*target].get();

        if let NodeKind::Element(elem) = &node.kind {
            let tag = elem.tag.as_ref();
            let local_name = LocalName::from(tag);
            let ns = match node.ns {
                Namespace::Html => ns!(html),
                Namespace::Svg => ns!(svg),
                Namespace::MathMl => ns!(mathml),
            };

            OwnedElemName(QualName {
                prefix: None,
                ns,
                local: local_name,
            })
        } else {
            // Not an element - return placeholder
            OwnedElemName(QualName {
                prefix: None,
                ns: ns!(html),
                local: local_name!(""),
            })
        }
    }

    fn create_element(
        &self,
        name: QualName,
        attrs: Vec<Attribute>,
        _flags: ElementFlags,
    ) -> Self::Handle {
        let tag = StrTendril::from(name.local.as_ref());
        let ns = Namespace::from_url(name.ns.as_ref());

        // IndexMap preserves insertion order from HTML
        let attr_map: IndexMap<_, _> = attrs
            .into_iter()
            .map(|attr| {
                let key = attr.name.local.to_string();
                let value = attr.value.clone(); // StrTendril clone is cheap (refcounted)
                (key, value)
            })
            .collect();

        self.arena.borrow_mut().new_node(NodeData {
            kind: NodeKind::Element(ElementData {
                tag,
                attrs: attr_map,
            }),
            ns,
        })
    }

    fn create_comment(&self, text: StrTendril) -> Self::Handle {
        self.arena.borrow_mut().new_node(NodeData {
            kind: NodeKind::Comment(text),
            ns: Namespace::Html,
        })
    }

    fn create_pi(&self, _target: StrTendril, _data: StrTendril) -> Self::Handle {
        // Processing instructions - create empty comment
        self.arena.borrow_mut().new_node(NodeData {
            kind: NodeKind::Comment(StrTendril::new()),
            ns: Namespace::Html,
        })
    }

    fn append(&self, parent: &Self::Handle, child: NodeOrText<Self::Handle>) {
        let mut arena = self.arena.borrow_mut();
        match child {
            NodeOrText::AppendNode(node) => {
                parent.append(node, &mut *arena);
            }
            NodeOrText::AppendText(text) => {
                // Try to merge with previous text node (html5ever behavior)
                let last_child_id = parent.children(&arena).next_back();

                if let Some(last_child) = last_child_id {
                    if let NodeKind::Text(existing) = &mut arena[last_child].get_mut().kind {
                        // Merge text - push_tendril shares buffers when possible
                        existing.push_tendril(&text);
                        return;
                    }
                }

                let text_node = arena.new_node(NodeData::text(text));
                parent.append(text_node, &mut arena);
            }
        }
    }

    fn append_before_sibling(&self, sibling: &Self::Handle, new_node: NodeOrText<Self::Handle>) {
        let mut arena = self.arena.borrow_mut();
        match new_node {
            NodeOrText::AppendNode(node) => {
                sibling.insert_before(node, &mut *arena);
            }
            NodeOrText::AppendText(text) => {
                let text_node = arena.new_node(NodeData::text(text));
                sibling.insert_before(text_node, &mut *arena);
            }
        }
    }

    fn append_based_on_parent_node(
        &self,
        element: &Self::Handle,
        _prev_element: &Self::Handle,
        child: NodeOrText<Self::Handle>,
    ) {
        self.append(element, child);
    }

    fn append_doctype_to_document(
        &self,
        name: StrTendril,
        _public_id: StrTendril,
        _system_id: StrTendril,
    ) {
        *self.doctype.borrow_mut() = Some(name);
    }

    fn get_template_contents(&self, target: &Self::Handle) -> Self::Handle {
        // For <template>, return the element itself
        *target
    }

    fn add_attrs_if_missing(&self, target: &Self::Handle, attrs: Vec<Attribute>) {
        let mut arena = self.arena.borrow_mut();
        let node = &mut arena[*target].get_mut();
        if let NodeKind::Element(elem) = &mut node.kind {
            for attr in attrs {
                let key = attr.name.local.to_string();
                elem.attrs.entry(key).or_insert_with(|| attr.value.clone());
            }
        }
    }

    fn remove_from_parent(&self, target: &Self::Handle) {
        target.detach(&mut self.arena.borrow_mut());
    }

    fn reparent_children(&self, node: &Self::Handle, new_parent: &Self::Handle) {
        let mut arena = self.arena.borrow_mut();
        let children: Vec<NodeId> = node.children(&*arena).collect();
        for child in children {
            child.detach(&mut *arena);
            new_parent.append(child, &mut *arena);
        }
    }
}
