//! The library entry point: a shared document plus its registries.
//!
//! `Page` replaces the original design's globals (the factory's static
//! surface, the process-wide stylesheet map, the shared prototype) with
//! explicit state owned by one cloneable handle. Clones share the same
//! document, listeners, stylesheets, and extensions.

use indexmap::IndexMap;
use indextree::NodeId;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::dom::Document;
use crate::events::EventRegistry;
use crate::select::{SelectorList, parse_selector_list, query};
use crate::selection::Selection;
use crate::serialize::document_html;
use crate::parser;
use crate::tracing_macros::debug;

/// A named extension command, callable through [`Selection::invoke`].
pub(crate) type Command = Rc<dyn Fn(&Selection, &str) -> Option<String>>;

/// An extension that installs capabilities onto a page.
///
/// Implement the trait for richer plugins, or pass a plain closure - any
/// `Fn(&Page)` is a plugin.
pub trait Plugin {
    fn install(&self, page: &Page);
}

impl<F: Fn(&Page)> Plugin for F {
    fn install(&self, page: &Page) {
        self(page)
    }
}

/// Injected stylesheets: id to the `<style>` node in `<head>`.
#[derive(Default)]
struct StyleRegistry {
    next_index: u32,
    entries: IndexMap<String, NodeId>,
}

/// A live HTML document with selection, events, stylesheets, and extensions.
///
/// Cheap to clone; clones share everything.
#[derive(Clone)]
pub struct Page {
    doc: Rc<RefCell<Document>>,
    events: Rc<RefCell<EventRegistry>>,
    styles: Rc<RefCell<StyleRegistry>>,
    commands: Rc<RefCell<HashMap<String, Command>>>,
}

/// Anything the selection factory accepts.
pub enum Input {
    /// Markup (contains `<`) or a CSS selector.
    Text(String),
    /// A single node.
    Node(NodeId),
    /// Several nodes, in order. Duplicates are kept.
    Nodes(Vec<NodeId>),
    /// An existing selection - passed through unchanged.
    Set(Selection),
}

impl From<&str> for Input {
    fn from(s: &str) -> Self {
        Input::Text(s.to_string())
    }
}

impl From<String> for Input {
    fn from(s: String) -> Self {
        Input::Text(s)
    }
}

impl From<NodeId> for Input {
    fn from(id: NodeId) -> Self {
        Input::Node(id)
    }
}

impl From<Vec<NodeId>> for Input {
    fn from(ids: Vec<NodeId>) -> Self {
        Input::Nodes(ids)
    }
}

impl From<&[NodeId]> for Input {
    fn from(ids: &[NodeId]) -> Self {
        Input::Nodes(ids.to_vec())
    }
}

impl From<Selection> for Input {
    fn from(set: Selection) -> Self {
        Input::Set(set)
    }
}

impl From<&Selection> for Input {
    fn from(set: &Selection) -> Self {
        Input::Set(set.clone())
    }
}

impl Page {
    /// An empty page: `<html>` with an empty `<head>` and `<body>`.
    pub fn new() -> Self {
        Self::from_document(Document::new())
    }

    /// Parse a full HTML document into a page.
    pub fn parse(html: &str) -> Self {
        Self::from_document(parser::parse(html))
    }

    fn from_document(doc: Document) -> Self {
        Page {
            doc: Rc::new(RefCell::new(doc)),
            events: Rc::new(RefCell::new(EventRegistry::default())),
            styles: Rc::new(RefCell::new(StyleRegistry::default())),
            commands: Rc::new(RefCell::new(HashMap::new())),
        }
    }

    pub(crate) fn doc(&self) -> &Rc<RefCell<Document>> {
        &self.doc
    }

    pub(crate) fn events(&self) -> &Rc<RefCell<EventRegistry>> {
        &self.events
    }

    pub(crate) fn command(&self, name: &str) -> Option<Command> {
        self.commands.borrow().get(name).cloned()
    }

    /// The selection factory.
    ///
    /// - markup (any string containing `<`) wraps the fragment's top-level
    ///   elements, detached from the document;
    /// - any other string runs as a CSS query over the whole document;
    /// - nodes wrap as given; an existing selection passes through unchanged.
    ///
    /// Never fails: unknown or unmatched input yields an empty selection.
    pub fn select(&self, input: impl Into<Input>) -> Selection {
        match input.into() {
            Input::Text(text) => {
                if text.contains('<') {
                    let nodes = parser::import_fragment(&mut self.doc.borrow_mut(), &text, true);
                    Selection::new(self.clone(), nodes)
                } else {
                    self.query(&parse_selector_list(&text))
                }
            }
            Input::Node(id) => Selection::new(self.clone(), vec![id]),
            Input::Nodes(ids) => Selection::new(self.clone(), ids),
            Input::Set(set) => set,
        }
    }

    pub(crate) fn query(&self, list: &SelectorList) -> Selection {
        let doc = self.doc.borrow();
        let nodes = query(&doc, doc.root, list, true);
        drop(doc);
        Selection::new(self.clone(), nodes)
    }

    pub(crate) fn query_first(&self, selector: &str) -> Option<NodeId> {
        let list = parse_selector_list(selector);
        let doc = self.doc.borrow();
        query(&doc, doc.root, &list, true).into_iter().next()
    }

    /// The `<body>` element as a selection (empty if the document lacks one).
    pub fn body(&self) -> Selection {
        let body = self.doc.borrow().body();
        Selection::new(self.clone(), body.into_iter().collect())
    }

    /// The `<head>` element as a selection (empty if the document lacks one).
    pub fn head(&self) -> Selection {
        let head = self.doc.borrow().head();
        Selection::new(self.clone(), head.into_iter().collect())
    }

    /// Serialize the whole document, including the DOCTYPE.
    pub fn html(&self) -> String {
        document_html(&self.doc.borrow())
    }

    // -----------------------------------------------------------------------
    // Extensions
    // -----------------------------------------------------------------------

    /// Install a plugin. Chainable.
    pub fn install(&self, plugin: impl Plugin) -> &Self {
        plugin.install(self);
        self
    }

    /// Register a named command, later callable on any selection of this
    /// page via [`Selection::invoke`]. Replaces an existing command with the
    /// same name. Chainable.
    pub fn register(
        &self,
        name: impl Into<String>,
        command: impl Fn(&Selection, &str) -> Option<String> + 'static,
    ) -> &Self {
        self.commands
            .borrow_mut()
            .insert(name.into(), Rc::new(command));
        self
    }

    // -----------------------------------------------------------------------
    // Injected stylesheets
    // -----------------------------------------------------------------------

    /// Insert a `<style>` element into `<head>` under an auto-generated id.
    /// Returns the id, or `None` if the document has no head.
    pub fn inject_css(&self, content: &str) -> Option<String> {
        let id = {
            let mut styles = self.styles.borrow_mut();
            styles.next_index += 1;
            format!("sprig-css-{}", styles.next_index)
        };
        self.inject_css_as(&id, content)
    }

    /// Insert a `<style>` element into `<head>` under a caller-supplied id.
    ///
    /// No-op returning `None` when the id is already registered, an element
    /// with that id already exists in the document, or the document has no
    /// head.
    pub fn inject_css_as(&self, id: &str, content: &str) -> Option<String> {
        if self.styles.borrow().entries.contains_key(id) {
            return None;
        }
        if self.has_element_with_id(id) {
            return None;
        }

        let mut doc = self.doc.borrow_mut();
        let head = doc.head()?;
        let style = doc.create_element("style");
        doc.set_attr(style, "id", id);
        let text = doc.create_text(content);
        doc.append(style, text);
        doc.append(head, style);
        drop(doc);

        debug!("injected stylesheet {id:?} ({} bytes)", content.len());
        self.styles
            .borrow_mut()
            .entries
            .insert(id.to_string(), style);
        Some(id.to_string())
    }

    fn has_element_with_id(&self, id: &str) -> bool {
        let doc = self.doc.borrow();
        doc.root
            .descendants(&doc.arena)
            .any(|n| doc.attr(n, "id") == Some(id))
    }

    /// Remove an injected stylesheet by id. Returns whether one was removed.
    pub fn remove_css(&self, id: &str) -> bool {
        let Some(node) = self.styles.borrow_mut().entries.shift_remove(id) else {
            return false;
        };
        self.doc.borrow_mut().detach(node);
        true
    }

    /// Remove every injected stylesheet.
    pub fn clear_css(&self) {
        let mut styles = self.styles.borrow_mut();
        let mut doc = self.doc.borrow_mut();
        for (_, node) in styles.entries.drain(..) {
            doc.detach(node);
        }
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Page {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Page").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inject_css_generates_ids() {
        let page = Page::new();
        let a = page.inject_css("p { color: red }").unwrap();
        let b = page.inject_css("b { color: blue }").unwrap();
        assert_ne!(a, b);
        let html = page.html();
        assert!(html.contains(&format!("<style id=\"{a}\">p {{ color: red }}</style>")));
        assert!(html.contains(&format!("id=\"{b}\"")));
    }

    #[test]
    fn inject_css_as_rejects_duplicates() {
        let page = Page::new();
        assert_eq!(page.inject_css_as("theme", "p {}").as_deref(), Some("theme"));
        assert_eq!(page.inject_css_as("theme", "b {}"), None);
    }

    #[test]
    fn inject_css_as_respects_existing_document_ids() {
        let page = Page::parse(r#"<html><head></head><body><div id="theme"></div></body></html>"#);
        assert_eq!(page.inject_css_as("theme", "p {}"), None);
    }

    #[test]
    fn remove_css_detaches_the_style_element() {
        let page = Page::new();
        let id = page.inject_css_as("x", "p {}").unwrap();
        assert!(page.html().contains("<style"));
        assert!(page.remove_css(&id));
        assert!(!page.html().contains("<style"));
        assert!(!page.remove_css(&id));
    }

    #[test]
    fn clear_css_removes_everything() {
        let page = Page::new();
        page.inject_css("a {}");
        page.inject_css("b {}");
        page.clear_css();
        assert!(!page.html().contains("<style"));
        // Cleared ids are free again
        assert!(page.inject_css_as("sprig-css-1", "c {}").is_some());
    }

    #[test]
    fn plain_function_is_a_plugin() {
        let page = Page::new();
        page.install(|p: &Page| {
            p.register("noop", |_, _| None);
        });
        assert!(page.command("noop").is_some());
    }
}
