//! The wrapped set: an ordered run of element handles with chainable
//! accessors.
//!
//! One convention runs through every method family here: **get-first,
//! set-all**. Reads consult the first element only; writes apply to every
//! element in the set. On an empty selection reads yield `None` and writes
//! are chainable no-ops - nothing in this module returns an error.

use indexmap::IndexMap;
use indextree::NodeId;
use std::cell::RefCell;
use std::rc::Rc;

use crate::dom::Document;
use crate::events::{Callback, Event, ListenerId};
use crate::page::Page;
use crate::parser::import_fragment;
use crate::select::{parse_selector_list, query};
use crate::serialize;
use crate::tracing_macros::debug;

/// Where reattached nodes land relative to the target's existing children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Placement {
    /// Last child (the default).
    #[default]
    Append,
    /// First child.
    Prepend,
}

/// A reattachment target: a selector resolved against the document, a raw
/// node, or another selection (its first element).
pub enum Target {
    Css(String),
    Node(NodeId),
    Nodes(Vec<NodeId>),
}

impl Target {
    fn resolve(self, page: &Page) -> Option<NodeId> {
        match self {
            Target::Css(selector) => page.query_first(&selector),
            Target::Node(id) => Some(id),
            Target::Nodes(ids) => ids.first().copied(),
        }
    }
}

impl From<&str> for Target {
    fn from(s: &str) -> Self {
        Target::Css(s.to_string())
    }
}

impl From<String> for Target {
    fn from(s: String) -> Self {
        Target::Css(s)
    }
}

impl From<NodeId> for Target {
    fn from(id: NodeId) -> Self {
        Target::Node(id)
    }
}

impl From<&Selection> for Target {
    fn from(set: &Selection) -> Self {
        Target::Nodes(set.nodes.clone())
    }
}

impl From<Selection> for Target {
    fn from(set: Selection) -> Self {
        Target::Nodes(set.nodes)
    }
}

/// An ordered set of zero or more elements of a [`Page`], with chainable
/// query and mutation methods.
#[derive(Clone)]
pub struct Selection {
    page: Page,
    nodes: Vec<NodeId>,
}

impl Selection {
    pub(crate) fn new(page: Page, nodes: Vec<NodeId>) -> Self {
        Selection { page, nodes }
    }

    /// The page this selection belongs to.
    pub fn page(&self) -> &Page {
        &self.page
    }

    /// The held nodes, in order.
    pub fn nodes(&self) -> &[NodeId] {
        &self.nodes
    }

    /// The first held node.
    pub fn node(&self) -> Option<NodeId> {
        self.nodes.first().copied()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// A single-element selection per held node, in order.
    pub fn iter(&self) -> impl Iterator<Item = Selection> + '_ {
        self.nodes
            .iter()
            .map(|&id| Selection::new(self.page.clone(), vec![id]))
    }

    /// Query descendants of the first element. Empty selection in, empty
    /// selection out.
    pub fn find(&self, selector: &str) -> Selection {
        let Some(scope) = self.node() else {
            return Selection::new(self.page.clone(), Vec::new());
        };
        let list = parse_selector_list(selector);
        let doc = self.page.doc().borrow();
        let nodes = query(&doc, scope, &list, false);
        drop(doc);
        Selection::new(self.page.clone(), nodes)
    }

    /// Serialize every held node and its subtree.
    pub fn outer_html(&self) -> String {
        let doc = self.page.doc().borrow();
        self.nodes
            .iter()
            .map(|&id| serialize::outer_html(&doc, id))
            .collect()
    }

    /// Run a mutation over every held node. The set-all half of the
    /// convention; returns the selection for chaining.
    fn each(&self, mut f: impl FnMut(&mut Document, NodeId)) -> Selection {
        let mut doc = self.page.doc().borrow_mut();
        for &id in &self.nodes {
            f(&mut doc, id);
        }
        drop(doc);
        self.clone()
    }

    // -----------------------------------------------------------------------
    // Class list
    // -----------------------------------------------------------------------

    /// Class string of the first element (`""` when unset).
    pub fn class_name(&self) -> Option<String> {
        let doc = self.page.doc().borrow();
        self.node()
            .map(|id| doc.attr(id, "class").unwrap_or_default().to_string())
    }

    /// Is `name` in the first element's class list?
    pub fn has_class(&self, name: &str) -> bool {
        self.class_name()
            .is_some_and(|classes| classes.split_whitespace().any(|c| c == name))
    }

    /// Add a class to every element (no-op when already present).
    pub fn add_class(&self, name: &str) -> Selection {
        if name.is_empty() {
            return self.clone();
        }
        self.each(|doc, id| {
            let current = doc.attr(id, "class").unwrap_or_default();
            if current.split_whitespace().any(|c| c == name) {
                return;
            }
            let updated = if current.is_empty() {
                name.to_string()
            } else {
                format!("{current} {name}")
            };
            doc.set_attr(id, "class", &updated);
        })
    }

    /// Remove a class from every element.
    pub fn remove_class(&self, name: &str) -> Selection {
        self.each(|doc, id| {
            let Some(current) = doc.attr(id, "class") else {
                return;
            };
            let updated = current
                .split_whitespace()
                .filter(|&c| c != name)
                .collect::<Vec<_>>()
                .join(" ");
            doc.set_attr(id, "class", &updated);
        })
    }

    /// Toggle a class on every element.
    pub fn toggle_class(&self, name: &str) -> Selection {
        if name.is_empty() {
            return self.clone();
        }
        self.each(|doc, id| {
            let current = doc.attr(id, "class").unwrap_or_default();
            let mut classes: Vec<&str> = current.split_whitespace().collect();
            match classes.iter().position(|&c| c == name) {
                Some(pos) => {
                    classes.remove(pos);
                }
                None => classes.push(name),
            }
            let updated = classes.join(" ");
            doc.set_attr(id, "class", &updated);
        })
    }

    /// Replace the whole class string on every element.
    pub fn set_class(&self, value: &str) -> Selection {
        self.each(|doc, id| doc.set_attr(id, "class", value))
    }

    // -----------------------------------------------------------------------
    // Inline style
    // -----------------------------------------------------------------------

    /// Inline style text of the first element (`""` when unset).
    pub fn style(&self) -> Option<String> {
        let doc = self.page.doc().borrow();
        self.node()
            .map(|id| doc.attr(id, "style").unwrap_or_default().to_string())
    }

    /// Append style text to every element. Declarations are re-normalized;
    /// a later property wins over an earlier one.
    pub fn add_style(&self, text: &str) -> Selection {
        self.each(|doc, id| {
            let current = doc.attr(id, "style").unwrap_or_default();
            let combined = format!("{current};{text}");
            doc.set_attr(id, "style", &write_style(&parse_style(&combined)));
        })
    }

    /// Replace the inline style text on every element.
    pub fn set_style(&self, text: &str) -> Selection {
        self.each(|doc, id| doc.set_attr(id, "style", &write_style(&parse_style(text))))
    }

    /// Merge property/value pairs into every element's inline style.
    pub fn merge_style<'a>(
        &self,
        props: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> Selection {
        let props: Vec<(&str, &str)> = props.into_iter().collect();
        self.each(|doc, id| {
            let mut style = parse_style(doc.attr(id, "style").unwrap_or_default());
            for &(name, value) in &props {
                set_style_prop(&mut style, name, value);
            }
            doc.set_attr(id, "style", &write_style(&style));
        })
    }

    /// Remove the inline style entirely from every element.
    pub fn clear_style(&self) -> Selection {
        self.each(|doc, id| {
            doc.remove_attr(id, "style");
        })
    }

    /// `display: none` on every element.
    pub fn hide(&self) -> Selection {
        self.merge_style([("display", "none")])
    }

    /// Drop the `display` override on every element.
    pub fn show(&self) -> Selection {
        self.merge_style([("display", "")])
    }

    /// Flip each element between hidden and shown.
    pub fn toggle_hidden(&self) -> Selection {
        self.each(|doc, id| {
            let mut style = parse_style(doc.attr(id, "style").unwrap_or_default());
            let hidden = style.get("display").is_some_and(|d| d == "none");
            set_style_prop(&mut style, "display", if hidden { "" } else { "none" });
            doc.set_attr(id, "style", &write_style(&style));
        })
    }

    // -----------------------------------------------------------------------
    // Text and markup content
    // -----------------------------------------------------------------------

    /// Concatenated text of the first element and its descendants.
    pub fn text(&self) -> Option<String> {
        let doc = self.page.doc().borrow();
        self.node().map(|id| doc.text_content(id))
    }

    /// Replace the content of every element with a text node.
    pub fn set_text(&self, value: &str) -> Selection {
        self.each(|doc, id| doc.set_text_content(id, value))
    }

    /// Prepend to every element's text.
    pub fn prepend_text(&self, value: &str) -> Selection {
        self.each(|doc, id| {
            let current = doc.text_content(id);
            doc.set_text_content(id, &format!("{value}{current}"));
        })
    }

    /// Append to every element's text.
    pub fn append_text(&self, value: &str) -> Selection {
        self.each(|doc, id| {
            let current = doc.text_content(id);
            doc.set_text_content(id, &format!("{current}{value}"));
        })
    }

    /// Inner markup of the first element.
    pub fn html(&self) -> Option<String> {
        let doc = self.page.doc().borrow();
        self.node().map(|id| serialize::inner_html(&doc, id))
    }

    /// Replace the content of every element with parsed markup.
    pub fn set_html(&self, html: &str) -> Selection {
        self.each(|doc, id| {
            doc.clear_children(id);
            let nodes = import_fragment(doc, html, false);
            for node in nodes {
                doc.append(id, node);
            }
        })
    }

    // -----------------------------------------------------------------------
    // Attributes
    // -----------------------------------------------------------------------

    /// Attribute value on the first element.
    pub fn attr(&self, name: &str) -> Option<String> {
        let doc = self.page.doc().borrow();
        self.node()
            .and_then(|id| doc.attr(id, name).map(str::to_string))
    }

    /// Set one attribute on every element.
    pub fn set_attr(&self, name: &str, value: &str) -> Selection {
        self.each(|doc, id| doc.set_attr(id, name, value))
    }

    /// Apply a mapping of attributes to every element. A `None` value
    /// removes the attribute.
    pub fn set_attrs<'a>(
        &self,
        pairs: impl IntoIterator<Item = (&'a str, Option<&'a str>)>,
    ) -> Selection {
        let pairs: Vec<(&str, Option<&str>)> = pairs.into_iter().collect();
        self.each(|doc, id| {
            for &(name, value) in &pairs {
                match value {
                    Some(value) => doc.set_attr(id, name, value),
                    None => {
                        doc.remove_attr(id, name);
                    }
                }
            }
        })
    }

    /// Remove one attribute from every element.
    pub fn remove_attr(&self, name: &str) -> Selection {
        self.each(|doc, id| {
            doc.remove_attr(id, name);
        })
    }

    // -----------------------------------------------------------------------
    // Parent / children
    // -----------------------------------------------------------------------

    /// The first element's parent element, wrapped. `None` when the
    /// selection is empty or the element is detached.
    pub fn parent(&self) -> Option<Selection> {
        let doc = self.page.doc().borrow();
        let parent = doc.parent_element(self.node()?)?;
        drop(doc);
        Some(Selection::new(self.page.clone(), vec![parent]))
    }

    /// Move the selection under a new parent.
    ///
    /// Every held element is detached from its current parent, the set is
    /// truncated to its first element, and that element is attached to the
    /// resolved target. An unresolvable target leaves the element detached.
    /// Only one element survives a move per call; callers moving several
    /// elements mount them one at a time.
    pub fn mount(mut self, target: impl Into<Target>, placement: Placement) -> Selection {
        {
            let mut doc = self.page.doc().borrow_mut();
            for &id in &self.nodes {
                doc.detach(id);
            }
        }
        self.nodes.truncate(1);

        let Some(id) = self.node() else {
            return self;
        };
        let Some(parent) = target.into().resolve(&self.page) else {
            debug!("mount: target did not resolve, leaving node detached");
            return self;
        };

        let mut doc = self.page.doc().borrow_mut();
        if !can_adopt(&doc, parent, id) {
            return self.clone();
        }
        match placement {
            Placement::Append => doc.append(parent, id),
            Placement::Prepend => doc.prepend(parent, id),
        }
        drop(doc);
        self
    }

    /// [`mount`](Self::mount) with append placement.
    pub fn append_to(self, target: impl Into<Target>) -> Selection {
        self.mount(target, Placement::Append)
    }

    /// [`mount`](Self::mount) with prepend placement.
    pub fn prepend_to(self, target: impl Into<Target>) -> Selection {
        self.mount(target, Placement::Prepend)
    }

    /// Remove from the tree without reattaching: detaches every held
    /// element and truncates the set to its first element.
    pub fn detach(mut self) -> Selection {
        {
            let mut doc = self.page.doc().borrow_mut();
            for &id in &self.nodes {
                doc.detach(id);
            }
        }
        self.nodes.truncate(1);
        self
    }

    /// One wrapped selection per element child of the first element.
    pub fn children(&self) -> Vec<Selection> {
        let Some(id) = self.node() else {
            return Vec::new();
        };
        let doc = self.page.doc().borrow();
        let children: Vec<NodeId> = doc.element_children(id).collect();
        drop(doc);
        children
            .into_iter()
            .map(|c| Selection::new(self.page.clone(), vec![c]))
            .collect()
    }

    /// Remove every child node of every element.
    pub fn clear_children(&self) -> Selection {
        self.each(|doc, id| doc.clear_children(id))
    }

    /// Attach one resolved node as the last child of the first element.
    pub fn append_child(&self, target: impl Into<Target>) -> Selection {
        self.adopt(target, Placement::Append)
    }

    /// Attach one resolved node as the first child of the first element.
    pub fn prepend_child(&self, target: impl Into<Target>) -> Selection {
        self.adopt(target, Placement::Prepend)
    }

    fn adopt(&self, target: impl Into<Target>, placement: Placement) -> Selection {
        let (Some(parent), Some(child)) = (self.node(), target.into().resolve(&self.page)) else {
            return self.clone();
        };
        let mut doc = self.page.doc().borrow_mut();
        if !can_adopt(&doc, parent, child) {
            return self.clone();
        }
        doc.detach(child);
        match placement {
            Placement::Append => doc.append(parent, child),
            Placement::Prepend => doc.prepend(parent, child),
        }
        drop(doc);
        self.clone()
    }

    /// Replace the children of every element with the given nodes. When the
    /// selection holds several elements the nodes move on, ending up under
    /// the last one - the same way the platform moves a node that is
    /// appended twice.
    pub fn replace_children(&self, nodes: &Selection) -> Selection {
        let replacements = nodes.nodes.clone();
        self.each(|doc, id| {
            doc.clear_children(id);
            for &node in &replacements {
                if !can_adopt(doc, id, node) {
                    continue;
                }
                doc.detach(node);
                doc.append(id, node);
            }
        })
    }

    // -----------------------------------------------------------------------
    // Events
    // -----------------------------------------------------------------------

    /// Register a listener for `event` on every element. Returns an id that
    /// removes this registration from the whole set.
    pub fn bind(&self, event: &str, callback: impl FnMut(&Event) + 'static) -> ListenerId {
        self.bind_inner(event, false, Rc::new(RefCell::new(callback)))
    }

    /// Like [`bind`](Self::bind), but the listener fires at most once per
    /// element.
    pub fn bind_once(&self, event: &str, callback: impl FnMut(&Event) + 'static) -> ListenerId {
        self.bind_inner(event, true, Rc::new(RefCell::new(callback)))
    }

    fn bind_inner(&self, event: &str, once: bool, callback: Callback) -> ListenerId {
        let mut registry = self.page.events().borrow_mut();
        let id = registry.alloc_id();
        for &node in &self.nodes {
            registry.attach(node, event, once, id, callback.clone());
        }
        id
    }

    /// Chainable [`bind`](Self::bind), for when the listener id is not
    /// needed.
    pub fn on(&self, event: &str, callback: impl FnMut(&Event) + 'static) -> Selection {
        self.bind(event, callback);
        self.clone()
    }

    /// Chainable [`bind_once`](Self::bind_once).
    pub fn on_once(&self, event: &str, callback: impl FnMut(&Event) + 'static) -> Selection {
        self.bind_once(event, callback);
        self.clone()
    }

    /// Remove every listener for `event` from every element.
    pub fn off(&self, event: &str) -> Selection {
        let mut registry = self.page.events().borrow_mut();
        for &node in &self.nodes {
            registry.unbind_all(node, event);
        }
        drop(registry);
        self.clone()
    }

    /// Remove one registration (everywhere it was attached) from every
    /// element. Other listeners for the same event stay bound.
    pub fn off_listener(&self, event: &str, id: ListenerId) -> Selection {
        let mut registry = self.page.events().borrow_mut();
        for &node in &self.nodes {
            registry.unbind(node, event, id);
        }
        drop(registry);
        self.clone()
    }

    /// Synchronously fire `event` on every element, in registration order.
    /// Listeners run with no internal borrows held, so they may freely use
    /// the page, bind, or unbind.
    pub fn trigger(&self, event: &str) -> Selection {
        for &node in &self.nodes {
            let batch = self.page.events().borrow_mut().take_batch(node, event);
            if batch.is_empty() {
                continue;
            }
            debug!("dispatching {event:?} to {} listener(s)", batch.len());
            let ev = Event {
                name: event.to_string(),
                target: node,
            };
            for callback in batch {
                (callback.borrow_mut())(&ev);
            }
        }
        self.clone()
    }

    /// Fire a click on every element.
    pub fn click(&self) -> Selection {
        self.trigger("click")
    }

    // -----------------------------------------------------------------------
    // Extensions
    // -----------------------------------------------------------------------

    /// Call a named command registered on the page (see [`Page::register`]).
    /// `None` when no such command exists or the command yields nothing.
    pub fn invoke(&self, name: &str, arg: &str) -> Option<String> {
        let command = self.page.command(name)?;
        command(self, arg)
    }
}

impl std::fmt::Debug for Selection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Selection")
            .field("nodes", &self.nodes)
            .finish_non_exhaustive()
    }
}

/// Reject attachments that would make a node its own ancestor.
fn can_adopt(doc: &Document, parent: NodeId, child: NodeId) -> bool {
    if parent == child {
        return false;
    }
    !child.descendants(&doc.arena).any(|d| d == parent)
}

/// Split inline style text into ordered property/value pairs. Later
/// occurrences of a property override earlier ones in place, the way a
/// browser's `cssText` behaves.
fn parse_style(text: &str) -> IndexMap<String, String> {
    let mut style = IndexMap::new();
    for declaration in text.split(';') {
        let Some((name, value)) = declaration.split_once(':') else {
            continue;
        };
        let name = name.trim();
        let value = value.trim();
        if name.is_empty() || value.is_empty() {
            continue;
        }
        style.insert(name.to_string(), value.to_string());
    }
    style
}

/// An empty value drops the property, matching `style.display = ""`.
fn set_style_prop(style: &mut IndexMap<String, String>, name: &str, value: &str) {
    if value.is_empty() {
        style.shift_remove(name);
    } else {
        style.insert(name.to_string(), value.to_string());
    }
}

fn write_style(style: &IndexMap<String, String>) -> String {
    let mut out = String::new();
    for (name, value) in style {
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(name);
        out.push_str(": ");
        out.push_str(value);
        out.push(';');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn style_text_normalization() {
        let style = parse_style("color: blue; ;width:10px;color:red");
        assert_eq!(write_style(&style), "color: red; width: 10px;");
    }

    #[test]
    fn style_text_garbage_is_dropped() {
        let style = parse_style("not-a-declaration; color:;: red;");
        assert!(style.is_empty());
        assert_eq!(write_style(&style), "");
    }

    #[test]
    fn style_prop_removal() {
        let mut style = parse_style("display: none; color: red;");
        set_style_prop(&mut style, "display", "");
        assert_eq!(write_style(&style), "color: red;");
    }

    #[test]
    fn adoption_guard() {
        let mut doc = Document::new();
        let outer = doc.create_element("div");
        let inner = doc.create_element("span");
        doc.append(outer, inner);
        assert!(!can_adopt(&doc, outer, outer));
        // A node cannot adopt its own ancestor
        assert!(!can_adopt(&doc, inner, outer));
        let p = doc.create_element("p");
        assert!(can_adopt(&doc, outer, p));
    }
}
