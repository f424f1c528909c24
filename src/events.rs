//! Per-node event listener registry.
//!
//! The host in the original design (a browser) owned event dispatch; here
//! the registry both records listeners - keyed by node and event name, so
//! they can be removed without a handle to the original closure - and
//! dispatches synchronously when a selection triggers an event.

use indextree::NodeId;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// A synthetic event delivered to listeners.
#[derive(Debug, Clone)]
pub struct Event {
    /// Event name, e.g. `"click"`.
    pub name: String,
    /// The element the event fired on.
    pub target: NodeId,
}

/// Identifies one registered listener, for targeted removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

pub(crate) type Callback = Rc<RefCell<dyn FnMut(&Event)>>;

struct Listener {
    id: ListenerId,
    once: bool,
    callback: Callback,
}

#[derive(Default)]
pub(crate) struct EventRegistry {
    next_id: u64,
    listeners: HashMap<NodeId, HashMap<String, Vec<Listener>>>,
}

impl EventRegistry {
    /// Reserve a listener id. One id can be attached to several nodes, so a
    /// single registration over a multi-element selection removes as a unit.
    pub(crate) fn alloc_id(&mut self) -> ListenerId {
        self.next_id += 1;
        ListenerId(self.next_id)
    }

    pub(crate) fn attach(
        &mut self,
        node: NodeId,
        event: &str,
        once: bool,
        id: ListenerId,
        callback: Callback,
    ) {
        self.listeners
            .entry(node)
            .or_default()
            .entry(event.to_string())
            .or_default()
            .push(Listener { id, once, callback });
    }

    #[cfg(test)]
    fn bind(&mut self, node: NodeId, event: &str, once: bool, callback: Callback) -> ListenerId {
        let id = self.alloc_id();
        self.attach(node, event, once, id, callback);
        id
    }

    /// Remove one listener by id.
    pub(crate) fn unbind(&mut self, node: NodeId, event: &str, id: ListenerId) {
        if let Some(by_event) = self.listeners.get_mut(&node)
            && let Some(list) = by_event.get_mut(event)
        {
            list.retain(|l| l.id != id);
            if list.is_empty() {
                by_event.remove(event);
            }
        }
    }

    /// Remove every listener for an event name on a node.
    pub(crate) fn unbind_all(&mut self, node: NodeId, event: &str) {
        if let Some(by_event) = self.listeners.get_mut(&node) {
            by_event.remove(event);
        }
    }

    /// Collect the callbacks to fire for `node`/`event`, stripping `once`
    /// listeners from the registry before they run. The caller invokes the
    /// batch with no registry borrow held, so listeners may freely bind or
    /// unbind.
    pub(crate) fn take_batch(&mut self, node: NodeId, event: &str) -> Vec<Callback> {
        let Some(list) = self
            .listeners
            .get_mut(&node)
            .and_then(|by_event| by_event.get_mut(event))
        else {
            return Vec::new();
        };
        let batch: Vec<Callback> = list.iter().map(|l| l.callback.clone()).collect();
        list.retain(|l| !l.once);
        batch
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::Document;

    fn noop() -> Callback {
        Rc::new(RefCell::new(|_: &Event| {}))
    }

    #[test]
    fn bind_and_take() {
        let mut doc = Document::new();
        let node = doc.create_element("div");
        let mut reg = EventRegistry::default();
        reg.bind(node, "click", false, noop());
        reg.bind(node, "click", false, noop());
        assert_eq!(reg.take_batch(node, "click").len(), 2);
        // Non-once listeners survive
        assert_eq!(reg.take_batch(node, "click").len(), 2);
        assert_eq!(reg.take_batch(node, "keydown").len(), 0);
    }

    #[test]
    fn once_listeners_are_stripped() {
        let mut doc = Document::new();
        let node = doc.create_element("div");
        let mut reg = EventRegistry::default();
        reg.bind(node, "click", true, noop());
        reg.bind(node, "click", false, noop());
        assert_eq!(reg.take_batch(node, "click").len(), 2);
        assert_eq!(reg.take_batch(node, "click").len(), 1);
    }

    #[test]
    fn unbind_targets_one_listener() {
        let mut doc = Document::new();
        let node = doc.create_element("div");
        let mut reg = EventRegistry::default();
        let a = reg.bind(node, "click", false, noop());
        let _b = reg.bind(node, "click", false, noop());
        reg.unbind(node, "click", a);
        assert_eq!(reg.take_batch(node, "click").len(), 1);
    }

    #[test]
    fn unbind_all_clears_the_entry() {
        let mut doc = Document::new();
        let node = doc.create_element("div");
        let mut reg = EventRegistry::default();
        reg.bind(node, "click", false, noop());
        reg.bind(node, "click", false, noop());
        reg.bind(node, "keydown", false, noop());
        reg.unbind_all(node, "click");
        assert_eq!(reg.take_batch(node, "click").len(), 0);
        assert_eq!(reg.take_batch(node, "keydown").len(), 1);
    }
}
