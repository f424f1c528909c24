//! A small DOM manipulation library in the jQuery tradition: parse a page,
//! select elements, chain mutations, serialize the result.
//!
//! The entry point is [`Page`]. Its [`select`](Page::select) factory accepts
//! a CSS selector, an HTML fragment, nodes, or an existing selection, and
//! returns a [`Selection`] - an ordered element set where reads consult the
//! first element and writes apply to all of them.
//!
//! ```
//! use sprig::Page;
//!
//! let page = Page::parse("<html><body><p class=\"a\">one</p><p>two</p></body></html>");
//!
//! let paragraphs = page.select("p");
//! assert_eq!(paragraphs.len(), 2);
//! assert_eq!(paragraphs.text().as_deref(), Some("one"));
//!
//! paragraphs.add_class("note").set_attr("data-seen", "yes");
//! assert!(page.select("p.note[data-seen]").len() == 2);
//!
//! let card = page.select("<div class=\"card\">hi</div>").append_to("body");
//! assert!(card.parent().is_some());
//! assert!(page.html().contains("<div class=\"card\">hi</div>"));
//! ```
//!
//! Operations never fail: selectors that match nothing, unknown attributes,
//! or empty selections all yield empty results and chainable no-ops.

mod tracing_macros;

pub mod dom;
pub mod events;
pub mod page;
pub mod parser;
pub mod select;
pub mod selection;
pub mod serialize;

pub use dom::{Document, ElementData, Namespace, NodeData, NodeKind};
pub use events::{Event, ListenerId};
pub use page::{Input, Page, Plugin};
pub use select::{SelectorList, parse_selector_list};
pub use selection::{Placement, Selection, Target};

/// Library version, prefixed the way the library reports it: `v0.1.0`.
pub const VERSION: &str = concat!("v", env!("CARGO_PKG_VERSION"));
