//! A small CSS selector engine for querying the arena DOM.
//!
//! Supports type/universal/id/class/attribute simple selectors, compound
//! selectors, the four combinators, and comma-separated lists. Parsing is
//! permissive: a malformed selector yields an empty list, which matches
//! nothing - queries never fail.

use indextree::NodeId;

use crate::dom::{Document, ElementData};

/// Combinator between compound selectors in a complex selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combinator {
    /// Whitespace: ancestor descendant
    Descendant,
    /// `>`: parent > child
    Child,
    /// `+`: prev + next
    NextSibling,
    /// `~`: prev ~ subsequent
    SubsequentSibling,
}

/// Attribute selector operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttrOp {
    /// `[attr]`
    Exists,
    /// `[attr=val]`
    Eq,
    /// `[attr~=val]`
    Includes,
    /// `[attr|=val]`
    DashMatch,
    /// `[attr^=val]`
    Prefix,
    /// `[attr$=val]`
    Suffix,
    /// `[attr*=val]`
    Substring,
}

/// A single simple selector component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimpleSelector {
    /// Type selector, e.g. `div`, `p`.
    Type(String),
    /// Universal selector `*`.
    Universal,
    /// ID selector `#foo`.
    Id(String),
    /// Class selector `.bar`.
    Class(String),
    /// Attribute selector `[name op value]`.
    Attribute {
        name: String,
        op: AttrOp,
        value: Option<String>,
    },
}

/// A compound selector is a sequence of simple selectors
/// without any combinator between them (e.g. `div.foo#bar`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompoundSelector {
    pub simples: Vec<SimpleSelector>,
}

/// A complex selector is a chain of compound selectors separated by
/// combinators. Stored right-to-left for matching: `parts[0]` is the
/// rightmost (subject) compound, and each part's combinator describes how to
/// reach the next part to its left.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComplexSelector {
    pub parts: Vec<(CompoundSelector, Option<Combinator>)>,
}

/// A comma-separated selector list.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SelectorList {
    pub selectors: Vec<ComplexSelector>,
}

impl SelectorList {
    /// True if nothing was parsed - matches no element.
    pub fn is_empty(&self) -> bool {
        self.selectors.is_empty()
    }
}

/// Parse a selector list. Malformed input yields an empty list.
pub fn parse_selector_list(input: &str) -> SelectorList {
    let mut cursor = Cursor::new(input);
    let mut selectors = Vec::new();

    cursor.eat_ws();
    if cursor.at_end() {
        return SelectorList::default();
    }

    loop {
        let Some(selector) = parse_complex(&mut cursor) else {
            return SelectorList::default();
        };
        selectors.push(selector);

        cursor.eat_ws();
        if cursor.at_end() {
            break;
        }
        if !cursor.eat(',') {
            // Trailing garbage
            return SelectorList::default();
        }
        cursor.eat_ws();
    }

    SelectorList { selectors }
}

fn parse_complex(cursor: &mut Cursor) -> Option<ComplexSelector> {
    // Build left-to-right, each part's combinator describing how it connects
    // to the previous one, then reverse for right-to-left matching.
    let mut parts_ltr: Vec<(CompoundSelector, Option<Combinator>)> = Vec::new();

    let compound = parse_compound(cursor)?;
    parts_ltr.push((compound, None));

    loop {
        let had_ws = cursor.eat_ws();

        if cursor.at_end() || cursor.peek() == Some(',') {
            break;
        }

        let combinator = match cursor.peek() {
            Some('>') => {
                cursor.bump();
                cursor.eat_ws();
                Combinator::Child
            }
            Some('+') => {
                cursor.bump();
                cursor.eat_ws();
                Combinator::NextSibling
            }
            Some('~') => {
                cursor.bump();
                cursor.eat_ws();
                Combinator::SubsequentSibling
            }
            _ if had_ws => Combinator::Descendant,
            _ => return None, // unparseable character inside a compound
        };

        let compound = parse_compound(cursor)?;
        parts_ltr.push((compound, Some(combinator)));
    }

    parts_ltr.reverse();
    Some(ComplexSelector { parts: parts_ltr })
}

fn parse_compound(cursor: &mut Cursor) -> Option<CompoundSelector> {
    let mut simples = Vec::new();

    loop {
        match cursor.peek() {
            Some('*') => {
                cursor.bump();
                simples.push(SimpleSelector::Universal);
            }
            Some('#') => {
                cursor.bump();
                let name = cursor.ident()?;
                simples.push(SimpleSelector::Id(name));
            }
            Some('.') => {
                cursor.bump();
                let name = cursor.ident()?;
                simples.push(SimpleSelector::Class(name));
            }
            Some('[') => {
                cursor.bump();
                simples.push(parse_attribute(cursor)?);
            }
            Some(c) if is_ident_char(c) => {
                let name = cursor.ident()?;
                simples.push(SimpleSelector::Type(name.to_ascii_lowercase()));
            }
            _ => break,
        }
    }

    if simples.is_empty() {
        return None;
    }
    Some(CompoundSelector { simples })
}

fn parse_attribute(cursor: &mut Cursor) -> Option<SimpleSelector> {
    cursor.eat_ws();
    let name = cursor.ident()?;
    cursor.eat_ws();

    if cursor.eat(']') {
        return Some(SimpleSelector::Attribute {
            name,
            op: AttrOp::Exists,
            value: None,
        });
    }

    let op = match cursor.peek() {
        Some('=') => {
            cursor.bump();
            AttrOp::Eq
        }
        Some(c @ ('~' | '|' | '^' | '$' | '*')) => {
            cursor.bump();
            if !cursor.eat('=') {
                return None;
            }
            match c {
                '~' => AttrOp::Includes,
                '|' => AttrOp::DashMatch,
                '^' => AttrOp::Prefix,
                '$' => AttrOp::Suffix,
                _ => AttrOp::Substring,
            }
        }
        _ => return None,
    };

    cursor.eat_ws();
    let value = match cursor.peek() {
        Some(quote @ ('"' | '\'')) => {
            cursor.bump();
            let v = cursor.take_until(quote)?;
            cursor.bump(); // closing quote
            v
        }
        _ => cursor.take_while(|c| !c.is_whitespace() && c != ']'),
    };
    cursor.eat_ws();
    if !cursor.eat(']') {
        return None;
    }

    Some(SimpleSelector::Attribute {
        name,
        op,
        value: Some(value),
    })
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '-' || c == '_'
}

struct Cursor<'a> {
    rest: &'a str,
}

impl<'a> Cursor<'a> {
    fn new(input: &'a str) -> Self {
        Cursor { rest: input }
    }

    fn at_end(&self) -> bool {
        self.rest.is_empty()
    }

    fn peek(&self) -> Option<char> {
        self.rest.chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.rest = &self.rest[c.len_utf8()..];
        Some(c)
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.bump();
            true
        } else {
            false
        }
    }

    /// Skips whitespace, returns whether any was skipped.
    fn eat_ws(&mut self) -> bool {
        let before = self.rest.len();
        self.rest = self.rest.trim_start();
        before != self.rest.len()
    }

    fn take_while(&mut self, pred: impl Fn(char) -> bool) -> String {
        let end = self
            .rest
            .char_indices()
            .find(|&(_, c)| !pred(c))
            .map_or(self.rest.len(), |(i, _)| i);
        let (taken, rest) = self.rest.split_at(end);
        self.rest = rest;
        taken.to_string()
    }

    /// Everything up to (not including) `stop`. None if `stop` never occurs.
    fn take_until(&mut self, stop: char) -> Option<String> {
        let end = self.rest.find(stop)?;
        let taken = self.rest[..end].to_string();
        self.rest = &self.rest[end..];
        Some(taken)
    }

    /// An identifier: alphanumerics, `-`, `_`. None if empty.
    fn ident(&mut self) -> Option<String> {
        let ident = self.take_while(is_ident_char);
        if ident.is_empty() { None } else { Some(ident) }
    }
}

// ---------------------------------------------------------------------------
// Matching
// ---------------------------------------------------------------------------

/// Does `id` match any selector in the list?
pub(crate) fn matches_list(doc: &Document, id: NodeId, list: &SelectorList) -> bool {
    list.selectors
        .iter()
        .any(|complex| match_complex(doc, id, &complex.parts))
}

fn match_complex(doc: &Document, id: NodeId, parts: &[(CompoundSelector, Option<Combinator>)]) -> bool {
    let Some(((compound, combinator), rest)) = parts.split_first() else {
        return true;
    };
    if !match_compound(doc, id, compound) {
        return false;
    }
    if rest.is_empty() {
        return true;
    }

    match combinator {
        None => true,
        Some(Combinator::Child) => doc
            .parent_element(id)
            .is_some_and(|p| match_complex(doc, p, rest)),
        Some(Combinator::Descendant) => {
            let mut current = doc.parent_element(id);
            while let Some(ancestor) = current {
                if match_complex(doc, ancestor, rest) {
                    return true;
                }
                current = doc.parent_element(ancestor);
            }
            false
        }
        Some(Combinator::NextSibling) => {
            prev_element_sibling(doc, id).is_some_and(|p| match_complex(doc, p, rest))
        }
        Some(Combinator::SubsequentSibling) => {
            let mut current = prev_element_sibling(doc, id);
            while let Some(sibling) = current {
                if match_complex(doc, sibling, rest) {
                    return true;
                }
                current = prev_element_sibling(doc, sibling);
            }
            false
        }
    }
}

fn prev_element_sibling(doc: &Document, id: NodeId) -> Option<NodeId> {
    let mut current = doc.arena[id].previous_sibling();
    while let Some(sibling) = current {
        if doc.is_element(sibling) {
            return Some(sibling);
        }
        current = doc.arena[sibling].previous_sibling();
    }
    None
}

fn match_compound(doc: &Document, id: NodeId, compound: &CompoundSelector) -> bool {
    let Some(elem) = doc.elem(id) else {
        return false;
    };
    compound.simples.iter().all(|s| match_simple(elem, s))
}

fn match_simple(elem: &ElementData, simple: &SimpleSelector) -> bool {
    match simple {
        SimpleSelector::Universal => true,
        SimpleSelector::Type(tag) => elem.tag.as_ref() == tag,
        SimpleSelector::Id(id) => elem.attrs.get("id").is_some_and(|v| v.as_ref() == id),
        SimpleSelector::Class(class) => elem
            .attrs
            .get("class")
            .is_some_and(|v| v.split_whitespace().any(|c| c == class)),
        SimpleSelector::Attribute { name, op, value } => {
            let Some(actual) = elem.attrs.get(name) else {
                return false;
            };
            let actual = actual.as_ref();
            let expected = value.as_deref().unwrap_or("");
            match op {
                AttrOp::Exists => true,
                AttrOp::Eq => actual == expected,
                AttrOp::Includes => {
                    !expected.is_empty() && actual.split_whitespace().any(|w| w == expected)
                }
                AttrOp::DashMatch => {
                    actual == expected
                        || (actual.len() > expected.len()
                            && actual.starts_with(expected)
                            && actual.as_bytes()[expected.len()] == b'-')
                }
                AttrOp::Prefix => !expected.is_empty() && actual.starts_with(expected),
                AttrOp::Suffix => !expected.is_empty() && actual.ends_with(expected),
                AttrOp::Substring => !expected.is_empty() && actual.contains(expected),
            }
        }
    }
}

/// Query elements matching `list` under `scope`, in document order.
///
/// `include_scope` controls whether the scope element itself is a candidate
/// (true for document-wide queries, false for scoped `find`).
pub(crate) fn query(
    doc: &Document,
    scope: NodeId,
    list: &SelectorList,
    include_scope: bool,
) -> Vec<NodeId> {
    if list.is_empty() {
        return Vec::new();
    }
    scope
        .descendants(&doc.arena)
        .filter(|&id| (include_scope || id != scope) && doc.is_element(id))
        .filter(|&id| matches_list(doc, id, list))
        .collect()
}
