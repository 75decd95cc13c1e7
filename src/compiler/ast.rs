//! The node tree produced by [`parse`](crate::parse).
//!
//! Every parse produces a [`Node::List`] root.  Nodes own their data; a
//! finished tree has no ties to the source text and is never mutated by
//! rendering.

use std::collections::BTreeMap;

/// The reserved override bucket name for content appearing directly under
/// an inherit tag without an enclosing define block.
pub const DEFAULT_BLOCK: &str = "default";

/// A node of the template tree.
#[derive(Debug, PartialEq)]
pub enum Node {
    /// Sequencing container; the root of every parse.
    List(List),
    /// Verbatim output.
    Text(Text),
    /// Value interpolation.
    Variable(Variable),
    /// Discarded at render time.
    Comment(Comment),
    /// Conditional or iterating block.
    Section(Section),
    /// Inclusion of another named template, rendered in place.
    Partial(Partial),
    /// Renders another named template with named blocks substituted.
    Inherit(Inherit),
    /// A named, overridable block.
    Define(Define),
    /// Transient marker for a closing tag.  The parser consumes and
    /// discards it after matching; it never appears in a finished tree.
    Close(Close),
}

/// An expression operand: the head of a variable or section, or one of
/// the trailing arguments.
#[derive(Debug, PartialEq)]
pub enum Expr {
    /// A dotted reference into the data context.
    Identifier(Identifier),
    /// A string literal, escape sequences unprocessed.
    String(StringLit),
    /// A numeric literal, kept as unparsed text and interpreted by
    /// whoever consumes it at render time.
    Number(NumberLit),
}

#[derive(Debug, Default, PartialEq)]
pub struct List {
    pub children: Vec<Node>,
}

#[derive(Debug, PartialEq)]
pub struct Text {
    pub text: String,
}

#[derive(Debug, PartialEq)]
pub struct Variable {
    pub head: Expr,
    pub tail: Vec<Expr>,
}

#[derive(Debug, PartialEq)]
pub struct Comment {
    pub text: String,
}

#[derive(Debug, PartialEq)]
pub struct Section {
    pub head: Identifier,
    pub tail: Vec<Expr>,
    pub inverted: bool,
    pub children: Vec<Node>,
}

#[derive(Debug, PartialEq)]
pub struct Partial {
    pub name: String,
}

/// The children of an inherit tag are bucketed by name: a define child
/// under its own name, everything else under [`DEFAULT_BLOCK`].  Each
/// bucket keeps its nodes in insertion order.
#[derive(Debug, PartialEq)]
pub struct Inherit {
    pub name: String,
    pub overrides: BTreeMap<String, Vec<Node>>,
}

#[derive(Debug, PartialEq)]
pub struct Define {
    pub name: String,
    pub children: Vec<Node>,
}

#[derive(Debug, PartialEq)]
pub struct Close {
    pub name: String,
}

#[derive(Debug, PartialEq)]
pub struct Identifier {
    pub segments: Vec<String>,
}

#[derive(Debug, PartialEq)]
pub struct StringLit {
    pub text: String,
}

#[derive(Debug, PartialEq)]
pub struct NumberLit {
    pub text: String,
}

impl Identifier {
    /// The dotted name of the identifier.
    pub fn name(&self) -> String {
        self.segments.join(".")
    }
}

impl Inherit {
    pub(crate) fn append(&mut self, node: Node) {
        let name = match node {
            Node::Define(ref define) => define.name.clone(),
            _ => DEFAULT_BLOCK.to_string(),
        };
        self.overrides.entry(name).or_default().push(node);
    }
}

impl Node {
    /// Returns the name the node is matched by, if it has one.
    ///
    /// Sections are named after their head identifier; partials, inherits,
    /// defines and close markers after their referenced name.
    pub fn name(&self) -> Option<String> {
        match self {
            Node::Section(section) => Some(section.head.name()),
            Node::Partial(partial) => Some(partial.name.clone()),
            Node::Inherit(inherit) => Some(inherit.name.clone()),
            Node::Define(define) => Some(define.name.clone()),
            Node::Close(close) => Some(close.name.clone()),
            Node::List(_) | Node::Text(_) | Node::Variable(_) | Node::Comment(_) => None,
        }
    }

    /// Returns the node's children in order, if it is a container.  An
    /// inherit node enumerates its buckets flattened.
    pub fn children(&self) -> Option<Vec<&Node>> {
        match self {
            Node::List(list) => Some(list.children.iter().collect()),
            Node::Section(section) => Some(section.children.iter().collect()),
            Node::Define(define) => Some(define.children.iter().collect()),
            Node::Inherit(inherit) => {
                Some(inherit.overrides.values().flatten().collect())
            }
            Node::Text(_)
            | Node::Variable(_)
            | Node::Comment(_)
            | Node::Partial(_)
            | Node::Close(_) => None,
        }
    }
}
