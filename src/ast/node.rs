//! Normalized AST node types.
//!
//! Every language front-end produces the same generic tree: a [`Node`] with
//! a stable `kind` vocabulary, an optional name, a source location, a small
//! attribute map, and exclusively-owned children. The tree is strict, with
//! no sharing and no cycles, so traversal order is deterministic and
//! ownership is trivial.
//!
//! # Kind vocabulary
//!
//! Matcher clauses depend on exact kind strings, so normalizers must emit
//! only the kinds listed in [`kinds`]. Language-specific constructs are
//! mapped onto this vocabulary (a Rust `struct` + its `impl` blocks become
//! one `class_definition`; a Python `elif` chain becomes one `conditional`
//! with one `branch` child per arm).

use std::fmt;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// The normalized kind vocabulary shared by all language adapters.
pub mod kinds {
    pub const MODULE: &str = "module";
    pub const CLASS: &str = "class_definition";
    pub const METHOD: &str = "method_definition";
    pub const FUNCTION: &str = "function_definition";
    pub const FIELD: &str = "field_definition";
    pub const CALL: &str = "call_expression";
    pub const OBJECT_CREATION: &str = "object_creation";
    pub const CONDITIONAL: &str = "conditional";
    pub const BRANCH: &str = "branch";
    pub const LOOP: &str = "loop";
    pub const RETURN: &str = "return_statement";
    pub const ASSIGNMENT: &str = "assignment";
    pub const BINARY: &str = "binary_expression";
}

/// Source location of a node (1-indexed lines and columns).
///
/// The file path is carried at the result level, not per node: nodes are
/// created once per file parse and discarded when that file's analysis
/// completes, so repeating the path on every node would be pure overhead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Location {
    /// Starting line (1-indexed).
    pub line: usize,
    /// Starting column (1-indexed).
    pub column: usize,
    /// Ending line (1-indexed, inclusive).
    pub end_line: usize,
    /// Ending column (1-indexed, exclusive).
    pub end_column: usize,
}

impl Location {
    /// Build a location from a tree-sitter node's positions.
    #[must_use]
    pub fn from_ts(node: &tree_sitter::Node<'_>) -> Self {
        Self {
            line: node.start_position().row + 1,
            column: node.start_position().column + 1,
            end_line: node.end_position().row + 1,
            end_column: node.end_position().column + 1,
        }
    }

    /// Line span covered by this location.
    #[must_use]
    pub fn line_span(&self) -> usize {
        self.end_line.saturating_sub(self.line)
    }

    /// Whether this location's line range encloses `other`'s.
    #[must_use]
    pub fn encloses(&self, other: &Location) -> bool {
        self.line <= other.line && other.end_line <= self.end_line
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}-{}:{}", self.line, self.column, self.end_line, self.end_column)
    }
}

/// Scalar or list value attached to a node attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
    Str(String),
    Int(i64),
    Bool(bool),
    List(Vec<String>),
}

impl AttrValue {
    /// String content, if this is a string attribute.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttrValue::Str(s) => Some(s),
            _ => None,
        }
    }

    /// List content, if this is a list attribute.
    #[must_use]
    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            AttrValue::List(items) => Some(items),
            _ => None,
        }
    }

    /// Bool content, defaulting to false for non-bool attributes.
    #[must_use]
    pub fn is_true(&self) -> bool {
        matches!(self, AttrValue::Bool(true))
    }
}

/// A normalized AST element.
///
/// Children fully and exclusively own their subtrees. Class members
/// (fields, methods) appear as direct children of the class node; method
/// bodies contain statement/expression nodes however deeply nested the
/// original syntax was.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    /// Stable kind tag from [`kinds`].
    pub kind: String,
    /// Identifier text, when the construct has one (class/function/field
    /// names, callee name for calls, constructed type for object creation).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Source span of the construct.
    pub location: Location,
    /// Auxiliary facts: base-class names, parameter lists, field types,
    /// call receivers. Keys are adapter-defined but stable per language.
    #[serde(default, skip_serializing_if = "FxHashMap::is_empty")]
    pub attrs: FxHashMap<String, AttrValue>,
    /// Ordered child nodes.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Node>,
}

impl Node {
    /// Create a node with no attributes or children.
    #[must_use]
    pub fn new(kind: &str, name: Option<String>, location: Location) -> Self {
        Self {
            kind: kind.to_string(),
            name,
            location,
            attrs: FxHashMap::default(),
            children: Vec::new(),
        }
    }

    /// Attribute lookup.
    #[must_use]
    pub fn attr(&self, key: &str) -> Option<&AttrValue> {
        self.attrs.get(key)
    }

    /// String attribute lookup.
    #[must_use]
    pub fn attr_str(&self, key: &str) -> Option<&str> {
        self.attrs.get(key).and_then(AttrValue::as_str)
    }

    /// Name or empty string, for matching convenience.
    #[must_use]
    pub fn name_or_empty(&self) -> &str {
        self.name.as_deref().unwrap_or("")
    }

    /// Direct children of a given kind.
    pub fn children_of_kind<'a>(&'a self, kind: &'a str) -> impl Iterator<Item = &'a Node> {
        self.children.iter().filter(move |c| c.kind == kind)
    }

    /// Depth-first pre-order traversal of this subtree, including `self`.
    pub fn descendants(&self) -> Descendants<'_> {
        Descendants { stack: vec![self] }
    }

    /// Whether any node in this subtree (excluding `self`) has the kind.
    #[must_use]
    pub fn has_descendant_of_kind(&self, kind: &str) -> bool {
        self.descendants().skip(1).any(|n| n.kind == kind)
    }

    /// Whether two nodes are the same tree element.
    ///
    /// Kind plus exact span identifies a node within one file: the tree is
    /// strict, so no two distinct nodes of the same kind share a span.
    #[must_use]
    pub fn same_element(&self, other: &Node) -> bool {
        self.kind == other.kind && self.location == other.location
    }
}

/// Iterator over a subtree in depth-first pre-order.
///
/// Children are pushed in reverse so they pop in source order, keeping
/// traversal deterministic.
pub struct Descendants<'a> {
    stack: Vec<&'a Node>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = &'a Node;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        for child in node.children.iter().rev() {
            self.stack.push(child);
        }
        Some(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loc(line: usize) -> Location {
        Location { line, column: 1, end_line: line, end_column: 10 }
    }

    fn tree() -> Node {
        let mut class = Node::new(kinds::CLASS, Some("Widget".into()), loc(1));
        let mut method = Node::new(kinds::METHOD, Some("draw".into()), loc(2));
        method.children.push(Node::new(kinds::CALL, Some("render".into()), loc(3)));
        class.children.push(Node::new(kinds::FIELD, Some("screen".into()), loc(1)));
        class.children.push(method);
        class
    }

    #[test]
    fn descendants_pre_order() {
        let root = tree();
        let kinds_seen: Vec<&str> = root.descendants().map(|n| n.kind.as_str()).collect();
        assert_eq!(
            kinds_seen,
            vec![kinds::CLASS, kinds::FIELD, kinds::METHOD, kinds::CALL]
        );
    }

    #[test]
    fn children_of_kind_filters_direct_children_only() {
        let root = tree();
        assert_eq!(root.children_of_kind(kinds::METHOD).count(), 1);
        // The call is nested inside the method, not a direct child.
        assert_eq!(root.children_of_kind(kinds::CALL).count(), 0);
        assert!(root.has_descendant_of_kind(kinds::CALL));
    }

    #[test]
    fn same_element_uses_kind_and_span() {
        let a = Node::new(kinds::CALL, Some("x".into()), loc(5));
        let b = Node::new(kinds::CALL, Some("y".into()), loc(5));
        let c = Node::new(kinds::RETURN, None, loc(5));
        assert!(a.same_element(&b));
        assert!(!a.same_element(&c));
    }
}
