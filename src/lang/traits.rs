//! Language front-end trait.
//!
//! Each supported language implements [`Language`] to provide a tree-sitter
//! parser and a normalizer from its concrete syntax tree to the engine's
//! generic [`Node`] representation. The normalized kind vocabulary must be
//! stable across invocations; matcher clauses depend on exact kind strings.

use tree_sitter::{Parser, Tree};

use crate::ast::node::Node;
use crate::error::Result;

/// A pluggable language front-end.
pub trait Language: Send + Sync {
    /// Canonical language name (e.g. "python").
    fn name(&self) -> &'static str;

    /// File extensions handled, with leading dot (e.g. ".py").
    fn extensions(&self) -> &[&'static str];

    /// Create a tree-sitter parser configured for this language.
    fn parser(&self) -> Result<Parser>;

    /// Normalize a successfully parsed tree into the generic representation.
    ///
    /// Only called on trees without error nodes; see
    /// [`crate::ast::parse_source`].
    fn normalize(&self, tree: &Tree, source: &[u8]) -> Node;
}

/// Boxed language handler stored in the registry.
pub type BoxedLanguage = Box<dyn Language>;
