//! Normalized AST representation and the parse entry point.
//!
//! Language front-ends (see [`crate::lang`]) produce a generic [`Node`]
//! tree with a stable kind vocabulary. Everything downstream operates only
//! on this representation and never sees language-specific syntax.

pub mod adapter;
pub mod node;

pub use adapter::{parse_named, parse_source};
pub use node::{kinds, AttrValue, Location, Node};
