//! Language abstraction layer.
//!
//! Provides a unified interface for multi-language analysis via the
//! [`Language`] trait. Each supported language implements the trait to
//! supply a tree-sitter parser and a CST-to-generic-node normalizer.

pub mod common;
pub mod registry;
pub mod traits;

// Language implementations
pub mod python;
pub mod rust_lang;
pub mod typescript;

pub use registry::LanguageRegistry;
pub use traits::{BoxedLanguage, Language};
