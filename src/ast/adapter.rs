//! Parse entry point and parser reuse.
//!
//! Turns raw source text into a normalized [`Node`] tree via a language
//! front-end. A file that fails to parse contributes zero matches and zero
//! opportunities downstream; the adapter never hands an inconsistent tree
//! to the engine.
//!
//! # Parser caching
//!
//! Tree-sitter parser creation involves memory allocation and grammar setup,
//! which adds overhead when processing many files. Parsers are not
//! thread-safe, so one parser per language is cached per thread and returned
//! to the cache by an RAII wrapper on drop.

use std::cell::RefCell;

use rustc_hash::FxHashMap;
use tree_sitter::Parser;

use crate::ast::node::Node;
use crate::error::{Result, ScoutError};
use crate::lang::Language;

thread_local! {
    /// One cached parser per language name for the current thread.
    static PARSER_CACHE: RefCell<FxHashMap<&'static str, Parser>> =
        RefCell::new(FxHashMap::default());
}

/// Maximum number of parsers to cache per thread.
///
/// Covers all shipped languages with room to spare while bounding memory.
const MAX_CACHED_PARSERS: usize = 8;

/// RAII wrapper that returns a parser to the thread-local cache on drop.
struct CachedParser {
    parser: Option<Parser>,
    lang_name: &'static str,
}

impl CachedParser {
    /// Get a parser for the language, reusing a cached one when available.
    fn take(lang: &dyn Language) -> Result<Self> {
        let lang_name = lang.name();
        let cached = PARSER_CACHE.with(|cache| cache.borrow_mut().remove(lang_name));

        let parser = match cached {
            Some(mut p) => {
                // Clear state left over from the previous file.
                p.reset();
                p
            }
            None => lang.parser()?,
        };

        Ok(Self {
            parser: Some(parser),
            lang_name,
        })
    }

    fn get_mut(&mut self) -> &mut Parser {
        // Only None after drop, which cannot be observed.
        self.parser.as_mut().expect("parser already returned")
    }
}

impl Drop for CachedParser {
    fn drop(&mut self) {
        if let Some(parser) = self.parser.take() {
            PARSER_CACHE.with(|cache| {
                let mut cache = cache.borrow_mut();
                if cache.len() < MAX_CACHED_PARSERS {
                    cache.insert(self.lang_name, parser);
                }
            });
        }
    }
}

/// Clear the parser cache for the current thread. Useful in tests.
pub fn clear_parser_cache() {
    PARSER_CACHE.with(|cache| cache.borrow_mut().clear());
}

/// Parse source text with the given language front-end and normalize it.
///
/// `display_name` is only used in error messages (typically the file path).
///
/// # Errors
///
/// Returns [`ScoutError::Parse`] when the source contains syntax errors.
/// Tree-sitter always produces *some* tree, so the error/missing nodes are
/// located explicitly and the whole file is rejected rather than analyzing
/// a partially-recovered tree.
pub fn parse_source(source: &str, lang: &dyn Language, display_name: &str) -> Result<Node> {
    let mut cached = CachedParser::take(lang)?;
    let tree = cached
        .get_mut()
        .parse(source, None)
        .ok_or_else(|| ScoutError::Parse {
            file: display_name.to_string(),
            message: "parser produced no tree".to_string(),
        })?;

    let root = tree.root_node();
    if root.has_error() {
        let (line, column, what) = first_error(&root);
        return Err(ScoutError::Parse {
            file: display_name.to_string(),
            message: format!("{what} at line {line}, column {column}"),
        });
    }

    Ok(lang.normalize(&tree, source.as_bytes()))
}

/// Parse by language name, resolving the front-end through the global
/// registry. Aliases like "js" resolve the way the registry defines them.
///
/// # Errors
///
/// Returns [`ScoutError::UnsupportedLanguage`] for unknown names, plus
/// everything [`parse_source`] can return.
pub fn parse_named(source: &str, language: &str, display_name: &str) -> Result<Node> {
    let lang = crate::lang::LanguageRegistry::global()
        .get_by_name(language)
        .ok_or_else(|| ScoutError::UnsupportedLanguage(language.to_string()))?;
    parse_source(source, lang, display_name)
}

/// Locate the first ERROR or MISSING node in a tree-sitter parse tree.
fn first_error(root: &tree_sitter::Node<'_>) -> (usize, usize, &'static str) {
    let mut cursor = root.walk();
    let mut stack = vec![*root];
    while let Some(node) = stack.pop() {
        if node.is_error() {
            return (
                node.start_position().row + 1,
                node.start_position().column + 1,
                "syntax error",
            );
        }
        if node.is_missing() {
            return (
                node.start_position().row + 1,
                node.start_position().column + 1,
                "missing token",
            );
        }
        if node.has_error() {
            let children: Vec<_> = node.children(&mut cursor).collect();
            for child in children.into_iter().rev() {
                stack.push(child);
            }
        }
    }
    (root.start_position().row + 1, 1, "syntax error")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lang::LanguageRegistry;

    #[test]
    fn valid_python_parses_to_module() {
        let lang = LanguageRegistry::global().get_by_name("python").unwrap();
        let root = parse_source("def f():\n    return 1\n", lang, "f.py").unwrap();
        assert_eq!(root.kind, "module");
        assert_eq!(root.children.len(), 1);
    }

    #[test]
    fn syntax_error_is_rejected_with_location() {
        let lang = LanguageRegistry::global().get_by_name("python").unwrap();
        let err = parse_source("def f(:\n", lang, "broken.py").unwrap_err();
        match err {
            ScoutError::Parse { file, message } => {
                assert_eq!(file, "broken.py");
                assert!(message.contains("line"), "message was: {message}");
            }
            other => panic!("expected parse error, got {other}"),
        }
    }

    #[test]
    fn parser_cache_round_trip() {
        clear_parser_cache();
        let lang = LanguageRegistry::global().get_by_name("python").unwrap();
        parse_source("x = 1\n", lang, "a.py").unwrap();
        // Second parse reuses the cached parser; result must be identical.
        let again = parse_source("x = 1\n", lang, "a.py").unwrap();
        assert_eq!(again.kind, "module");
    }
}
