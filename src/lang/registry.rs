//! Language registry for extension-to-language mapping.
//!
//! Maps file extensions and names to [`Language`] implementations. The
//! registry is a process-global singleton: language handlers are stateless
//! and their set is fixed at compile time, unlike pattern definitions,
//! which are an explicit value passed into each analysis.
//!
//! # Aliases
//!
//! Alternative names resolve to canonical handlers ("javascript" and "js"
//! both resolve to the TypeScript handler, which parses plain JS too).

use std::collections::HashMap;
use std::path::Path;
use std::sync::OnceLock;

use crate::lang::traits::{BoxedLanguage, Language};
use crate::lang::{python, rust_lang, typescript};

static REGISTRY: OnceLock<LanguageRegistry> = OnceLock::new();

/// Registry mapping names and file extensions to language implementations.
pub struct LanguageRegistry {
    by_name: HashMap<&'static str, BoxedLanguage>,
    by_ext: HashMap<&'static str, &'static str>,
    aliases: HashMap<&'static str, &'static str>,
}

impl LanguageRegistry {
    /// Get the global language registry singleton.
    pub fn global() -> &'static Self {
        REGISTRY.get_or_init(Self::new)
    }

    fn new() -> Self {
        let mut registry = Self {
            by_name: HashMap::new(),
            by_ext: HashMap::new(),
            aliases: HashMap::new(),
        };

        registry.register(Box::new(python::Python));
        registry.register(Box::new(typescript::TypeScript::new()));
        registry.register(Box::new(typescript::TypeScript::tsx()));
        registry.register(Box::new(rust_lang::Rust));

        registry.register_alias("javascript", "typescript");
        registry.register_alias("js", "typescript");
        registry.register_alias("ts", "typescript");
        registry.register_alias("jsx", "tsx");

        registry
    }

    fn register(&mut self, lang: BoxedLanguage) {
        let name = lang.name();
        for ext in lang.extensions() {
            self.by_ext.insert(*ext, name);
        }
        self.by_name.insert(name, lang);
    }

    fn register_alias(&mut self, alias: &'static str, target: &'static str) {
        self.aliases.insert(alias, target);
    }

    /// Get a language by name, resolving aliases.
    pub fn get_by_name(&self, name: &str) -> Option<&dyn Language> {
        let canonical = self.aliases.get(name).copied().unwrap_or(name);
        self.by_name.get(canonical).map(|b| b.as_ref())
    }

    /// Get a language by file extension (with leading dot).
    pub fn get_by_extension(&self, ext: &str) -> Option<&dyn Language> {
        self.by_ext.get(ext).and_then(|name| self.get_by_name(name))
    }

    /// Auto-detect language from a file path's extension.
    pub fn detect_language(&self, path: &Path) -> Option<&dyn Language> {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|ext| format!(".{ext}"))
            .and_then(|ext| self.get_by_extension(&ext))
    }

    /// Whether a language name (or alias) is supported.
    #[must_use]
    pub fn is_supported(&self, name: &str) -> bool {
        self.by_name.contains_key(name) || self.aliases.contains_key(name)
    }

    /// All canonical language names, sorted.
    #[must_use]
    pub fn supported_languages(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = self.by_name.keys().copied().collect();
        names.sort_unstable();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_names_resolve() {
        let registry = LanguageRegistry::global();
        assert!(registry.get_by_name("python").is_some());
        assert!(registry.get_by_name("typescript").is_some());
        assert!(registry.get_by_name("rust").is_some());
        assert!(registry.get_by_name("cobol").is_none());
    }

    #[test]
    fn aliases_resolve_to_canonical_handlers() {
        let registry = LanguageRegistry::global();
        assert_eq!(registry.get_by_name("javascript").unwrap().name(), "typescript");
        assert_eq!(registry.get_by_name("js").unwrap().name(), "typescript");
        assert_eq!(registry.get_by_name("jsx").unwrap().name(), "tsx");
        assert!(registry.is_supported("javascript"));
    }

    #[test]
    fn extension_detection() {
        let registry = LanguageRegistry::global();
        assert_eq!(
            registry.detect_language(Path::new("a/b/service.py")).unwrap().name(),
            "python"
        );
        assert_eq!(
            registry.detect_language(Path::new("widget.tsx")).unwrap().name(),
            "tsx"
        );
        assert_eq!(
            registry.detect_language(Path::new("main.rs")).unwrap().name(),
            "rust"
        );
        assert!(registry.detect_language(Path::new("README.md")).is_none());
    }
}
