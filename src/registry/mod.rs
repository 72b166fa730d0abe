//! Pattern registry: declarative definitions, validation and compilation.
//!
//! A registry is an immutable set of compiled patterns and opportunity
//! heuristics. Callers either start from [`PatternRegistry::builtin`] or
//! load their own JSON documents with [`PatternRegistry::from_json_str`];
//! there is no global mutable registry, so two analyzers can run different
//! pattern sets side by side.

pub mod compile;
pub mod definition;

pub use compile::{ClauseOp, CompiledPattern, CompiledSignal, RoleId, SignalOp};
pub use definition::{
    Clause, DefinitionDocument, HeuristicDefinition, PatternCategory, PatternDefinition,
    SignalDef, Trigger,
};

use rustc_hash::FxHashSet;

use crate::error::RegistryError;

/// Built-in definition documents, one per pattern family plus the
/// opportunity heuristics. Parsed and compiled by [`PatternRegistry::builtin`].
const BUILTIN_DOCS: &[&str] = &[
    include_str!("builtin/adapter.json"),
    include_str!("builtin/decorator.json"),
    include_str!("builtin/facade.json"),
    include_str!("builtin/factory_method.json"),
    include_str!("builtin/observer.json"),
    include_str!("builtin/proxy.json"),
    include_str!("builtin/singleton.json"),
    include_str!("builtin/strategy.json"),
    include_str!("builtin/opportunities.json"),
];

/// Immutable, validated set of patterns and heuristics.
#[derive(Debug, Clone)]
pub struct PatternRegistry {
    patterns: Vec<CompiledPattern>,
    heuristics: Vec<HeuristicDefinition>,
}

impl PatternRegistry {
    /// The shipped pattern set.
    ///
    /// Panics only if the embedded documents are invalid, which the test
    /// suite rules out.
    #[must_use]
    pub fn builtin() -> Self {
        let mut merged = DefinitionDocument::default();
        for text in BUILTIN_DOCS {
            let doc: DefinitionDocument =
                serde_json::from_str(text).expect("embedded definition document parses");
            merged.patterns.extend(doc.patterns);
            merged.heuristics.extend(doc.heuristics);
        }
        Self::load(merged).expect("embedded definition documents compile")
    }

    /// Validate and compile a definition document into a registry.
    pub fn load(doc: DefinitionDocument) -> Result<Self, RegistryError> {
        let mut seen: FxHashSet<&str> = FxHashSet::default();
        for def in &doc.patterns {
            if !seen.insert(&def.id) {
                return Err(RegistryError::DuplicateId { id: def.id.clone() });
            }
        }
        for heuristic in &doc.heuristics {
            if !seen.insert(&heuristic.id) {
                return Err(RegistryError::DuplicateId {
                    id: heuristic.id.clone(),
                });
            }
        }

        let patterns = doc
            .patterns
            .iter()
            .map(compile::compile_pattern)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            patterns,
            heuristics: doc.heuristics,
        })
    }

    /// Parse a JSON definition document and load it.
    pub fn from_json_str(json: &str) -> Result<Self, RegistryError> {
        let doc: DefinitionDocument = serde_json::from_str(json)?;
        Self::load(doc)
    }

    #[must_use]
    pub fn patterns(&self) -> &[CompiledPattern] {
        &self.patterns
    }

    #[must_use]
    pub fn heuristics(&self) -> &[HeuristicDefinition] {
        &self.heuristics
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&CompiledPattern> {
        self.patterns.iter().find(|p| p.id == id)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty() && self.heuristics.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_registry_loads() {
        let registry = PatternRegistry::builtin();
        for id in [
            "adapter",
            "decorator",
            "facade",
            "factory-method",
            "observer",
            "proxy",
            "singleton",
            "strategy",
        ] {
            assert!(registry.get(id).is_some(), "missing builtin pattern {id}");
        }
        assert_eq!(registry.heuristics().len(), 3);
    }

    #[test]
    fn builtin_heuristics_suggest_known_patterns() {
        let registry = PatternRegistry::builtin();
        for heuristic in registry.heuristics() {
            assert!(
                registry.get(&heuristic.suggests).is_some(),
                "heuristic {} suggests unknown pattern {}",
                heuristic.id,
                heuristic.suggests
            );
        }
    }

    #[test]
    fn duplicate_pattern_id_is_rejected() {
        let json = r#"{
            "patterns": [
                {"id": "dup", "name": "A", "category": "structural", "roles": ["a"],
                 "clauses": [{"pred": "kind-equality", "role": "a", "kind": "class_definition"}]},
                {"id": "dup", "name": "B", "category": "structural", "roles": ["b"],
                 "clauses": [{"pred": "kind-equality", "role": "b", "kind": "class_definition"}]}
            ]
        }"#;
        let err = PatternRegistry::from_json_str(json).unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateId { ref id } if id == "dup"));
    }

    #[test]
    fn malformed_json_surfaces_as_registry_error() {
        let err = PatternRegistry::from_json_str("{not json").unwrap_err();
        assert!(matches!(err, RegistryError::Malformed(_)));
    }
}
