//! Backtracking clause evaluation.

use rustc_hash::{FxHashMap, FxHashSet};

use crate::ast::{kinds, Location, Node};
use crate::registry::{ClauseOp, CompiledPattern, RoleId};

/// Default expansion budget per (file, pattern) search.
pub const DEFAULT_MAX_EXPANSIONS: usize = 200_000;

/// Soft failure: the search exhausted its expansion budget.
///
/// Raised per (file, pattern); other patterns and files proceed normally.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchLimitExceeded {
    pub limit: usize,
}

impl std::fmt::Display for SearchLimitExceeded {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "search expansion budget of {} exhausted", self.limit)
    }
}

impl std::error::Error for SearchLimitExceeded {}

/// A structurally complete binding of every role to a node.
#[derive(Debug, Clone)]
pub struct StructuralMatch<'a> {
    pub pattern: &'a CompiledPattern,
    /// Bound nodes, indexed by [`RoleId`].
    pub nodes: Vec<&'a Node>,
}

impl<'a> StructuralMatch<'a> {
    /// Node bound to the root role; its location is the match location.
    #[must_use]
    pub fn root(&self) -> &'a Node {
        self.nodes[0]
    }

    fn signature(&self) -> Vec<Location> {
        self.nodes.iter().map(|n| n.location).collect()
    }

    /// Lines covered from the earliest bound node to the latest one.
    fn binding_extent(&self) -> usize {
        let start = self.nodes.iter().map(|n| n.location.line).min().unwrap_or(0);
        let end = self.nodes.iter().map(|n| n.location.end_line).max().unwrap_or(0);
        end.saturating_sub(start)
    }
}

/// Per-file index from normalized kind to nodes, in document order.
pub struct KindIndex<'a> {
    by_kind: FxHashMap<&'a str, Vec<&'a Node>>,
}

impl<'a> KindIndex<'a> {
    #[must_use]
    pub fn build(root: &'a Node) -> Self {
        let mut by_kind: FxHashMap<&'a str, Vec<&'a Node>> = FxHashMap::default();
        for node in root.descendants() {
            by_kind.entry(node.kind.as_str()).or_default().push(node);
        }
        Self { by_kind }
    }

    #[must_use]
    pub fn of_kind(&self, kind: &str) -> &[&'a Node] {
        self.by_kind.get(kind).map_or(&[], Vec::as_slice)
    }
}

/// Evaluates compiled patterns against one file's normalized tree.
pub struct MatchEngine {
    max_expansions: usize,
}

impl MatchEngine {
    #[must_use]
    pub fn new(max_expansions: usize) -> Self {
        Self { max_expansions }
    }

    /// Find every distinct complete binding of `pattern` in the indexed file.
    ///
    /// Results are ordered by root location, then smallest binding extent,
    /// so the tightest binding of each root comes first.
    pub fn find_matches<'a>(
        &self,
        pattern: &'a CompiledPattern,
        index: &KindIndex<'a>,
    ) -> Result<Vec<StructuralMatch<'a>>, SearchLimitExceeded> {
        let mut search = Search {
            pattern,
            index,
            budget: self.max_expansions,
            limit: self.max_expansions,
            bindings: vec![None; pattern.roles.len()],
            seen: FxHashSet::default(),
            found: Vec::new(),
        };
        search.solve(0)?;

        let mut matches = search.found;
        matches.sort_by(|a, b| {
            (a.root().location, a.binding_extent(), a.signature())
                .cmp(&(b.root().location, b.binding_extent(), b.signature()))
        });
        Ok(matches)
    }
}

impl Default for MatchEngine {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_EXPANSIONS)
    }
}

struct Search<'i, 'a> {
    pattern: &'a CompiledPattern,
    index: &'i KindIndex<'a>,
    budget: usize,
    limit: usize,
    bindings: Vec<Option<&'a Node>>,
    seen: FxHashSet<Vec<Location>>,
    found: Vec<StructuralMatch<'a>>,
}

impl<'i, 'a> Search<'i, 'a> {
    fn solve(&mut self, op_index: usize) -> Result<(), SearchLimitExceeded> {
        let Some(op) = self.pattern.ops.get(op_index) else {
            self.accept();
            return Ok(());
        };

        match op {
            ClauseOp::BindByKind { role, kind } => {
                let candidates: Vec<&'a Node> = self.index.of_kind(kind).to_vec();
                self.try_candidates(*role, candidates, op_index)
            }
            ClauseOp::BindChild { role, of, kind } => {
                let parent = self.bound(*of);
                let candidates: Vec<&'a Node> = parent.children_of_kind(kind).collect();
                self.try_candidates(*role, candidates, op_index)
            }
            constraint => {
                if self.check(constraint) {
                    self.solve(op_index + 1)
                } else {
                    Ok(())
                }
            }
        }
    }

    fn try_candidates(
        &mut self,
        role: RoleId,
        candidates: Vec<&'a Node>,
        op_index: usize,
    ) -> Result<(), SearchLimitExceeded> {
        for node in candidates {
            if self.budget == 0 {
                return Err(SearchLimitExceeded { limit: self.limit });
            }
            self.budget -= 1;
            self.bindings[role] = Some(node);
            self.solve(op_index + 1)?;
        }
        self.bindings[role] = None;
        Ok(())
    }

    fn accept(&mut self) {
        let nodes: Vec<&'a Node> = self
            .bindings
            .iter()
            .map(|b| b.unwrap_or_else(|| unreachable!("all roles bound at acceptance")))
            .collect();
        let candidate = StructuralMatch {
            pattern: self.pattern,
            nodes,
        };
        if self.seen.insert(candidate.signature()) {
            self.found.push(candidate);
        }
    }

    fn bound(&self, role: RoleId) -> &'a Node {
        match self.bindings[role] {
            Some(node) => node,
            // Compilation guarantees constraints run after their
            // introductions; an unbound role here is a compiler bug.
            None => unreachable!("role referenced before introduction"),
        }
    }

    fn check(&self, op: &ClauseOp) -> bool {
        match op {
            ClauseOp::CheckKind { role, kind } => self.bound(*role).kind == *kind,
            ClauseOp::HasChild { role, kind } => {
                self.bound(*role).children_of_kind(kind).next().is_some()
            }
            ClauseOp::HasDescendant { role, kind } => {
                self.bound(*role).has_descendant_of_kind(kind)
            }
            ClauseOp::NameMatches { role, regex } => {
                regex.is_match(self.bound(*role).name_or_empty())
            }
            ClauseOp::Inherits { role, base } => {
                let base_name = self.bound(*base).name_or_empty();
                !base_name.is_empty()
                    && self
                        .bound(*role)
                        .attr("bases")
                        .and_then(crate::ast::AttrValue::as_list)
                        .is_some_and(|bases| bases.iter().any(|b| b == base_name))
            }
            ClauseOp::Calls { role, target } => {
                let target_name = self.bound(*target).name_or_empty();
                !target_name.is_empty()
                    && self
                        .bound(*role)
                        .descendants()
                        .any(|n| n.kind == kinds::CALL && n.name_or_empty() == target_name)
            }
            ClauseOp::Delegates { role, to } => {
                let field_name = self.bound(*to).name_or_empty();
                !field_name.is_empty()
                    && self.bound(*role).descendants().any(|n| {
                        n.kind == kinds::CALL && n.attr_str("receiver_field") == Some(field_name)
                    })
            }
            ClauseOp::Distinct { roles } => {
                for (i, a) in roles.iter().enumerate() {
                    for b in &roles[i + 1..] {
                        if self.bound(*a).same_element(self.bound(*b)) {
                            return false;
                        }
                    }
                }
                true
            }
            ClauseOp::BindByKind { .. } | ClauseOp::BindChild { .. } => {
                unreachable!("introductions are not constraints")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::parse_named;
    use crate::registry::PatternRegistry;

    fn python(source: &str) -> Node {
        parse_named(source, "python", "test.py").unwrap()
    }

    const ADAPTER_SRC: &str = r#"
class LegacyAdapter:
    def __init__(self, legacy):
        self.legacy = legacy

    def request(self, payload):
        return self.legacy.handle(payload)
"#;

    #[test]
    fn adapter_shape_binds_all_roles() {
        let registry = PatternRegistry::builtin();
        let pattern = registry.get("adapter").unwrap();
        let tree = python(ADAPTER_SRC);
        let index = KindIndex::build(&tree);

        let matches = MatchEngine::default().find_matches(pattern, &index).unwrap();
        assert!(!matches.is_empty());
        let m = &matches[0];
        assert_eq!(m.root().name_or_empty(), "LegacyAdapter");
        let field_role = pattern.roles.iter().position(|r| r == "adaptee_field").unwrap();
        assert_eq!(m.nodes[field_role].name_or_empty(), "legacy");
    }

    #[test]
    fn no_delegation_means_no_match() {
        let src = r#"
class Standalone:
    def __init__(self):
        self.count = 0

    def bump(self):
        self.count = self.count + 1
"#;
        let registry = PatternRegistry::builtin();
        let pattern = registry.get("adapter").unwrap();
        let tree = python(src);
        let index = KindIndex::build(&tree);

        let matches = MatchEngine::default().find_matches(pattern, &index).unwrap();
        assert!(matches.is_empty());
    }

    #[test]
    fn matches_are_ordered_and_deduplicated() {
        let src = r#"
class FirstAdapter:
    def __init__(self, inner):
        self.inner = inner

    def go(self):
        return self.inner.go()

class SecondAdapter:
    def __init__(self, inner):
        self.inner = inner

    def go(self):
        return self.inner.go()
"#;
        let registry = PatternRegistry::builtin();
        let pattern = registry.get("adapter").unwrap();
        let tree = python(src);
        let index = KindIndex::build(&tree);

        let matches = MatchEngine::default().find_matches(pattern, &index).unwrap();
        let roots: Vec<&str> = matches.iter().map(|m| m.root().name_or_empty()).collect();
        assert!(roots.contains(&"FirstAdapter"));
        assert!(roots.contains(&"SecondAdapter"));
        // Root order follows document order.
        let first = roots.iter().position(|r| *r == "FirstAdapter").unwrap();
        let second = roots.iter().position(|r| *r == "SecondAdapter").unwrap();
        assert!(first < second);

        let mut signatures: Vec<Vec<Location>> =
            matches.iter().map(StructuralMatch::signature).collect();
        let before = signatures.len();
        signatures.dedup();
        assert_eq!(before, signatures.len());
    }

    #[test]
    fn tiny_budget_reports_limit() {
        let registry = PatternRegistry::builtin();
        let pattern = registry.get("adapter").unwrap();
        let tree = python(ADAPTER_SRC);
        let index = KindIndex::build(&tree);

        let err = MatchEngine::new(1).find_matches(pattern, &index).unwrap_err();
        assert_eq!(err, SearchLimitExceeded { limit: 1 });
    }
}
