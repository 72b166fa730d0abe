//! Result aggregation.
//!
//! Per-file findings are merged into one [`AnalysisResult`], then
//! finalized: matches and opportunities get a canonical order, and an
//! opportunity is dropped when the pattern it suggests was already
//! detected around the same piece of code. Finalized output serializes
//! deterministically, so repeated runs over the same input produce
//! byte-identical JSON.

use rustc_hash::FxHashSet;
use serde::Serialize;

use crate::ast::Location;
use crate::engine::StructuralMatch;
use crate::opportunity::OpportunityHit;
use crate::registry::PatternCategory;
use crate::score::Score;

/// One role bound to a concrete node.
#[derive(Debug, Clone, Serialize)]
pub struct RoleBinding {
    pub role: String,
    pub name: String,
    pub kind: String,
    pub location: Location,
}

/// A detected pattern instance.
#[derive(Debug, Clone, Serialize)]
pub struct PatternMatch {
    pub pattern_id: String,
    pub pattern_name: String,
    pub category: PatternCategory,
    pub file: String,
    /// Location of the root role's node.
    pub location: Location,
    pub confidence: f64,
    pub evidence: Vec<String>,
    pub roles: Vec<RoleBinding>,
}

impl PatternMatch {
    /// Assemble a serializable match from a structural binding and its score.
    #[must_use]
    pub fn from_structural(m: &StructuralMatch<'_>, score: Score, file: &str) -> Self {
        let roles = m
            .pattern
            .roles
            .iter()
            .zip(&m.nodes)
            .map(|(role, node)| RoleBinding {
                role: role.clone(),
                name: node.name_or_empty().to_string(),
                kind: node.kind.clone(),
                location: node.location,
            })
            .collect();
        Self {
            pattern_id: m.pattern.id.clone(),
            pattern_name: m.pattern.name.clone(),
            category: m.pattern.category,
            file: file.to_string(),
            location: m.root().location,
            confidence: score.confidence,
            evidence: score.evidence,
            roles,
        }
    }
}

/// A suggested pattern application.
#[derive(Debug, Clone, Serialize)]
pub struct Opportunity {
    pub heuristic_id: String,
    /// Pattern id worth applying here.
    pub suggests: String,
    pub file: String,
    pub location: Location,
    /// Enclosing function or method name, empty at module level.
    pub context: String,
    pub rationale: String,
    pub confidence: f64,
}

impl Opportunity {
    #[must_use]
    pub fn from_hit(hit: OpportunityHit, file: &str) -> Self {
        Self {
            heuristic_id: hit.heuristic_id,
            suggests: hit.suggests,
            file: file.to_string(),
            location: hit.location,
            context: hit.context,
            rationale: hit.rationale,
            confidence: hit.confidence,
        }
    }
}

/// A file that failed to parse; the rest of the run is unaffected.
#[derive(Debug, Clone, Serialize)]
pub struct ParseFailure {
    pub file: String,
    pub message: String,
}

/// A (file, pattern) search that exhausted its expansion budget.
#[derive(Debug, Clone, Serialize)]
pub struct SearchFailure {
    pub file: String,
    pub pattern_id: String,
    pub limit: usize,
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct AnalysisStats {
    /// Files considered by the walk.
    pub files_scanned: usize,
    /// Files parsed and analyzed.
    pub files_analyzed: usize,
    /// Files skipped for parse errors or I/O failures.
    pub files_failed: usize,
}

/// Complete outcome of one analysis run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AnalysisResult {
    pub matches: Vec<PatternMatch>,
    pub opportunities: Vec<Opportunity>,
    pub parse_failures: Vec<ParseFailure>,
    pub search_failures: Vec<SearchFailure>,
    pub stats: AnalysisStats,
}

impl AnalysisResult {
    /// Fold another result (typically one file's findings) into this one.
    pub fn merge(&mut self, other: AnalysisResult) {
        self.matches.extend(other.matches);
        self.opportunities.extend(other.opportunities);
        self.parse_failures.extend(other.parse_failures);
        self.search_failures.extend(other.search_failures);
        self.stats.files_scanned += other.stats.files_scanned;
        self.stats.files_analyzed += other.stats.files_analyzed;
        self.stats.files_failed += other.stats.files_failed;
    }

    /// Impose the canonical order and drop redundant findings.
    ///
    /// Two matches are the same finding when they bind the same pattern to
    /// the same set of nodes in the same file, regardless of which role
    /// each node landed in; only the first in canonical order is kept. An
    /// opportunity is redundant when a match for the pattern it suggests
    /// exists in the same file and the match's root encloses the
    /// opportunity's trigger site.
    pub fn finalize(&mut self) {
        self.matches.sort_by(|a, b| {
            (&a.file, a.location, &a.pattern_id).cmp(&(&b.file, b.location, &b.pattern_id))
        });
        let mut seen = FxHashSet::default();
        self.matches.retain(|m| {
            let mut sites: Vec<Location> = m.roles.iter().map(|r| r.location).collect();
            sites.sort_unstable();
            seen.insert((m.file.clone(), m.pattern_id.clone(), sites))
        });

        let matches = &self.matches;
        self.opportunities.retain(|opp| {
            !matches.iter().any(|m| {
                m.pattern_id == opp.suggests
                    && m.file == opp.file
                    && m.location.encloses(&opp.location)
            })
        });
        self.opportunities.sort_by(|a, b| {
            (&a.file, a.location, &a.heuristic_id).cmp(&(&b.file, b.location, &b.heuristic_id))
        });

        self.parse_failures
            .sort_by(|a, b| (&a.file, &a.message).cmp(&(&b.file, &b.message)));
        self.search_failures
            .sort_by(|a, b| (&a.file, &a.pattern_id).cmp(&(&b.file, &b.pattern_id)));
    }
}
