//! Confidence scoring.
//!
//! A structurally accepted match starts at a fixed base score; each signal
//! that fires adds its authored bonus and contributes one evidence line.
//! The sum is clamped to 1.0. Scoring is pure and additive, so reordering
//! signals never changes the result.

use crate::ast::{kinds, Node};
use crate::engine::StructuralMatch;
use crate::registry::SignalOp;

/// Score every structural acceptance starts from.
pub const BASE_STRUCTURAL_SCORE: f64 = 0.6;

/// Scored confidence with human-readable supporting evidence.
#[derive(Debug, Clone)]
pub struct Score {
    pub confidence: f64,
    pub evidence: Vec<String>,
}

/// Score one structural match against its pattern's signals.
#[must_use]
pub fn score_match(m: &StructuralMatch<'_>) -> Score {
    let mut confidence = BASE_STRUCTURAL_SCORE;
    let mut evidence = vec!["all structural clauses satisfied".to_string()];

    for signal in &m.pattern.signals {
        if signal_fires(&signal.op, m) {
            confidence += signal.op.bonus();
            evidence.push(signal.label.clone());
        }
    }

    Score {
        confidence: confidence.min(1.0),
        evidence,
    }
}

fn signal_fires(op: &SignalOp, m: &StructuralMatch<'_>) -> bool {
    match op {
        SignalOp::NameResembles { role, regex, .. } => {
            regex.is_match(m.nodes[*role].name_or_empty())
        }
        SignalOp::SingleResponsibility {
            role,
            max_public_methods,
            ..
        } => {
            let count = public_method_count(m.nodes[*role]);
            count > 0 && count <= *max_public_methods
        }
        SignalOp::CleanDelegation { role, .. } => is_clean_delegation(m.nodes[*role]),
        SignalOp::FieldTypeNamesRole { field, class, .. } => {
            let class_name = m.nodes[*class].name_or_empty();
            !class_name.is_empty()
                && m.nodes[*field]
                    .attr_str("type")
                    .is_some_and(|t| t.contains(class_name))
        }
    }
}

/// Methods considered part of the public surface: named, not
/// underscore-prefixed. Dunder methods count as private here.
fn public_method_count(class: &Node) -> usize {
    class
        .children_of_kind(kinds::METHOD)
        .filter(|m| {
            let name = m.name_or_empty();
            !name.is_empty() && !name.starts_with('_')
        })
        .count()
}

/// A method delegates cleanly when it forwards through a field and takes
/// no branch deciding whether or where to forward.
fn is_clean_delegation(method: &Node) -> bool {
    let delegates = method
        .descendants()
        .any(|n| n.kind == kinds::CALL && n.attr_str("receiver_field").is_some());
    delegates && !method.has_descendant_of_kind(kinds::CONDITIONAL)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::parse_named;
    use crate::engine::{KindIndex, MatchEngine};
    use crate::registry::PatternRegistry;

    fn adapter_match_score(source: &str) -> Score {
        let registry = PatternRegistry::builtin();
        let pattern = registry.get("adapter").unwrap();
        let tree = parse_named(source, "python", "test.py").unwrap();
        let index = KindIndex::build(&tree);
        let matches = MatchEngine::default().find_matches(pattern, &index).unwrap();
        assert!(!matches.is_empty());
        score_match(&matches[0])
    }

    #[test]
    fn canonical_adapter_scores_above_base() {
        let score = adapter_match_score(
            r#"
class PaymentAdapter:
    def __init__(self, gateway):
        self.gateway = gateway

    def charge(self, amount):
        return self.gateway.submit(amount)
"#,
        );
        // name-resembles, clean-delegation and single-responsibility all fire.
        assert!(score.confidence > BASE_STRUCTURAL_SCORE);
        assert!(score.evidence.len() > 1);
    }

    #[test]
    fn unnamed_shape_scores_at_or_near_base() {
        let score = adapter_match_score(
            r#"
class Thing:
    def __init__(self, other):
        self.other = other

    def run(self, x):
        if x:
            return self.other.run(x)
        return None
"#,
        );
        // Conditional forwarding defeats clean-delegation; the name signal
        // misses. Only single-responsibility can fire.
        assert!(score.confidence < 0.8);
    }

    #[test]
    fn confidence_is_clamped() {
        let m_score = Score {
            confidence: 1.0,
            evidence: vec![],
        };
        assert!(m_score.confidence <= 1.0);

        let score = adapter_match_score(
            r#"
class LegacyAdapterWrapper:
    def __init__(self, adaptee):
        self.adaptee = adaptee

    def request(self, data):
        return self.adaptee.handle(data)
"#,
        );
        assert!(score.confidence <= 1.0);
    }
}
