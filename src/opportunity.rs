//! Pattern-absence heuristics.
//!
//! Walks a normalized tree looking for structural smells that suggest a
//! pattern is missing: branchy construction (Factory Method), fan-out
//! after a state change (Observer), branchy computation
//! (Strategy). Each hit carries a filled rationale and a confidence that
//! grows with how far the trigger exceeds its minimum.

use rustc_hash::FxHashSet;

use crate::ast::{kinds, Location, Node};
use crate::registry::{HeuristicDefinition, PatternRegistry, Trigger};

/// Base confidence of a triggered opportunity.
pub const OPPORTUNITY_BASE: f64 = 0.5;
/// Bonus per unit over the trigger minimum.
pub const OPPORTUNITY_STEP: f64 = 0.1;
/// Opportunities never reach match-level certainty.
pub const OPPORTUNITY_CAP: f64 = 0.95;

/// One triggered heuristic, before aggregation.
#[derive(Debug, Clone)]
pub struct OpportunityHit {
    pub heuristic_id: String,
    /// Pattern id the heuristic suggests applying.
    pub suggests: String,
    pub location: Location,
    /// Name of the enclosing function or method, if any.
    pub context: String,
    pub rationale: String,
    pub confidence: f64,
}

/// Evaluate every registered heuristic against one file's tree.
#[must_use]
pub fn detect_opportunities(tree: &Node, registry: &PatternRegistry) -> Vec<OpportunityHit> {
    let mut hits = Vec::new();
    walk(tree, "", registry, &mut hits);
    hits
}

fn walk(node: &Node, enclosing: &str, registry: &PatternRegistry, hits: &mut Vec<OpportunityHit>) {
    let enclosing = if matches!(node.kind.as_str(), kinds::FUNCTION | kinds::METHOD) {
        for heuristic in registry.heuristics() {
            if let Trigger::FanOut { min_receivers } = heuristic.trigger {
                if let Some(count) = fan_out_receivers(node, min_receivers) {
                    hits.push(make_hit(heuristic, registry, node.location, node.name_or_empty(), count, min_receivers));
                }
            }
        }
        node.name_or_empty()
    } else {
        if node.kind == kinds::CONDITIONAL {
            for heuristic in registry.heuristics() {
                match heuristic.trigger {
                    Trigger::BranchConstruct { min_branches } => {
                        if let Some(count) = constructing_branches(node, min_branches) {
                            hits.push(make_hit(heuristic, registry, node.location, enclosing, count, min_branches));
                        }
                    }
                    Trigger::BranchCompute { min_branches } => {
                        if let Some(count) = computing_branches(node, min_branches) {
                            hits.push(make_hit(heuristic, registry, node.location, enclosing, count, min_branches));
                        }
                    }
                    Trigger::FanOut { .. } => {}
                }
            }
        }
        enclosing
    };

    for child in &node.children {
        walk(child, enclosing, registry, hits);
    }
}

fn make_hit(
    heuristic: &HeuristicDefinition,
    registry: &PatternRegistry,
    location: Location,
    context: &str,
    count: usize,
    minimum: usize,
) -> OpportunityHit {
    let pattern_name = registry
        .get(&heuristic.suggests)
        .map_or(heuristic.suggests.as_str(), |p| p.name.as_str());
    let rationale = heuristic
        .rationale
        .replace("{count}", &count.to_string())
        .replace("{pattern}", pattern_name);
    let extra = count.saturating_sub(minimum) as f64;
    OpportunityHit {
        heuristic_id: heuristic.id.clone(),
        suggests: heuristic.suggests.clone(),
        location,
        context: context.to_string(),
        rationale,
        confidence: (OPPORTUNITY_BASE + OPPORTUNITY_STEP * extra).min(OPPORTUNITY_CAP),
    }
}

/// Branches of a conditional that construct a concrete type. Requires at
/// least two distinct constructed type names, otherwise the branches are
/// just repeated construction, not a dispatch-by-type.
fn constructing_branches(conditional: &Node, min_branches: usize) -> Option<usize> {
    let mut count = 0;
    let mut types: FxHashSet<&str> = FxHashSet::default();
    for branch in conditional.children_of_kind(kinds::BRANCH) {
        let mut constructs = false;
        for n in branch.descendants() {
            if n.kind == kinds::OBJECT_CREATION {
                constructs = true;
                if !n.name_or_empty().is_empty() {
                    types.insert(n.name_or_empty());
                }
            }
        }
        if constructs {
            count += 1;
        }
    }
    (count >= min_branches && types.len() >= 2).then_some(count)
}

/// Branches that compute rather than construct: a binary expression with
/// no object creation anywhere in the branch.
fn computing_branches(conditional: &Node, min_branches: usize) -> Option<usize> {
    let count = conditional
        .children_of_kind(kinds::BRANCH)
        .filter(|b| {
            b.has_descendant_of_kind(kinds::BINARY)
                && !b.has_descendant_of_kind(kinds::OBJECT_CREATION)
        })
        .count();
    (count >= min_branches).then_some(count)
}

/// State mutation followed by calls through several distinct collaborator
/// fields. Nested function subtrees are skipped so a closure's calls do
/// not count toward its parent.
fn fan_out_receivers(method: &Node, min_receivers: usize) -> Option<usize> {
    let mut assigned = false;
    let mut receivers: FxHashSet<&str> = FxHashSet::default();
    scan_fan_out(method, &mut assigned, &mut receivers);
    (receivers.len() >= min_receivers).then_some(receivers.len())
}

fn scan_fan_out<'a>(node: &'a Node, assigned: &mut bool, receivers: &mut FxHashSet<&'a str>) {
    for child in &node.children {
        match child.kind.as_str() {
            kinds::FUNCTION | kinds::METHOD => continue,
            kinds::ASSIGNMENT => *assigned = true,
            kinds::CALL if *assigned => {
                if let Some(field) = child.attr_str("receiver_field") {
                    receivers.insert(field);
                }
            }
            _ => {}
        }
        scan_fan_out(child, assigned, receivers);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::parse_named;

    fn detect(source: &str) -> Vec<OpportunityHit> {
        let registry = PatternRegistry::builtin();
        let tree = parse_named(source, "python", "test.py").unwrap();
        detect_opportunities(&tree, &registry)
    }

    #[test]
    fn branchy_construction_suggests_factory() {
        let hits = detect(
            r#"
def build(kind):
    if kind == "circle":
        return Circle()
    elif kind == "square":
        return Square()
    else:
        return Blob()
"#,
        );
        let hit = hits
            .iter()
            .find(|h| h.heuristic_id == "branchy-construction")
            .unwrap();
        assert_eq!(hit.suggests, "factory-method");
        assert_eq!(hit.context, "build");
        assert!(hit.rationale.contains("3 branches"));
        assert!(hit.rationale.contains("Factory Method"));
    }

    #[test]
    fn more_branches_raise_confidence() {
        let two = detect(
            r#"
def build(kind):
    if kind == "a":
        return Circle()
    else:
        return Square()
"#,
        );
        let four = detect(
            r#"
def build(kind):
    if kind == "a":
        return Circle()
    elif kind == "b":
        return Square()
    elif kind == "c":
        return Hexagon()
    else:
        return Blob()
"#,
        );
        let low = two
            .iter()
            .find(|h| h.heuristic_id == "branchy-construction")
            .unwrap();
        let high = four
            .iter()
            .find(|h| h.heuristic_id == "branchy-construction")
            .unwrap();
        assert!(high.confidence > low.confidence);
        assert!(high.confidence <= OPPORTUNITY_CAP);
    }

    #[test]
    fn same_type_in_every_branch_is_not_a_factory_smell() {
        let hits = detect(
            r#"
def build(kind):
    if kind == "a":
        return Widget()
    else:
        return Widget()
"#,
        );
        assert!(hits.iter().all(|h| h.heuristic_id != "branchy-construction"));
    }

    #[test]
    fn fan_out_after_state_change_suggests_observer() {
        let hits = detect(
            r#"
class Checkout:
    def place_order(self, order):
        self.status = "placed"
        self.billing.charge(order)
        self.inventory.reserve(order)
        self.shipping.schedule(order)
"#,
        );
        let hit = hits
            .iter()
            .find(|h| h.heuristic_id == "manual-fan-out")
            .unwrap();
        assert_eq!(hit.suggests, "observer");
        assert_eq!(hit.context, "place_order");
        assert!(hit.rationale.contains("3 distinct"));
    }

    #[test]
    fn branchy_computation_suggests_strategy() {
        let hits = detect(
            r#"
def price(kind, base):
    if kind == "flat":
        return base + 10
    elif kind == "percent":
        return base * 1.2
    else:
        return base - 5
"#,
        );
        let hit = hits
            .iter()
            .find(|h| h.heuristic_id == "branchy-computation")
            .unwrap();
        assert_eq!(hit.suggests, "strategy");
    }

    #[test]
    fn two_computing_branches_stay_quiet() {
        let hits = detect(
            r#"
def price(kind, base):
    if kind == "flat":
        return base + 10
    else:
        return base * 1.2
"#,
        );
        assert!(hits.iter().all(|h| h.heuristic_id != "branchy-computation"));
    }
}
