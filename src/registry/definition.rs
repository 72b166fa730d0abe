//! Declarative definition documents.
//!
//! Patterns and opportunity heuristics are authored as JSON documents and
//! deserialized into these types. The predicate and signal vocabularies are
//! closed: serde's tagged-enum deserialization rejects unknown `pred`,
//! `signal` and trigger `kind` tags, which is validation pass (b) of the
//! registry load.

use serde::{Deserialize, Serialize};

/// One definition document: any mix of patterns and heuristics.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DefinitionDocument {
    #[serde(default)]
    pub patterns: Vec<PatternDefinition>,
    #[serde(default)]
    pub heuristics: Vec<HeuristicDefinition>,
}

/// Categories of design patterns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternCategory {
    /// Patterns dealing with object creation mechanisms.
    Creational,
    /// Patterns dealing with object composition.
    Structural,
    /// Patterns dealing with object interaction.
    Behavioral,
}

impl std::fmt::Display for PatternCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Creational => write!(f, "Creational"),
            Self::Structural => write!(f, "Structural"),
            Self::Behavioral => write!(f, "Behavioral"),
        }
    }
}

/// A declarative, role-and-clause description of one pattern's shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternDefinition {
    /// Stable identifier (e.g. "adapter").
    pub id: String,
    /// Human-readable display name (e.g. "Adapter").
    pub name: String,
    pub category: PatternCategory,
    /// Role names bound during matching. The first role is the pattern's
    /// root: its bound node provides the primary location of a match.
    pub roles: Vec<String>,
    /// Ordered structural clauses. Every role referenced by a clause must
    /// be introduced by an earlier (or the same) clause.
    pub clauses: Vec<Clause>,
    /// Auxiliary scoring signals evaluated after structural acceptance.
    #[serde(default)]
    pub signals: Vec<SignalDef>,
}

/// One structural predicate over bound roles.
///
/// `kind-equality` and `child-of-kind` introduce a role when it is not yet
/// bound (global enumeration and child enumeration respectively); all other
/// predicates constrain already-bound roles.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "pred", rename_all = "kebab-case", deny_unknown_fields)]
pub enum Clause {
    /// Role's node has exactly this kind. Introduces the role by
    /// enumerating all nodes of the kind when the role is unbound.
    KindEquality { role: String, kind: String },
    /// Introduces `role` by enumerating direct children of `of` with the
    /// given kind.
    ChildOfKind { role: String, of: String, kind: String },
    /// Bound role has at least one direct child of the kind.
    HasChildOfKind { role: String, kind: String },
    /// Bound role's subtree contains a node of the kind.
    HasDescendantOfKind { role: String, kind: String },
    /// Bound role's name matches the regex.
    NameMatchesRegex { role: String, pattern: String },
    /// Bound role's `bases` attribute names the node bound to `base`.
    InheritsFromRole { role: String, base: String },
    /// Bound role's subtree references the node bound to `target` (call
    /// through it, or mention of its name as callee/receiver).
    CallsRole { role: String, target: String },
    /// Bound role (a method) forwards through the field bound to `to`.
    DelegatesToRole { role: String, to: String },
    /// All listed roles are bound to pairwise-distinct nodes.
    DistinctRoles { roles: Vec<String> },
}

impl Clause {
    /// The role this clause introduces when unbound, with the roles that
    /// must already be bound for the introduction to run.
    #[must_use]
    pub fn introduces(&self) -> Option<(&str, Vec<&str>)> {
        match self {
            Clause::KindEquality { role, .. } => Some((role, Vec::new())),
            Clause::ChildOfKind { role, of, .. } => Some((role, vec![of.as_str()])),
            _ => None,
        }
    }

    /// All roles mentioned by this clause.
    #[must_use]
    pub fn referenced_roles(&self) -> Vec<&str> {
        match self {
            Clause::KindEquality { role, .. }
            | Clause::HasChildOfKind { role, .. }
            | Clause::HasDescendantOfKind { role, .. }
            | Clause::NameMatchesRegex { role, .. } => vec![role],
            Clause::ChildOfKind { role, of, .. } => vec![role, of],
            Clause::InheritsFromRole { role, base } => vec![role, base],
            Clause::CallsRole { role, target } => vec![role, target],
            Clause::DelegatesToRole { role, to } => vec![role, to],
            Clause::DistinctRoles { roles } => roles.iter().map(String::as_str).collect(),
        }
    }
}

/// Auxiliary confidence signal, authored per pattern.
///
/// Each hit adds its `bonus` on top of the base structural score; the sum
/// is clamped to 1.0 by the scorer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "signal", rename_all = "kebab-case", deny_unknown_fields)]
pub enum SignalDef {
    /// Bound role's name matches a canonical-name regex.
    NameResembles { role: String, pattern: String, bonus: f64 },
    /// Bound class has at most `max_public_methods` public methods.
    SingleResponsibility {
        role: String,
        #[serde(default = "default_max_public_methods")]
        max_public_methods: usize,
        bonus: f64,
    },
    /// Bound method delegates through a field without conditional dispatch.
    CleanDelegation { role: String, bonus: f64 },
    /// Bound field's declared type names the class bound to `class`.
    FieldTypeNamesRole { field: String, class: String, bonus: f64 },
}

fn default_max_public_methods() -> usize {
    6
}

/// One pattern-absence heuristic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeuristicDefinition {
    /// Stable smell identifier (e.g. "branchy-construction").
    pub id: String,
    /// Pattern id this smell suggests applying.
    pub suggests: String,
    /// Rationale template; `{count}` and `{pattern}` are filled from the
    /// trigger evidence.
    pub rationale: String,
    pub trigger: Trigger,
}

/// Structural trigger shape for an opportunity heuristic.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case", deny_unknown_fields)]
pub enum Trigger {
    /// A branch-by-discriminant where branches construct and return
    /// different concrete types.
    BranchConstruct {
        #[serde(default = "default_min_two")]
        min_branches: usize,
    },
    /// A method that mutates state then notifies several distinct
    /// receivers in sequence.
    FanOut {
        #[serde(default = "default_min_two")]
        min_receivers: usize,
    },
    /// A branch-by-discriminant whose branches compute rather than
    /// construct.
    BranchCompute {
        #[serde(default = "default_min_three")]
        min_branches: usize,
    },
}

fn default_min_two() -> usize {
    2
}

fn default_min_three() -> usize {
    3
}
