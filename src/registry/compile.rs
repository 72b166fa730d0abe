//! Pattern compilation.
//!
//! Turns validated [`PatternDefinition`]s into executable matcher plans:
//! role names become dense indices, regexes are compiled once, and clause
//! order is fixed so matching is deterministic and backtracking is bounded.
//!
//! # Clause scheduling
//!
//! The binding order follows the authored introduction order, but every
//! pure-constraint clause is scheduled as soon as all of its roles are
//! bound. Constraints prune a candidate without branching, so running them
//! at the earliest legal point cuts the search space before the next
//! introduction fans out.

use regex::Regex;

use crate::error::RegistryError;
use crate::registry::definition::{Clause, PatternCategory, PatternDefinition, SignalDef};

/// Dense index into a pattern's role table.
pub type RoleId = usize;

/// Executable form of one clause.
#[derive(Debug, Clone)]
pub enum ClauseOp {
    /// Introduce `role` by enumerating every node of `kind` in the file.
    BindByKind { role: RoleId, kind: String },
    /// Introduce `role` by enumerating direct children of `of` with `kind`.
    BindChild { role: RoleId, of: RoleId, kind: String },
    /// Re-check the kind of an already-bound role.
    CheckKind { role: RoleId, kind: String },
    HasChild { role: RoleId, kind: String },
    HasDescendant { role: RoleId, kind: String },
    NameMatches { role: RoleId, regex: Regex },
    Inherits { role: RoleId, base: RoleId },
    Calls { role: RoleId, target: RoleId },
    Delegates { role: RoleId, to: RoleId },
    Distinct { roles: Vec<RoleId> },
}

impl ClauseOp {
    /// Whether this op introduces a new role (branches the search).
    #[must_use]
    pub fn is_introduction(&self) -> bool {
        matches!(self, ClauseOp::BindByKind { .. } | ClauseOp::BindChild { .. })
    }
}

/// Compiled scoring signal.
#[derive(Debug, Clone)]
pub struct CompiledSignal {
    /// Short label reported as evidence when the signal fires.
    pub label: String,
    pub op: SignalOp,
}

#[derive(Debug, Clone)]
pub enum SignalOp {
    NameResembles { role: RoleId, regex: Regex, bonus: f64 },
    SingleResponsibility { role: RoleId, max_public_methods: usize, bonus: f64 },
    CleanDelegation { role: RoleId, bonus: f64 },
    FieldTypeNamesRole { field: RoleId, class: RoleId, bonus: f64 },
}

impl SignalOp {
    #[must_use]
    pub fn bonus(&self) -> f64 {
        match self {
            SignalOp::NameResembles { bonus, .. }
            | SignalOp::SingleResponsibility { bonus, .. }
            | SignalOp::CleanDelegation { bonus, .. }
            | SignalOp::FieldTypeNamesRole { bonus, .. } => *bonus,
        }
    }
}

/// An executable matcher plan for one pattern.
#[derive(Debug, Clone)]
pub struct CompiledPattern {
    pub id: String,
    pub name: String,
    pub category: PatternCategory,
    /// Role names; index is the [`RoleId`]. Role 0 is the root role.
    pub roles: Vec<String>,
    /// Clauses in fixed execution order.
    pub ops: Vec<ClauseOp>,
    pub signals: Vec<CompiledSignal>,
    /// Kind enumerated by the root clause.
    pub root_kind: String,
}

/// Compile a single definition, running both validation passes.
pub fn compile_pattern(def: &PatternDefinition) -> Result<CompiledPattern, RegistryError> {
    if def.clauses.is_empty() {
        return Err(RegistryError::EmptyPattern {
            pattern: def.id.clone(),
        });
    }

    let role_id = |name: &str, clause: usize| -> Result<RoleId, RegistryError> {
        def.roles
            .iter()
            .position(|r| r == name)
            .ok_or_else(|| RegistryError::UndeclaredRole {
                pattern: def.id.clone(),
                clause,
                role: name.to_string(),
            })
    };

    // All referenced roles must be declared.
    for (index, clause) in def.clauses.iter().enumerate() {
        for role in clause.referenced_roles() {
            role_id(role, index)?;
        }
    }

    // Schedule clauses: introductions in authored order, each constraint as
    // soon as its roles are bound. `bound` tracks roles by id.
    let mut bound = vec![false; def.roles.len()];
    let mut scheduled: Vec<usize> = Vec::new();
    let mut remaining: Vec<usize> = (0..def.clauses.len()).collect();

    while !remaining.is_empty() {
        // Constraints whose roles are all bound go first.
        if let Some(pos) = remaining.iter().position(|&i| {
            let clause = &def.clauses[i];
            clause.introduces().map_or(true, |(role, _)| {
                // A "kind-equality" on a bound role is a pure re-check.
                def.roles.iter().position(|r| r == role).is_some_and(|id| bound[id])
            }) && clause
                .referenced_roles()
                .iter()
                .all(|r| def.roles.iter().position(|d| d == *r).is_some_and(|id| bound[id]))
        }) {
            scheduled.push(remaining.remove(pos));
            continue;
        }

        // Otherwise the first runnable introduction.
        let Some(pos) = remaining.iter().position(|&i| {
            def.clauses[i].introduces().is_some_and(|(_, deps)| {
                deps.iter()
                    .all(|d| def.roles.iter().position(|r| r == *d).is_some_and(|id| bound[id]))
            })
        }) else {
            // Nothing runnable: the earliest remaining clause references an
            // unbound role with no way to introduce it.
            let index = remaining[0];
            let role = def.clauses[index]
                .referenced_roles()
                .into_iter()
                .find(|r| {
                    def.roles
                        .iter()
                        .position(|d| d == *r)
                        .is_some_and(|id| !bound[id])
                })
                .unwrap_or_default()
                .to_string();
            return Err(RegistryError::UnboundRole {
                pattern: def.id.clone(),
                clause: index,
                role,
            });
        };
        let index = remaining.remove(pos);
        if let Some((role, _)) = def.clauses[index].introduces() {
            if let Some(id) = def.roles.iter().position(|r| r == role) {
                bound[id] = true;
            }
        }
        scheduled.push(index);
    }

    // Every declared role must have been introduced.
    for (id, is_bound) in bound.iter().enumerate() {
        if !is_bound {
            return Err(RegistryError::UnintroducedRole {
                pattern: def.id.clone(),
                role: def.roles[id].clone(),
            });
        }
    }

    // The first scheduled clause must introduce the root role globally.
    let root_kind = match &def.clauses[scheduled[0]] {
        Clause::KindEquality { role, kind } if role == &def.roles[0] => kind.clone(),
        _ => {
            return Err(RegistryError::BadRootClause {
                pattern: def.id.clone(),
            })
        }
    };

    // Lower scheduled clauses to ops.
    let mut bound_now = vec![false; def.roles.len()];
    let mut ops = Vec::with_capacity(scheduled.len());
    for &index in &scheduled {
        let clause = &def.clauses[index];
        let op = match clause {
            Clause::KindEquality { role, kind } => {
                let role = role_id(role, index)?;
                if bound_now[role] {
                    ClauseOp::CheckKind { role, kind: kind.clone() }
                } else {
                    bound_now[role] = true;
                    ClauseOp::BindByKind { role, kind: kind.clone() }
                }
            }
            Clause::ChildOfKind { role, of, kind } => {
                let of = role_id(of, index)?;
                let role = role_id(role, index)?;
                bound_now[role] = true;
                ClauseOp::BindChild { role, of, kind: kind.clone() }
            }
            Clause::HasChildOfKind { role, kind } => ClauseOp::HasChild {
                role: role_id(role, index)?,
                kind: kind.clone(),
            },
            Clause::HasDescendantOfKind { role, kind } => ClauseOp::HasDescendant {
                role: role_id(role, index)?,
                kind: kind.clone(),
            },
            Clause::NameMatchesRegex { role, pattern } => ClauseOp::NameMatches {
                role: role_id(role, index)?,
                regex: compile_regex(&def.id, pattern)?,
            },
            Clause::InheritsFromRole { role, base } => ClauseOp::Inherits {
                role: role_id(role, index)?,
                base: role_id(base, index)?,
            },
            Clause::CallsRole { role, target } => ClauseOp::Calls {
                role: role_id(role, index)?,
                target: role_id(target, index)?,
            },
            Clause::DelegatesToRole { role, to } => ClauseOp::Delegates {
                role: role_id(role, index)?,
                to: role_id(to, index)?,
            },
            Clause::DistinctRoles { roles } => ClauseOp::Distinct {
                roles: roles
                    .iter()
                    .map(|r| role_id(r, index))
                    .collect::<Result<Vec<_>, _>>()?,
            },
        };
        ops.push(op);
    }

    let signals = def
        .signals
        .iter()
        .map(|s| compile_signal(def, s))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(CompiledPattern {
        id: def.id.clone(),
        name: def.name.clone(),
        category: def.category,
        roles: def.roles.clone(),
        ops,
        signals,
        root_kind,
    })
}

fn compile_signal(
    def: &PatternDefinition,
    signal: &SignalDef,
) -> Result<CompiledSignal, RegistryError> {
    let role_id = |name: &str| -> Result<RoleId, RegistryError> {
        def.roles
            .iter()
            .position(|r| r == name)
            .ok_or_else(|| RegistryError::UndeclaredRole {
                pattern: def.id.clone(),
                clause: def.clauses.len(),
                role: name.to_string(),
            })
    };

    let (label, op) = match signal {
        SignalDef::NameResembles { role, pattern, bonus } => (
            format!("name of '{role}' resembles /{pattern}/"),
            SignalOp::NameResembles {
                role: role_id(role)?,
                regex: compile_regex(&def.id, pattern)?,
                bonus: *bonus,
            },
        ),
        SignalDef::SingleResponsibility { role, max_public_methods, bonus } => (
            format!("'{role}' has a narrow public surface"),
            SignalOp::SingleResponsibility {
                role: role_id(role)?,
                max_public_methods: *max_public_methods,
                bonus: *bonus,
            },
        ),
        SignalDef::CleanDelegation { role, bonus } => (
            format!("'{role}' delegates without conditional dispatch"),
            SignalOp::CleanDelegation {
                role: role_id(role)?,
                bonus: *bonus,
            },
        ),
        SignalDef::FieldTypeNamesRole { field, class, bonus } => (
            format!("type of '{field}' names '{class}'"),
            SignalOp::FieldTypeNamesRole {
                field: role_id(field)?,
                class: role_id(class)?,
                bonus: *bonus,
            },
        ),
    };
    Ok(CompiledSignal { label, op })
}

fn compile_regex(pattern_id: &str, source: &str) -> Result<Regex, RegistryError> {
    Regex::new(source).map_err(|e| RegistryError::BadRegex {
        pattern: pattern_id.to_string(),
        source_text: source.to_string(),
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::definition::DefinitionDocument;

    fn parse_one(json: &str) -> PatternDefinition {
        let doc: DefinitionDocument = serde_json::from_str(json).unwrap();
        doc.patterns.into_iter().next().unwrap()
    }

    const VALID: &str = r#"{
        "patterns": [{
            "id": "wrapper",
            "name": "Wrapper",
            "category": "structural",
            "roles": ["outer", "inner", "forward"],
            "clauses": [
                {"pred": "kind-equality", "role": "outer", "kind": "class_definition"},
                {"pred": "child-of-kind", "role": "inner", "of": "outer", "kind": "field_definition"},
                {"pred": "child-of-kind", "role": "forward", "of": "outer", "kind": "method_definition"},
                {"pred": "delegates-to-role", "role": "forward", "to": "inner"}
            ]
        }]
    }"#;

    #[test]
    fn compiles_valid_pattern() {
        let compiled = compile_pattern(&parse_one(VALID)).unwrap();
        assert_eq!(compiled.root_kind, "class_definition");
        assert_eq!(compiled.ops.len(), 4);
        assert!(compiled.ops[0].is_introduction());
    }

    #[test]
    fn constraint_scheduled_after_its_introduction() {
        // The delegates clause references `forward` and `inner`; it must
        // end up after both introductions despite any authored order.
        let json = VALID.replace(
            r#"{"pred": "child-of-kind", "role": "forward", "of": "outer", "kind": "method_definition"},
                {"pred": "delegates-to-role", "role": "forward", "to": "inner"}"#,
            r#"{"pred": "delegates-to-role", "role": "forward", "to": "inner"},
                {"pred": "child-of-kind", "role": "forward", "of": "outer", "kind": "method_definition"}"#,
        );
        let compiled = compile_pattern(&parse_one(&json)).unwrap();
        assert!(matches!(compiled.ops[3], ClauseOp::Delegates { .. }));
    }

    #[test]
    fn unbound_role_is_rejected() {
        let json = r#"{
            "patterns": [{
                "id": "broken",
                "name": "Broken",
                "category": "structural",
                "roles": ["a", "ghost"],
                "clauses": [
                    {"pred": "kind-equality", "role": "a", "kind": "class_definition"},
                    {"pred": "calls-role", "role": "a", "target": "ghost"}
                ]
            }]
        }"#;
        let err = compile_pattern(&parse_one(json)).unwrap_err();
        assert!(matches!(err, RegistryError::UnboundRole { ref role, .. } if role == "ghost"));
    }

    #[test]
    fn undeclared_role_is_rejected() {
        let json = r#"{
            "patterns": [{
                "id": "broken",
                "name": "Broken",
                "category": "structural",
                "roles": ["a"],
                "clauses": [
                    {"pred": "kind-equality", "role": "a", "kind": "class_definition"},
                    {"pred": "calls-role", "role": "a", "target": "nobody"}
                ]
            }]
        }"#;
        let err = compile_pattern(&parse_one(json)).unwrap_err();
        assert!(matches!(err, RegistryError::UndeclaredRole { .. }));
    }

    #[test]
    fn root_clause_must_introduce_first_role() {
        let json = r#"{
            "patterns": [{
                "id": "rootless",
                "name": "Rootless",
                "category": "structural",
                "roles": ["a", "b"],
                "clauses": [
                    {"pred": "kind-equality", "role": "b", "kind": "class_definition"},
                    {"pred": "child-of-kind", "role": "a", "of": "b", "kind": "method_definition"}
                ]
            }]
        }"#;
        let err = compile_pattern(&parse_one(json)).unwrap_err();
        assert!(matches!(err, RegistryError::BadRootClause { .. }));
    }

    #[test]
    fn empty_pattern_is_rejected() {
        let json = r#"{
            "patterns": [{
                "id": "empty", "name": "Empty", "category": "structural",
                "roles": [], "clauses": []
            }]
        }"#;
        let err = compile_pattern(&parse_one(json)).unwrap_err();
        assert!(matches!(err, RegistryError::EmptyPattern { .. }));
    }

    #[test]
    fn bad_regex_is_rejected() {
        let json = r#"{
            "patterns": [{
                "id": "rx", "name": "Rx", "category": "structural",
                "roles": ["a"],
                "clauses": [
                    {"pred": "kind-equality", "role": "a", "kind": "class_definition"},
                    {"pred": "name-matches-regex", "role": "a", "pattern": "(unclosed"}
                ]
            }]
        }"#;
        let err = compile_pattern(&parse_one(json)).unwrap_err();
        assert!(matches!(err, RegistryError::BadRegex { .. }));
    }
}
