//! Normalization helpers shared across language front-ends.

use crate::ast::node::{kinds, AttrValue, Node};

/// Whether an identifier looks like a type name (leading uppercase).
///
/// Used to classify bare calls as object creation in languages without an
/// explicit `new` keyword.
#[must_use]
pub fn is_type_name(ident: &str) -> bool {
    ident.chars().next().is_some_and(|c| c.is_uppercase())
}

/// Decomposed dotted callee text.
pub struct CalleeParts {
    /// Final segment: the called method or function name.
    pub method: String,
    /// Receiver path without the method segment, if any.
    pub receiver: Option<String>,
    /// First receiver segment after stripping the self word, if any.
    ///
    /// For `self.adaptee.request`, this is `adaptee`, the field the call
    /// goes through, which is what delegation clauses bind against.
    pub receiver_field: Option<String>,
}

/// Split a dotted callee like `self.adaptee.request` into parts.
///
/// `self_words` are the language's instance keywords (`self`, `this`,
/// `cls`); a leading self word is stripped before the field segment is
/// picked.
#[must_use]
pub fn split_callee(dotted: &str, self_words: &[&str]) -> CalleeParts {
    let segments: Vec<&str> = dotted.split('.').collect();
    let method = segments.last().map_or(String::new(), |s| (*s).to_string());

    if segments.len() < 2 {
        return CalleeParts { method, receiver: None, receiver_field: None };
    }

    let receiver = segments[..segments.len() - 1].join(".");
    let mut rest = &segments[..segments.len() - 1];
    if rest.first().is_some_and(|s| self_words.contains(s)) {
        rest = &rest[1..];
    }
    let receiver_field = rest.first().map(|s| (*s).to_string());

    CalleeParts {
        method,
        receiver: Some(receiver),
        receiver_field,
    }
}

/// Synthesize `field_definition` nodes from instance assignments inside a
/// normalized method body (`self.x = ...` / `this.x = ...`).
///
/// The field type is inferred when the right-hand side constructs an
/// object. Only single-segment targets count; `self.a.b = ...` mutates a
/// collaborator, not a field of this class.
#[must_use]
pub fn fields_from_instance_assignments(method: &Node, self_words: &[&str]) -> Vec<Node> {
    let mut fields = Vec::new();
    for node in method.descendants() {
        if node.kind != kinds::ASSIGNMENT {
            continue;
        }
        let Some(target) = node.attr_str("target") else { continue };
        let segments: Vec<&str> = target.split('.').collect();
        if segments.len() != 2 || !self_words.contains(&segments[0]) {
            continue;
        }

        let mut field = Node::new(kinds::FIELD, Some(segments[1].to_string()), node.location);
        field.attrs.insert("static".into(), AttrValue::Bool(false));
        if let Some(created) = node.children.iter().find(|c| c.kind == kinds::OBJECT_CREATION) {
            if let Some(type_name) = &created.name {
                field.attrs.insert("type".into(), AttrValue::Str(type_name.clone()));
            }
        }
        fields.push(field);
    }
    fields
}

/// Deduplicate synthesized fields by name, keeping the first occurrence.
pub fn dedup_fields(fields: &mut Vec<Node>) {
    let mut seen = Vec::new();
    fields.retain(|f| {
        let name = f.name_or_empty().to_string();
        if seen.contains(&name) {
            false
        } else {
            seen.push(name);
            true
        }
    });
}
