//! State-shape facts: container nesting, derivable fields and parameter
//! mutation.

use super::{Fact, FactKind, Subject};
use crate::model::{
    DeclKind, Declaration, LiteralField, ObjectLiteral, PropertyWrite, RootKind, ValueShape,
};

const STATE_WRAPPERS: &[&str] = &[
    "signal",
    "signalState",
    "signalStore",
    "withState",
    "new BehaviorSubject",
    "createReducer",
    "createFeature",
];

const DERIVED_LIST_PREFIXES: &[&str] = &["filtered", "sorted", "visible"];

pub(super) fn extract(decl: &Declaration, facts: &mut Vec<Fact>) {
    for literal in decl.literals.iter().filter(|l| is_state_container(l)) {
        let subject = Subject::declaration(decl.id).with_member(literal.member);
        facts.push(
            Fact::new(FactKind::StateContainer, subject, literal.span)
                .with("name", literal.owner.as_str())
                .with("depth", literal.depth)
                .with_opt("wrapper", literal.wrapper.as_deref()),
        );
        for (field, derived_from, reason) in derivable_fields(literal) {
            facts.push(
                Fact::new(FactKind::DerivableStateField, subject, literal.span)
                    .with("container", literal.owner.as_str())
                    .with("field", field.path.join("."))
                    .with("derived_from", derived_from)
                    .with("reason", reason),
            );
        }
    }

    for write in decl.writes.iter().filter(|w| w.root == RootKind::Parameter) {
        if write.hops() == 0 {
            continue;
        }
        facts.push(
            Fact::new(
                FactKind::ParameterMutation,
                Subject::declaration(decl.id).with_member(write.member),
                write.span,
            )
            .with("root", write.target.first().map_or("", String::as_str))
            .with("path", write.target.join("."))
            .with("hops", write.hops())
            .with("in_reducer", in_reducer(decl, write))
            .with("immer", write.scopes.iter().any(|s| s.method == "produce")),
        );
    }
}

fn is_state_container(literal: &ObjectLiteral) -> bool {
    literal.owner.to_ascii_lowercase().contains("state")
        || literal
            .wrapper
            .as_deref()
            .is_some_and(|w| STATE_WRAPPERS.contains(&w))
}

fn in_reducer(decl: &Declaration, write: &PropertyWrite) -> bool {
    decl.kind == DeclKind::Reducer
        || write
            .scopes
            .iter()
            .any(|s| s.method == "on" || s.method == "createReducer")
}

/// Top-level array field named like `stem` (`user` matches `users`).
fn collection<'a>(literal: &'a ObjectLiteral, stem: &str) -> Option<&'a LiteralField> {
    if stem.is_empty() {
        return None;
    }
    literal.fields.iter().find(|f| {
        f.is_top_level() && f.shape == ValueShape::Array && {
            let key = f.key();
            key.eq_ignore_ascii_case(stem) || key.eq_ignore_ascii_case(&format!("{stem}s"))
        }
    })
}

/// Top-level field holding the normalized copies of `stem` entities: an
/// array, an id-keyed map (`users: { 1: {...} }`) or an entity adapter
/// state (`users: { ids, entities }`).
fn entity_home<'a>(literal: &'a ObjectLiteral, stem: &str) -> Option<&'a LiteralField> {
    if let Some(array) = collection(literal, stem) {
        return Some(array);
    }
    if stem.is_empty() {
        return None;
    }
    let plural = format!("{stem}s");
    literal.fields.iter().find(|f| {
        f.is_top_level()
            && f.shape == ValueShape::Object
            && (f.key().eq_ignore_ascii_case(&plural)
                || (f.key().eq_ignore_ascii_case(stem) && has_entities(literal, f.key())))
    })
}

fn has_entities(literal: &ObjectLiteral, key: &str) -> bool {
    literal
        .fields
        .iter()
        .any(|f| f.path.len() == 2 && f.path[0] == key && f.key() == "entities")
}

/// Fields whose value can be derived from (or duplicates) another field.
fn derivable_fields(literal: &ObjectLiteral) -> Vec<(&LiteralField, &str, &'static str)> {
    let mut found = Vec::new();
    for field in &literal.fields {
        let key = field.key();

        if field.is_top_level() {
            if let Some(stem) = key.strip_prefix("selected") {
                if field.shape != ValueShape::Array && !stem.ends_with("Id") {
                    if let Some(source) = collection(literal, stem) {
                        found.push((field, source.key(), "copy of a selected entity"));
                        continue;
                    }
                }
            }
            if field.shape == ValueShape::Array {
                if let Some(stem) = DERIVED_LIST_PREFIXES.iter().find_map(|p| key.strip_prefix(p)) {
                    if let Some(source) = collection(literal, stem) {
                        found.push((field, source.key(), "derived list"));
                        continue;
                    }
                }
            }
            if field.shape == ValueShape::Scalar {
                let stem = key
                    .strip_suffix("Count")
                    .or_else(|| key.strip_prefix("total"))
                    .or_else(|| key.strip_prefix("num"));
                if let Some(source) = stem.and_then(|s| collection(literal, s)) {
                    found.push((field, source.key(), "derived count"));
                }
            }
            continue;
        }

        // An entity embedded inside another collection's items while also
        // being stored as its own collection.
        if field.shape == ValueShape::Object && field.path.iter().any(|p| p == "[]") {
            if let Some(source) = entity_home(literal, key) {
                if field.path.first().map(String::as_str) != Some(source.key()) {
                    found.push((field, source.key(), "embedded entity copy"));
                }
            }
        }
    }
    found
}
