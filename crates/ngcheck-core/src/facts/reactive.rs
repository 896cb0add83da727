//! Reactive-state facts: signals, computed values and effects.

use std::collections::BTreeMap;

use super::{Fact, FactKind, Subject};
use crate::model::{Call, Declaration, Member};

const WRITABLE: &[&str] = &["signal", "model", "model.required", "linkedSignal"];
const READ_ONLY: &[&str] = &[
    "input",
    "input.required",
    "toSignal",
    "viewChild",
    "viewChild.required",
    "viewChildren",
    "contentChild",
    "contentChildren",
];
const WRITE_METHODS: &[&str] = &["set", "update", "mutate"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SignalKind {
    Writable,
    ReadOnly,
    Computed,
}

pub(super) fn extract(decl: &Declaration, facts: &mut Vec<Fact>) {
    let mut signals = BTreeMap::new();
    for member in &decl.members {
        let Some(callee) = member.initializer_callee() else {
            continue;
        };
        let subject = Subject::declaration(decl.id).with_member(Some(member.id));
        let kind = if WRITABLE.contains(&callee) {
            SignalKind::Writable
        } else if READ_ONLY.contains(&callee) {
            SignalKind::ReadOnly
        } else if callee == "computed" {
            SignalKind::Computed
        } else {
            continue;
        };
        signals.insert(member.name.as_str(), kind);
        let fact = if kind == SignalKind::Computed {
            Fact::new(FactKind::ComputedDeclared, subject, member.span)
        } else {
            Fact::new(FactKind::SignalDeclared, subject, member.span)
                .with("writable", kind == SignalKind::Writable)
        };
        facts.push(fact.with("signal", member.name.as_str()));
    }

    for call in &decl.calls {
        let subject = Subject::declaration(decl.id).with_member(call.member);
        if call.callee == "effect" && !call.is_new {
            facts.push(
                Fact::new(FactKind::EffectDeclared, subject, call.span).with("effect", call.id.0),
            );
            continue;
        }

        if let Some(name) = signal_read(call) {
            if signals.contains_key(name) {
                facts.push(
                    Fact::new(FactKind::SignalRead, subject, call.span)
                        .with("signal", name)
                        .with_opt("effect", enclosing_effect(call))
                        .with("untracked", call.within(&["untracked"]))
                        .with("in_computed", call.within(&["computed"])),
                );
            }
            continue;
        }

        if let Some(name) = signal_write(call) {
            if signals.get(name) == Some(&SignalKind::Writable) {
                facts.push(
                    Fact::new(FactKind::SignalWritten, subject, call.span)
                        .with("signal", name)
                        .with("op", call.method.as_str())
                        .with_opt("effect", enclosing_effect(call))
                        .with("untracked", call.within(&["untracked"])),
                );
            }
        }
    }
}

/// `this.name()` with no arguments.
/// Returns true if `name` is a signal-valued member of `decl`.
pub(super) fn is_signal_member(decl: &Declaration, name: &str) -> bool {
    decl.member(name)
        .and_then(Member::initializer_callee)
        .is_some_and(|c| WRITABLE.contains(&c) || READ_ONLY.contains(&c) || c == "computed")
}

fn signal_read(call: &Call) -> Option<&str> {
    if call.is_new || !call.arguments.is_empty() {
        return None;
    }
    match call.receiver.as_deref() {
        Some("this") => Some(call.method.as_str()),
        _ => None,
    }
}

/// `this.name.set(..)` / `this.name.update(..)`.
fn signal_write(call: &Call) -> Option<&str> {
    if !WRITE_METHODS.contains(&call.method.as_str()) {
        return None;
    }
    call.receiver
        .as_deref()?
        .strip_prefix("this.")
        .filter(|name| !name.contains('.'))
}

fn enclosing_effect(call: &Call) -> Option<usize> {
    call.scopes
        .iter()
        .rev()
        .find(|s| s.callee == "effect")
        .map(|s| s.call.0)
}
