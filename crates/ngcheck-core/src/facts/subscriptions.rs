//! Subscription-lifecycle facts.

use super::{Fact, FactKind, Subject};
use crate::model::{Call, Declaration, MemberKind};

/// Operators that complete a stream on their own.
const DISPOSAL_OPERATORS: &[&str] = &["takeUntil", "takeUntilDestroyed", "take", "first", "takeWhile"];

const STORE_METHODS: &[&str] = &["add", "push"];

pub(super) fn extract(decl: &Declaration, facts: &mut Vec<Fact>) {
    for call in &decl.calls {
        let subject = Subject::declaration(decl.id).with_member(call.member);

        if call.method == "subscribe" && call.receiver.is_some() {
            let disposal = call
                .operators
                .iter()
                .find(|op| DISPOSAL_OPERATORS.contains(&op.as_str()));
            let stored_in = stored_in(decl, call);
            facts.push(
                Fact::new(FactKind::SubscriptionCreated, subject, call.span)
                    .with_opt("source", call.source.as_deref().or(call.receiver.as_deref()))
                    .with("disposed_inline", disposal.is_some())
                    .with_opt("disposal", disposal.map(String::as_str))
                    .with_opt("stored_in", stored_in.as_deref())
                    .with("nested", call.within(&["subscribe"]))
                    .with("decl_kind", decl.kind.as_str()),
            );
            if let Some(holder) = stored_in {
                facts.push(Fact::new(FactKind::SubscriptionStored, subject, call.span).with("field", holder));
            }
            continue;
        }

        if call.method == "unsubscribe" {
            let teardown = in_teardown(decl, call);
            if let Some(holder) = disposed_holder(decl, call, teardown) {
                facts.push(
                    Fact::new(FactKind::SubscriptionDisposed, subject, call.span)
                        .with("field", holder)
                        .with("in_teardown", teardown),
                );
            }
            continue;
        }

        if call.method == "onDestroy" && call.receiver.is_some() {
            facts.push(Fact::new(FactKind::TeardownHook, subject, call.span).with("hook", "onDestroy"));
        }
    }
}

/// Where the subscription is kept: `this.sub = ...subscribe()`,
/// `this.subs.add(...subscribe())`, or the same with a local variable.
fn stored_in(decl: &Declaration, call: &Call) -> Option<String> {
    if let Some(target) = &call.assigned_to {
        return match target.as_slice() {
            [this, field] if this == "this" => Some(field.clone()),
            [local] => Some(local_holder(decl, call, local)),
            _ => None,
        };
    }
    let parent = decl.call(call.argument_of?)?;
    if !STORE_METHODS.contains(&parent.method.as_str()) {
        return None;
    }
    holder(decl, parent, parent.receiver.as_deref()?)
}

/// Holder whose subscription(s) a `.unsubscribe()` call disposes.
///
/// Locals only count inside a teardown callback; elsewhere the local is
/// usually a short-lived subscription being replaced.
fn disposed_holder(decl: &Declaration, call: &Call, teardown: bool) -> Option<String> {
    let receiver = call.receiver.as_deref()?;
    if let Some(field) = this_field(receiver) {
        return Some(field.to_string());
    }
    if teardown && is_identifier(receiver) {
        return Some(local_holder(decl, call, receiver));
    }
    // `this.subs.forEach(s => s.unsubscribe())`
    let scope = call.innermost_scope(&["forEach"])?;
    let each = decl.call(scope.call)?;
    holder(decl, each, each.receiver.as_deref()?)
}

fn holder(decl: &Declaration, call: &Call, receiver: &str) -> Option<String> {
    if let Some(field) = this_field(receiver) {
        return Some(field.to_string());
    }
    is_identifier(receiver).then(|| local_holder(decl, call, receiver))
}

/// Locals are keyed by their enclosing member, so `sub` in `ngOnInit` never
/// matches a `this.sub` field or a `sub` in another method.
fn local_holder(decl: &Declaration, call: &Call, name: &str) -> String {
    let scope = call
        .member
        .and_then(|id| decl.members.get(id.0))
        .map_or(decl.name.as_str(), |m| m.name.as_str());
    format!("{scope}/{name}")
}

fn this_field(receiver: &str) -> Option<&str> {
    receiver.strip_prefix("this.").filter(|f| !f.contains('.'))
}

fn is_identifier(text: &str) -> bool {
    !text.is_empty()
        && text != "this"
        && text.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
        && !text.starts_with(|c: char| c.is_ascii_digit())
}

fn in_teardown(decl: &Declaration, call: &Call) -> bool {
    let in_hook = call
        .member
        .and_then(|id| decl.members.get(id.0))
        .is_some_and(|m| m.kind == MemberKind::Method && m.name == "ngOnDestroy");
    in_hook || call.within(&["onDestroy"])
}
