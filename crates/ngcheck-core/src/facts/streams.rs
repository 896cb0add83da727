//! Stream-combinator facts: network calls under flattening operators and
//! replaying multicasts.

use super::{Fact, FactKind, Subject};
use crate::model::{ArgKind, Call, Declaration};

const FLATTENING: &[&str] = &["switchMap", "mergeMap", "concatMap", "exhaustMap", "flatMap"];

const HTTP_MUTATING: &[&str] = &["post", "put", "patch", "delete"];
const HTTP_READS: &[&str] = &["get", "head", "options", "jsonp"];

const VERB_MUTATING: &[&str] = &[
    "save", "create", "update", "delete", "remove", "add", "submit", "insert", "upsert", "archive",
    "post", "put", "patch",
];
const VERB_READS: &[&str] = &["get", "load", "fetch", "search", "find", "query", "list", "read"];

const SERVICE_SUFFIXES: &[&str] = &["service", "api", "client", "repository", "gateway", "http"];

pub(super) fn extract(decl: &Declaration, facts: &mut Vec<Fact>) {
    for call in &decl.calls {
        let subject = Subject::declaration(decl.id).with_member(call.member);

        if let Some((verb, mutating)) = network_call(call) {
            if let Some(scope) = call.innermost_scope(FLATTENING) {
                facts.push(
                    Fact::new(FactKind::FlattenedNetworkCall, subject, call.span)
                        .with("operator", scope.method.as_str())
                        .with("verb", verb)
                        .with("mutating", mutating)
                        .with("target", call.callee.as_str()),
                );
            }
            continue;
        }

        if let Some(bounded) = replay_buffer(call) {
            facts.push(
                Fact::new(FactKind::ReplayBuffer, subject, call.span)
                    .with("operator", call.method.as_str())
                    .with("bounded", bounded),
            );
        }
    }
}

/// Classifies a call as a network call, returning its verb and whether it
/// mutates server state.
fn network_call(call: &Call) -> Option<(&str, bool)> {
    let receiver = call.receiver.as_deref()?;
    let holder = receiver.rsplit('.').next().unwrap_or(receiver).to_ascii_lowercase();
    let method = call.method.as_str();

    if holder == "http" || holder == "httpclient" {
        if HTTP_MUTATING.contains(&method) {
            return Some((method, true));
        }
        if HTTP_READS.contains(&method) {
            return Some((method, false));
        }
        return None;
    }

    if !SERVICE_SUFFIXES.iter().any(|s| holder.ends_with(s)) {
        return None;
    }
    let verb = leading_word(method);
    if VERB_MUTATING.contains(&verb) {
        Some((verb, true))
    } else if VERB_READS.contains(&verb) {
        Some((verb, false))
    } else {
        None
    }
}

/// Lowercase leading word of a camelCase identifier (`deleteItem` -> `delete`).
fn leading_word(ident: &str) -> &str {
    let end = ident
        .char_indices()
        .skip(1)
        .find(|(_, c)| c.is_ascii_uppercase() || *c == '_')
        .map_or(ident.len(), |(i, _)| i);
    &ident[..end]
}

/// `shareReplay(...)` or `new ReplaySubject(...)`; returns whether the buffer is bounded.
fn replay_buffer(call: &Call) -> Option<bool> {
    match (call.is_new, call.method.as_str()) {
        (false, "shareReplay") => Some(call.arguments.first().is_some_and(|arg| match arg.kind {
            ArgKind::Object => arg.text.contains("bufferSize") && !arg.text.contains("Infinity"),
            _ => !arg.text.contains("Infinity"),
        })),
        (true, "ReplaySubject") => Some(
            call.arguments
                .first()
                .is_some_and(|arg| !arg.text.contains("Infinity")),
        ),
        _ => None,
    }
}
