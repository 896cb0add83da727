//! Stream-combinator rules.
//!
//! # Rationale
//!
//! `switchMap` cancels the in-flight inner observable whenever the outer
//! stream emits. For reads that is exactly right: a newer search supersedes
//! the old one. For writes it silently drops requests, so a fast double-click
//! on "save" may persist only one of two edits. Unbounded replay buffers are
//! the other classic stream leak: every emitted value is retained forever.
//!
//! # Detected Patterns
//!
//! - `unbounded-replay` (NG104): `shareReplay()` without a buffer size, or
//!   `new ReplaySubject()` / `new ReplaySubject(Infinity)`.
//! - `switchmap-data-loss` (NG111): a mutating network call (`http.post`,
//!   `service.saveX`, `api.deleteX`) inside `switchMap`.

use ngcheck_core::{FactKind, FactPattern, Matcher, RuleSpec, Severity};

/// NG104: replay buffer without a bound.
#[must_use]
pub fn unbounded_replay() -> RuleSpec {
    RuleSpec::new(
        "unbounded-replay",
        "NG104",
        Severity::Warning,
        "Unbounded replay buffer",
        Matcher::each(FactPattern::new(FactKind::ReplayBuffer).eq("bounded", false)),
    )
    .rationale("A replay buffer with no size keeps every value it has ever seen.")
    .message("`{operator}` replays an unbounded buffer")
    .fix("pass a buffer size, e.g. `shareReplay({ bufferSize: 1, refCount: true })`")
}

/// NG111: mutating request under `switchMap`.
#[must_use]
pub fn switchmap_data_loss() -> RuleSpec {
    RuleSpec::new(
        "switchmap-data-loss",
        "NG111",
        Severity::Error,
        "Mutating request under switchMap",
        Matcher::each(
            FactPattern::new(FactKind::FlattenedNetworkCall)
                .eq("operator", "switchMap")
                .eq("mutating", true),
        ),
    )
    .rationale(
        "switchMap unsubscribes from the pending request when a new value arrives, \
         so earlier writes can be cancelled before the server sees them.",
    )
    .message("`{target}` ({verb}) runs under `switchMap` and may be cancelled")
    .fix("use `concatMap` to queue writes or `mergeMap` to run them concurrently")
}

#[cfg(test)]
mod tests {
    use super::*;
    use ngcheck_core::model::{DeclId, Span};
    use ngcheck_core::{Fact, Subject, Value};

    fn network(operator: &str, verb: &str, mutating: bool) -> Fact {
        Fact::new(
            FactKind::FlattenedNetworkCall,
            Subject::declaration(DeclId(0)),
            Span::default(),
        )
        .with("operator", operator)
        .with("verb", verb)
        .with("mutating", mutating)
        .with("target", "this.api.call")
    }

    #[test]
    fn only_mutations_under_switch_map_match() {
        let facts = vec![
            network("switchMap", "search", false),
            network("switchMap", "save", true),
            network("concatMap", "save", true),
        ];
        let matches = switchmap_data_loss().matcher.evaluate(&facts).unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].bindings.get("verb"), Some(&Value::from("save")));
    }
}
