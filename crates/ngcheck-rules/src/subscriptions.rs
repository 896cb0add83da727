//! Subscription-lifecycle rules.
//!
//! # Rationale
//!
//! A `.subscribe()` in a component outlives the component unless something
//! disposes it. Leaked subscriptions keep the component graph alive and keep
//! running side effects after the view is gone.
//!
//! # Detected Patterns
//!
//! - `memory-leak-subscription` (NG101): a subscription with no inline
//!   disposal operator (`takeUntil`, `takeUntilDestroyed`, `take`, `first`)
//!   that is either not stored or stored in a field nobody unsubscribes.
//! - `nested-subscribe` (NG102): `.subscribe()` inside another subscribe
//!   callback.
//! - `shared-source-resubscription` (NG103): the same upstream subscribed
//!   (or `async`-piped) more than once in one declaration without a shared
//!   intermediate.

use ngcheck_core::{FactKind, FactPattern, Join, Matcher, RuleSpec, Severity, Unless};

/// Kinds of declaration that own a view and therefore a lifetime.
const VIEW_OWNERS: &[&str] = &["component", "directive"];

/// NG101: subscription created without matching disposal.
#[must_use]
pub fn memory_leak_subscription() -> RuleSpec {
    RuleSpec::new(
        "memory-leak-subscription",
        "NG101",
        Severity::Warning,
        "Subscription is never disposed",
        Matcher::without_related(
            FactPattern::new(FactKind::SubscriptionCreated)
                .eq("disposed_inline", false)
                .one_of("decl_kind", VIEW_OWNERS.iter().copied()),
            FactPattern::new(FactKind::SubscriptionDisposed),
            vec![Join::same("@declaration"), Join::new("stored_in", "field")],
        ),
    )
    .rationale(
        "Subscriptions opened by a component keep running after it is destroyed, \
         holding references to it and repeating side effects.",
    )
    .message("subscription to `{source}` is never disposed")
    .fix("pipe through `takeUntilDestroyed()` or unsubscribe in `ngOnDestroy`")
}

/// NG102: subscribe inside a subscribe callback.
#[must_use]
pub fn nested_subscribe() -> RuleSpec {
    RuleSpec::new(
        "nested-subscribe",
        "NG102",
        Severity::Warning,
        "Nested subscribe",
        Matcher::each(FactPattern::new(FactKind::SubscriptionCreated).eq("nested", true)),
    )
    .rationale(
        "Inner subscriptions are not cancelled when the outer stream emits again, \
         so responses race and leak.",
    )
    .message("`{source}` is subscribed inside another subscribe callback")
    .fix("flatten with `switchMap`, `concatMap` or `mergeMap` and subscribe once")
}

/// NG103: one upstream subscribed several times without sharing.
#[must_use]
pub fn shared_source_resubscription() -> RuleSpec {
    RuleSpec::new(
        "shared-source-resubscription",
        "NG103",
        Severity::Info,
        "Source subscribed repeatedly",
        Matcher::Repeated {
            of: vec![
                FactPattern::new(FactKind::SubscriptionCreated),
                FactPattern::new(FactKind::PipeUsage).eq("pipe", "async"),
            ],
            group_by: vec!["@declaration".to_string(), "source".to_string()],
            min: 2,
            unless: Some(Unless {
                pattern: FactPattern::new(FactKind::MemberDeclared).eq("shared", true),
                on: vec![Join::same("@declaration"), Join::new("source", "name")],
            }),
        },
    )
    .rationale(
        "Every subscription to a cold observable re-runs its producer, \
         so one HTTP stream subscribed three times issues three requests.",
    )
    .message("`{source}` is subscribed {count} times")
    .fix("share it with `shareReplay({ bufferSize: 1, refCount: true })` or `toSignal()`")
}

#[cfg(test)]
mod tests {
    use super::*;
    use ngcheck_core::model::{DeclId, MemberId, Span};
    use ngcheck_core::{Fact, Subject};

    fn created(offset: usize, source: &str) -> Fact {
        Fact::new(
            FactKind::SubscriptionCreated,
            Subject::declaration(DeclId(0)).with_member(Some(MemberId(0))),
            Span::new(offset, 9, 1, offset + 1),
        )
        .with("source", source)
        .with("disposed_inline", false)
        .with("nested", false)
        .with("decl_kind", "component")
    }

    #[test]
    fn stored_and_disposed_subscription_is_not_a_leak() {
        let disposed = Fact::new(
            FactKind::SubscriptionDisposed,
            Subject::declaration(DeclId(0)),
            Span::default(),
        )
        .with("field", "sub");
        let facts = vec![created(0, "a$").with("stored_in", "sub"), created(20, "b$"), disposed];
        let matches = memory_leak_subscription().matcher.evaluate(&facts).unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].span.offset, 20);
    }

    #[test]
    fn shared_members_suppress_resubscription() {
        let facts = vec![created(0, "user$"), created(10, "user$")];
        let rule = shared_source_resubscription();
        assert_eq!(rule.matcher.evaluate(&facts).unwrap().len(), 1);

        let mut shared = facts.clone();
        shared.push(
            Fact::new(FactKind::MemberDeclared, Subject::declaration(DeclId(0)), Span::default())
                .with("name", "user$")
                .with("shared", true),
        );
        assert!(rule.matcher.evaluate(&shared).unwrap().is_empty());
    }
}
