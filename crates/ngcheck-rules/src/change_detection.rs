//! Change-detection rules.
//!
//! `OnPush` components re-render only when an input reference changes, an
//! event fires inside them, or they ask for it. Mutating nested fields in
//! place defeats that, and mutating `@Input` objects changes state the parent
//! owns.

use ngcheck_core::{FactKind, FactPattern, Join, Matcher, RuleClass, RuleSpec, Severity};

/// NG151: component uses the default strategy.
#[must_use]
pub fn missing_onpush() -> RuleSpec {
    RuleSpec::new(
        "missing-onpush",
        "NG151",
        Severity::Info,
        "Component without OnPush",
        Matcher::each(FactPattern::new(FactKind::DetectionStrategy).eq("strategy", "Default")),
    )
    .class(RuleClass::FrameworkSpecific)
    .rationale("Default change detection checks the whole subtree on every browser event.")
    .message("`{component}` uses the default change-detection strategy")
    .fix("set `changeDetection: ChangeDetectionStrategy.OnPush`")
}

/// NG152: in-place mutation in an `OnPush` component that never asks for a re-render.
#[must_use]
pub fn onpush_misuse() -> RuleSpec {
    RuleSpec::new(
        "onpush-misuse",
        "NG152",
        Severity::Warning,
        "In-place mutation under OnPush",
        Matcher::without_related(
            FactPattern::new(FactKind::NestedFieldMutation)
                .eq("strategy", "OnPush")
                .eq("input", false),
            FactPattern::new(FactKind::RecomputeRequested),
            vec![Join::same("@declaration")],
        ),
    )
    .class(RuleClass::FrameworkSpecific)
    .rationale("OnPush compares references; mutating nested fields in place leaves the view stale.")
    .message("`{path}` is mutated in place in an OnPush component")
    .fix("assign a new object or array, or call `markForCheck()`")
}

/// NG153: component mutates an input it received.
#[must_use]
pub fn input_mutation() -> RuleSpec {
    RuleSpec::new(
        "input-mutation",
        "NG153",
        Severity::Warning,
        "Input mutated in place",
        Matcher::each(FactPattern::new(FactKind::NestedFieldMutation).eq("input", true)),
    )
    .class(RuleClass::FrameworkSpecific)
    .rationale("Inputs belong to the parent; changing them in place bypasses its state flow.")
    .message("input `{field}` is mutated at `{path}`")
    .fix("emit an output with the change and let the parent update its state")
}
