//! State-management rules.
//!
//! # Rationale
//!
//! Store state is compared by reference. Reducers that mutate their input
//! produce a state that looks unchanged, so selectors and `OnPush` views
//! never update. Deep and denormalized shapes make immutable updates painful
//! enough that people start mutating.
//!
//! # Detected Patterns
//!
//! - `ngrx-state-mutation` (NG141): `state.items.push(x)` or
//!   `state.user.name = n` inside a reducer (`on(...)`, `createReducer`,
//!   `*Reducer` functions) outside `produce(...)`.
//! - `deeply-nested-state` (NG142): a state object literal nested three or
//!   more levels deep.
//! - `denormalized-state` (NG143): a field that duplicates or can be derived
//!   from another field of the same state (`selectedUser` next to `users`,
//!   `userCount` next to `users`).
//! - `deep-parameter-mutation` (NG144): a function mutating a parameter two
//!   or more properties below its root.

use ngcheck_core::{FactKind, FactPattern, Matcher, RuleSpec, Severity};

/// Nesting depth at which state is considered too deep.
const MAX_STATE_DEPTH: i64 = 3;

/// NG141: reducer mutates its state argument.
#[must_use]
pub fn ngrx_state_mutation() -> RuleSpec {
    RuleSpec::new(
        "ngrx-state-mutation",
        "NG141",
        Severity::Error,
        "Reducer mutates state",
        Matcher::each(
            FactPattern::new(FactKind::ParameterMutation)
                .eq("in_reducer", true)
                .eq("immer", false),
        ),
    )
    .rationale("Mutated state keeps its reference, so memoized selectors return stale values.")
    .message("reducer mutates `{path}` in place")
    .fix("return a new object with spread syntax, e.g. `{ ...state, items: [...state.items, item] }`")
}

/// NG142: state shape nested too deeply.
#[must_use]
pub fn deeply_nested_state() -> RuleSpec {
    RuleSpec::new(
        "deeply-nested-state",
        "NG142",
        Severity::Warning,
        "Deeply nested state",
        Matcher::each(FactPattern::new(FactKind::StateContainer).at_least("depth", MAX_STATE_DEPTH)),
    )
    .rationale("Every level of nesting adds a spread to each immutable update.")
    .message("state `{name}` is nested {depth} levels deep")
    .fix("normalize nested entities into flat collections keyed by id")
}

/// NG143: derivable or duplicated state field.
#[must_use]
pub fn denormalized_state() -> RuleSpec {
    RuleSpec::new(
        "denormalized-state",
        "NG143",
        Severity::Warning,
        "Denormalized state",
        Matcher::each(FactPattern::new(FactKind::DerivableStateField)),
    )
    .rationale("Copies of other fields drift out of sync when only one of them is updated.")
    .message("`{container}.{field}` duplicates `{derived_from}` ({reason})")
    .fix("store ids only and derive the value in a selector or `computed`")
}

/// NG144: deep mutation of a function argument.
#[must_use]
pub fn deep_parameter_mutation() -> RuleSpec {
    RuleSpec::new(
        "deep-parameter-mutation",
        "NG144",
        Severity::Warning,
        "Deep parameter mutation",
        Matcher::each(
            FactPattern::new(FactKind::ParameterMutation)
                .eq("in_reducer", false)
                .eq("immer", false)
                .at_least("hops", 2),
        ),
    )
    .rationale("Callers do not expect objects they pass in to change underneath them.")
    .message("parameter `{root}` is mutated at `{path}`")
    .fix("copy the argument before changing it or return a new value")
}

#[cfg(test)]
mod tests {
    use super::*;
    use ngcheck_core::model::{DeclId, Span};
    use ngcheck_core::{Fact, Subject};

    fn mutation(in_reducer: bool, immer: bool, hops: usize) -> Fact {
        Fact::new(
            FactKind::ParameterMutation,
            Subject::declaration(DeclId(0)),
            Span::default(),
        )
        .with("root", "state")
        .with("path", "state.items")
        .with("hops", hops)
        .with("in_reducer", in_reducer)
        .with("immer", immer)
    }

    #[test]
    fn reducer_and_plain_mutations_split_between_rules() {
        let facts = vec![mutation(true, false, 1), mutation(false, false, 2), mutation(false, false, 1)];
        assert_eq!(ngrx_state_mutation().matcher.evaluate(&facts).unwrap().len(), 1);
        assert_eq!(deep_parameter_mutation().matcher.evaluate(&facts).unwrap().len(), 1);
    }

    #[test]
    fn immer_drafts_may_be_mutated() {
        let facts = vec![mutation(true, true, 2)];
        assert!(ngrx_state_mutation().matcher.evaluate(&facts).unwrap().is_empty());
    }
}
