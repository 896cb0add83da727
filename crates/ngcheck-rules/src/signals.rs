//! Signal and effect rules.
//!
//! # Rationale
//!
//! Effects are for side effects that leave the signal graph (logging,
//! storage, imperative DOM APIs). An effect that writes a signal it also
//! reads re-triggers itself; one that writes a signal computed from other
//! signals is a `computed` in disguise that glitches for one tick.
//!
//! # Detected Patterns
//!
//! - `signal-write-in-effect` (NG121): `this.count.set(this.count() + 1)`
//!   inside `effect(...)`.
//! - `effect-derived-state` (NG122): `this.total.set(this.a() + this.b())`
//!   inside `effect(...)`.
//!
//! Reads and writes wrapped in `untracked(...)` are ignored.

use ngcheck_core::{FactKind, FactPattern, Join, Matcher, RuleSpec, Severity};

fn tracked_write_in_effect() -> FactPattern {
    FactPattern::new(FactKind::SignalWritten)
        .present("effect")
        .eq("untracked", false)
}

fn same_effect_and_signal() -> Vec<Join> {
    vec![
        Join::same("@declaration"),
        Join::same("effect"),
        Join::same("signal"),
    ]
}

/// NG121: an effect writes a signal it reads.
#[must_use]
pub fn signal_write_in_effect() -> RuleSpec {
    RuleSpec::new(
        "signal-write-in-effect",
        "NG121",
        Severity::Warning,
        "Effect writes a signal it reads",
        Matcher::with_related(
            tracked_write_in_effect(),
            FactPattern::new(FactKind::SignalRead).eq("untracked", false),
            same_effect_and_signal(),
        ),
    )
    .rationale(
        "Writing a tracked signal from the effect that reads it schedules the \
         effect again, looping until the value settles.",
    )
    .message("effect reads and writes `{signal}`")
    .fix("derive the value with `computed()` or wrap the read in `untracked()`")
}

/// NG122: an effect copies derived values into a signal.
#[must_use]
pub fn effect_derived_state() -> RuleSpec {
    RuleSpec::new(
        "effect-derived-state",
        "NG122",
        Severity::Info,
        "Derived state written from an effect",
        Matcher::without_related(
            // `update`/`mutate` derive the value from itself, not from inputs.
            tracked_write_in_effect().eq("op", "set"),
            FactPattern::new(FactKind::SignalRead).eq("untracked", false),
            same_effect_and_signal(),
        ),
    )
    .rationale(
        "State synchronized by an effect lags one change-detection pass behind \
         its inputs and can be overwritten by other writers.",
    )
    .message("`{signal}` is kept in sync by an effect")
    .fix("replace the signal with `computed(() => ...)`")
}

#[cfg(test)]
mod tests {
    use super::*;
    use ngcheck_core::model::{DeclId, Span};
    use ngcheck_core::{Fact, Subject};

    fn fact(kind: FactKind, signal: &str, offset: usize) -> Fact {
        Fact::new(
            kind,
            Subject::declaration(DeclId(0)),
            Span::new(offset, 4, 1, offset + 1),
        )
        .with("signal", signal)
        .with("op", "set")
        .with("effect", 3usize)
        .with("untracked", false)
    }

    #[test]
    fn self_feeding_and_derived_writes_are_told_apart() {
        let facts = vec![
            fact(FactKind::SignalRead, "count", 0),
            fact(FactKind::SignalWritten, "count", 10),
            fact(FactKind::SignalRead, "price", 20),
            fact(FactKind::SignalWritten, "total", 30),
        ];
        let feeding = signal_write_in_effect().matcher.evaluate(&facts).unwrap();
        let derived = effect_derived_state().matcher.evaluate(&facts).unwrap();
        assert_eq!(feeding.len(), 1);
        assert_eq!(feeding[0].span.offset, 10);
        assert_eq!(derived.len(), 1);
        assert_eq!(derived[0].span.offset, 30);
    }

    #[test]
    fn self_update_is_not_derived_state() {
        let facts = vec![
            fact(FactKind::SignalRead, "price", 0),
            fact(FactKind::SignalWritten, "count", 10).with("op", "update"),
        ];
        assert!(effect_derived_state().matcher.evaluate(&facts).unwrap().is_empty());
        assert!(signal_write_in_effect().matcher.evaluate(&facts).unwrap().is_empty());
    }

    #[test]
    fn writes_outside_effects_are_ignored() {
        let mut write = fact(FactKind::SignalWritten, "count", 0);
        write.payload.remove("effect");
        assert!(effect_derived_state().matcher.evaluate(&[write]).unwrap().is_empty());
    }
}
