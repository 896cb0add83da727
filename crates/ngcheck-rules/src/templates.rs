//! Template rules.
//!
//! # Rationale
//!
//! Template expressions run on every change-detection pass. Anything they
//! call is called again and again, and lists rendered without an identity
//! function are torn down and rebuilt whenever the array reference changes.
//!
//! # Detected Patterns
//!
//! - `missing-trackby` (NG131): `*ngFor` without `trackBy`, `@for` without
//!   `track`.
//! - `template-method-call` (NG132): `{{ total() }}` or `[x]="format(y)"`
//!   where the callee is a plain method rather than a signal.
//! - `impure-pipe` (NG133): `@Pipe({ pure: false })`.
//! - `stacked-structural-directives` (NG134): two `*` directives on one
//!   element.

use ngcheck_core::{FactKind, FactPattern, Matcher, RuleClass, RuleSpec, Severity};

/// NG131: iteration without an identity key.
#[must_use]
pub fn missing_trackby() -> RuleSpec {
    RuleSpec::new(
        "missing-trackby",
        "NG131",
        Severity::Warning,
        "List rendered without identity key",
        Matcher::each(FactPattern::new(FactKind::IterationWithoutKey)),
    )
    .class(RuleClass::FrameworkSpecific)
    .rationale("Without a key every new array re-creates all rows and their DOM.")
    .message("`{directive}` has no identity key")
    .fix("add `trackBy: trackById` to `*ngFor` or `track item.id` to `@for`")
}

/// NG132: method called from a binding.
#[must_use]
pub fn template_method_call() -> RuleSpec {
    RuleSpec::new(
        "template-method-call",
        "NG132",
        Severity::Info,
        "Method called from template",
        Matcher::each(FactPattern::new(FactKind::TemplateCall).eq("signal", false)),
    )
    .class(RuleClass::FrameworkSpecific)
    .rationale("Bound method calls re-run on every change-detection pass.")
    .message("`{callee}()` is re-evaluated on every change detection")
    .fix("precompute the value, use a pure pipe or expose it as a `computed` signal")
}

/// NG133: impure pipe declaration.
#[must_use]
pub fn impure_pipe() -> RuleSpec {
    RuleSpec::new(
        "impure-pipe",
        "NG133",
        Severity::Warning,
        "Impure pipe",
        Matcher::each(FactPattern::new(FactKind::PipeDeclared).eq("pure", false)),
    )
    .class(RuleClass::FrameworkSpecific)
    .rationale("Impure pipes run on every change-detection pass for every usage.")
    .message("pipe `{name}` ({class}) is declared impure")
    .fix("make the pipe pure and pass immutable inputs")
}

/// NG134: several structural directives on one element.
#[must_use]
pub fn stacked_structural_directives() -> RuleSpec {
    RuleSpec::new(
        "stacked-structural-directives",
        "NG134",
        Severity::Error,
        "Stacked structural directives",
        Matcher::each(FactPattern::new(FactKind::StackedStructuralDirectives)),
    )
    .class(RuleClass::FrameworkSpecific)
    .rationale("An element accepts only one structural directive; the template fails to compile.")
    .message("{count} structural directives on one element: {directives}")
    .fix("wrap the element in `<ng-container>` carrying the outer directive")
}

#[cfg(test)]
mod tests {
    use super::*;
    use ngcheck_core::model::{BindingId, DeclId, Span};
    use ngcheck_core::{Fact, Subject};

    fn call(callee: &str, signal: bool) -> Fact {
        Fact::new(
            FactKind::TemplateCall,
            Subject::declaration(DeclId(0)).with_binding(BindingId(0)),
            Span::default(),
        )
        .with("callee", callee)
        .with("signal", signal)
    }

    #[test]
    fn signal_reads_are_not_method_calls() {
        let facts = vec![call("items", true), call("total", false)];
        let matches = template_method_call().matcher.evaluate(&facts).unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].bindings["callee"].to_string(), "total");
    }

    #[test]
    fn template_rules_are_framework_specific() {
        for rule in [missing_trackby(), template_method_call(), impure_pipe(), stacked_structural_directives()] {
            assert_eq!(rule.class, RuleClass::FrameworkSpecific);
        }
    }
}
