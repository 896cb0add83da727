//! Dependency-injection rules.

use ngcheck_core::{FactKind, FactPattern, Join, Matcher, RuleClass, RuleSpec, Severity};

/// NG161: a root-provided service re-provided on a component or module.
///
/// `@Injectable({ providedIn: 'root' })` already yields one application-wide
/// instance. Listing the same class in `providers: [...]` creates a second,
/// component-scoped instance whose state silently diverges from the root one.
/// Only services declared in the same file are visible to this rule.
#[must_use]
pub fn provider_pollution() -> RuleSpec {
    RuleSpec::new(
        "provider-pollution",
        "NG161",
        Severity::Warning,
        "Root service provided again",
        Matcher::with_related(
            FactPattern::new(FactKind::ProviderRegistered),
            FactPattern::new(FactKind::RootProvidedService),
            vec![Join::new("token", "name")],
        ),
    )
    .class(RuleClass::FrameworkSpecific)
    .rationale("Re-providing a root singleton creates a second instance with separate state.")
    .message("`{token}` is provided in root and again by `{host}`")
    .fix("remove `{token}` from the `providers` array of `{host}`")
}

#[cfg(test)]
mod tests {
    use super::*;
    use ngcheck_core::model::{DeclId, Span};
    use ngcheck_core::{Fact, Subject};

    #[test]
    fn matches_across_declarations_of_one_file() {
        let facts = vec![
            Fact::new(FactKind::RootProvidedService, Subject::declaration(DeclId(0)), Span::default())
                .with("name", "CartService"),
            Fact::new(FactKind::ProviderRegistered, Subject::declaration(DeclId(1)), Span::default())
                .with("token", "CartService")
                .with("host", "CartComponent"),
            Fact::new(FactKind::ProviderRegistered, Subject::declaration(DeclId(1)), Span::default())
                .with("token", "LocalStore")
                .with("host", "CartComponent"),
        ];
        let matches = provider_pollution().matcher.evaluate(&facts).unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].bindings["token"].to_string(), "CartService");
    }
}
