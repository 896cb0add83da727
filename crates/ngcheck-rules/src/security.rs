//! DOM security rules.
//!
//! Angular sanitizes values bound through `[innerHTML]`. Bypassing the
//! sanitizer with a non-literal value, or writing HTML straight into the DOM,
//! reopens the door to XSS.

use ngcheck_core::{FactKind, FactPattern, Matcher, RuleSpec, Severity};

/// NG171: unsanitized HTML reaches the DOM.
#[must_use]
pub fn unsafe_inner_html() -> RuleSpec {
    RuleSpec::new(
        "unsafe-inner-html",
        "NG171",
        Severity::Error,
        "Unsanitized HTML",
        Matcher::AnyOf(vec![
            Matcher::each(FactPattern::new(FactKind::SanitizerBypass).eq("literal_arg", false)),
            Matcher::each(FactPattern::new(FactKind::DomHtmlWrite)),
        ]),
    )
    .rationale("Dynamic HTML that skips the sanitizer can execute attacker-controlled script.")
    .message("unsanitized HTML reaches the DOM ({kind})")
    .fix("bind through `[innerHTML]` and let Angular sanitize, or sanitize with `DomSanitizer.sanitize`")
}

#[cfg(test)]
mod tests {
    use super::*;
    use ngcheck_core::model::{DeclId, Span};
    use ngcheck_core::{render, Fact, Subject};

    #[test]
    fn literal_bypass_is_allowed_and_dom_writes_are_not() {
        let facts = vec![
            Fact::new(FactKind::SanitizerBypass, Subject::declaration(DeclId(0)), Span::default())
                .with("method", "bypassSecurityTrustHtml")
                .with("literal_arg", true),
            Fact::new(FactKind::DomHtmlWrite, Subject::declaration(DeclId(0)), Span::default())
                .with("property", "innerHTML"),
        ];
        let rule = unsafe_inner_html();
        let matches = rule.matcher.evaluate(&facts).unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(
            render(&rule.message, &matches[0].bindings),
            "unsanitized HTML reaches the DOM (dom-html-write)"
        );
    }
}
