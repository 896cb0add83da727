//! Rule evaluation over one unit's facts.

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::catalog::{render, Catalog, RuleSpec};
use crate::facts::Fact;
use crate::types::{Diagnostic, Location};

/// Applies every catalog rule to a fact sequence.
///
/// The engine holds the catalog behind an [`Arc`] so clones are cheap and can
/// be handed to worker threads; evaluation itself is read-only.
#[derive(Debug, Clone)]
pub struct RuleEngine {
    catalog: Arc<Catalog>,
}

impl RuleEngine {
    /// Creates an engine over a loaded catalog.
    #[must_use]
    pub fn new(catalog: Catalog) -> Self {
        Self {
            catalog: Arc::new(catalog),
        }
    }

    /// The catalog this engine evaluates.
    #[must_use]
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Evaluates all rules against the facts of one unit.
    ///
    /// A rule whose matcher fails produces a single engine-fault diagnostic
    /// for this unit; the remaining rules still run. Diagnostics are ordered
    /// by source offset, ties keeping catalog order.
    #[must_use]
    pub fn evaluate(&self, file: &Path, facts: &[Fact]) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();
        for rule in self.catalog.rules() {
            match rule.matcher.evaluate(facts) {
                Ok(matches) => {
                    for m in matches {
                        diagnostics.push(finding(rule, file, &m));
                    }
                }
                Err(e) => {
                    warn!("Rule {} failed on {}: {}", rule.id, file.display(), e);
                    diagnostics.push(Diagnostic::engine_fault(
                        &rule.id,
                        &rule.code,
                        file,
                        format!("rule evaluation failed: {e}"),
                    ));
                }
            }
        }
        diagnostics.sort_by_key(|d| d.location.offset);
        debug!(
            "{} diagnostics for {}",
            diagnostics.len(),
            file.display()
        );
        diagnostics
    }
}

fn finding(rule: &RuleSpec, file: &Path, m: &crate::matcher::Match) -> Diagnostic {
    let diagnostic = Diagnostic::new(
        &rule.id,
        &rule.code,
        rule.severity,
        Location::from_span(file, m.span),
        render(&rule.message, &m.bindings),
    );
    match &rule.fix {
        Some(fix) => diagnostic.with_fix(render(fix, &m.bindings)),
        None => diagnostic,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::facts::{FactKind, Subject};
    use crate::matcher::{FactPattern, Matcher};
    use crate::model::{DeclId, Span};
    use crate::types::{DiagnosticKind, Severity};

    fn fact(kind: FactKind, offset: usize) -> Fact {
        Fact::new(
            kind,
            Subject::declaration(DeclId(0)),
            Span::new(offset, 4, 2, offset + 1),
        )
        .with("signal", "count")
    }

    fn engine(rules: Vec<RuleSpec>) -> RuleEngine {
        RuleEngine::new(Catalog::load(rules, FactKind::ALL).unwrap())
    }

    #[test]
    fn renders_messages_and_fixes() {
        let engine = engine(vec![RuleSpec::new(
            "read-rule",
            "T1",
            Severity::Warning,
            "Signal read",
            Matcher::each(FactPattern::new(FactKind::SignalRead)),
        )
        .message("`{signal}` is read")
        .fix("cache `{signal}`")]);
        let diags = engine.evaluate(Path::new("a.ts"), &[fact(FactKind::SignalRead, 7)]);
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].message, "`count` is read");
        assert_eq!(diags[0].fix.as_deref(), Some("cache `count`"));
        assert_eq!(diags[0].location.offset, 7);
        assert_eq!(diags[0].location.line, 2);
    }

    #[test]
    fn orders_by_offset_then_catalog_order() {
        let engine = engine(vec![
            RuleSpec::new(
                "writes",
                "T1",
                Severity::Info,
                "w",
                Matcher::each(FactPattern::new(FactKind::SignalWritten)),
            ),
            RuleSpec::new(
                "reads",
                "T2",
                Severity::Info,
                "r",
                Matcher::each(FactPattern::new(FactKind::SignalRead)),
            ),
        ]);
        let facts = vec![
            fact(FactKind::SignalRead, 3),
            fact(FactKind::SignalWritten, 3),
            fact(FactKind::SignalWritten, 9),
            fact(FactKind::SignalRead, 1),
        ];
        let diags = engine.evaluate(Path::new("a.ts"), &facts);
        let got: Vec<(usize, &str)> = diags
            .iter()
            .map(|d| (d.location.offset, d.rule.as_str()))
            .collect();
        assert_eq!(got, vec![(1, "reads"), (3, "writes"), (3, "reads"), (9, "writes")]);
    }

    #[test]
    fn failing_rule_is_isolated() {
        let engine = engine(vec![
            RuleSpec::new(
                "broken",
                "T1",
                Severity::Info,
                "b",
                Matcher::each(FactPattern::new(FactKind::SignalRead).at_least("signal", 2)),
            ),
            RuleSpec::new(
                "reads",
                "T2",
                Severity::Info,
                "r",
                Matcher::each(FactPattern::new(FactKind::SignalRead)),
            ),
        ]);
        let diags = engine.evaluate(Path::new("a.ts"), &[fact(FactKind::SignalRead, 5)]);
        assert_eq!(diags.len(), 2);
        assert_eq!(diags[0].kind, DiagnosticKind::EngineFault);
        assert_eq!(diags[0].rule, "broken");
        assert_eq!(diags[1].rule, "reads");
    }
}
