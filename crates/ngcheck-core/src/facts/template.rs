//! Template facts: calls in bindings, pipes and structural directives.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;

use super::reactive::is_signal_member;
use super::{Fact, FactKind, Subject};
use crate::model::{Binding, BindingKind, DeclKind, Declaration, Literal};

/// An identifier immediately followed by `(`.
static CALL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[A-Za-z_$][\w$]*\s*\(").unwrap_or_else(|_| panic!("Invalid Regex"))
});

const ITERATION_DIRECTIVES: &[&str] = &["ngFor", "ngForOf"];

pub(super) fn extract(decl: &Declaration, facts: &mut Vec<Fact>) {
    if decl.kind == DeclKind::Pipe {
        pipe_declared(decl, facts);
    }

    let mut structural: BTreeMap<usize, Vec<&Binding>> = BTreeMap::new();
    for binding in &decl.bindings {
        let subject = Subject::declaration(decl.id).with_binding(binding.id);
        match binding.kind {
            BindingKind::Pipe => {
                facts.push(
                    Fact::new(FactKind::PipeUsage, subject, binding.span)
                        .with("pipe", binding.name.as_str())
                        .with("source", pipe_source(&binding.expression)),
                );
                continue;
            }
            BindingKind::Event => continue,
            BindingKind::Structural | BindingKind::ControlFlow => {
                facts.push(
                    Fact::new(FactKind::StructuralDirective, subject, binding.span)
                        .with("directive", binding.name.as_str())
                        .with("control_flow", binding.kind == BindingKind::ControlFlow),
                );
                if lacks_key(binding) {
                    facts.push(
                        Fact::new(FactKind::IterationWithoutKey, subject, binding.span)
                            .with("directive", binding.name.as_str()),
                    );
                }
                if binding.kind == BindingKind::Structural {
                    structural.entry(binding.element).or_default().push(binding);
                }
            }
            BindingKind::Interpolation | BindingKind::Property => {}
        }

        for callee in template_calls(binding) {
            facts.push(
                Fact::new(FactKind::TemplateCall, subject, binding.span)
                    .with("callee", callee)
                    .with("binding_kind", binding.kind.as_str())
                    .with("signal", is_signal_member(decl, callee)),
            );
        }
    }

    for bindings in structural.values().filter(|b| b.len() > 1) {
        let names: Vec<&str> = bindings.iter().map(|b| b.name.as_str()).collect();
        let first = bindings[0];
        facts.push(
            Fact::new(
                FactKind::StackedStructuralDirectives,
                Subject::declaration(decl.id).with_binding(first.id),
                first.span,
            )
            .with("directives", names.join(", "))
            .with("count", names.len()),
        );
    }
}

fn pipe_declared(decl: &Declaration, facts: &mut Vec<Fact>) {
    let Some(pipe) = decl.decorator("Pipe") else {
        return;
    };
    let pure = !matches!(pipe.property("pure"), Some(Literal::Bool(false)));
    let name = pipe
        .property("name")
        .and_then(Literal::as_text)
        .unwrap_or(decl.name.as_str());
    facts.push(
        Fact::new(FactKind::PipeDeclared, Subject::declaration(decl.id), pipe.span)
            .with("name", name)
            .with("class", decl.name.as_str())
            .with("pure", pure),
    );
}

/// Loops must name an identity function: `trackBy:` for `*ngFor`, `track` for `@for`.
fn lacks_key(binding: &Binding) -> bool {
    match binding.kind {
        BindingKind::Structural if ITERATION_DIRECTIVES.contains(&binding.name.as_str()) => {
            !binding.expression.contains("trackBy")
        }
        BindingKind::ControlFlow if binding.name == "for" => !binding
            .expression
            .split(';')
            .skip(1)
            .any(|clause| clause.trim_start().starts_with("track")),
        _ => false,
    }
}

/// Callees invoked by a binding expression, in order.
fn template_calls(binding: &Binding) -> Vec<&str> {
    let expr = match binding.kind {
        // `let x of xs; trackBy: fn` and `x of xs; track fn(x)` name key functions
        BindingKind::Structural | BindingKind::ControlFlow => binding
            .expression
            .split(';')
            .next()
            .unwrap_or_default(),
        _ => binding.expression.as_str(),
    };
    CALL_RE
        .find_iter(expr)
        .filter(|m| {
            // dotted callees (`user.name()`) are not members of the declaration
            let before = expr[..m.start()].trim_end().chars().next_back();
            !matches!(before, Some('.' | '?' | '!'))
        })
        .map(|m| m.as_str().trim_end_matches('(').trim_end())
        .filter(|name| *name != "$any")
        .collect()
}

/// The piped operand, with a trailing `()` dropped so `items() | async` and
/// `items | async` agree.
fn pipe_source(expression: &str) -> &str {
    let trimmed = expression.trim();
    trimmed.strip_suffix("()").unwrap_or(trimmed).trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::facts::Value;
    use crate::model::{BindingId, DeclId, Span};

    fn binding(id: usize, kind: BindingKind, name: &str, expression: &str, element: usize) -> Binding {
        Binding {
            id: BindingId(id),
            kind,
            name: name.into(),
            expression: expression.into(),
            element,
            span: Span::new(id * 10, 5, 1, id + 1),
        }
    }

    fn run(bindings: Vec<Binding>) -> Vec<Fact> {
        let mut decl = Declaration::new(DeclId(0), DeclKind::Component, "List", Span::default());
        decl.bindings = bindings;
        let mut facts = Vec::new();
        extract(&decl, &mut facts);
        facts
    }

    fn of_kind(facts: &[Fact], kind: FactKind) -> Vec<&Fact> {
        facts.iter().filter(|f| f.kind == kind).collect()
    }

    #[test]
    fn loops_without_identity_are_reported() {
        let facts = run(vec![
            binding(0, BindingKind::Structural, "ngFor", "let u of users", 0),
            binding(1, BindingKind::Structural, "ngFor", "let u of users; trackBy: trackById", 1),
            binding(2, BindingKind::ControlFlow, "for", "u of users; track u.id", usize::MAX),
        ]);
        let missing = of_kind(&facts, FactKind::IterationWithoutKey);
        assert_eq!(missing.len(), 1);
        assert_eq!(missing[0].subject.binding, Some(BindingId(0)));
    }

    #[test]
    fn calls_skip_dotted_callees_and_key_functions() {
        let facts = run(vec![
            binding(0, BindingKind::Interpolation, "", "getTotal(items) + user.name()", 0),
            binding(1, BindingKind::Structural, "ngFor", "let i of filtered(); trackBy: byId", 1),
            binding(2, BindingKind::Event, "click", "save()", 2),
        ]);
        let callees: Vec<&str> = of_kind(&facts, FactKind::TemplateCall)
            .iter()
            .filter_map(|f| f.text("callee"))
            .collect();
        assert_eq!(callees, vec!["getTotal", "filtered"]);
    }

    #[test]
    fn signal_reads_are_marked() {
        use crate::model::{Initializer, Member, MemberId, MemberKind};

        let mut decl = Declaration::new(DeclId(0), DeclKind::Component, "List", Span::default());
        decl.members.push(Member {
            id: MemberId(0),
            name: "items".into(),
            kind: MemberKind::Field,
            declared_type: None,
            initializer: Some(Initializer {
                text: "signal([])".into(),
                callee: Some("signal".into()),
                span: Span::default(),
            }),
            decorators: Vec::new(),
            parameters: Vec::new(),
            span: Span::default(),
        });
        decl.bindings = vec![binding(0, BindingKind::Interpolation, "", "items().length + total()", 0)];
        let mut facts = Vec::new();
        extract(&decl, &mut facts);
        let flags: Vec<(Option<&str>, Option<Value>)> = of_kind(&facts, FactKind::TemplateCall)
            .iter()
            .map(|f| (f.text("callee"), f.get("signal")))
            .collect();
        assert_eq!(
            flags,
            vec![
                (Some("items"), Some(Value::Bool(true))),
                (Some("total"), Some(Value::Bool(false))),
            ]
        );
    }

    #[test]
    fn stacked_directives_on_one_element() {
        let facts = run(vec![
            binding(0, BindingKind::Structural, "ngFor", "let u of users; trackBy: id", 4),
            binding(1, BindingKind::Structural, "ngIf", "u.active", 4),
            binding(2, BindingKind::Structural, "ngIf", "ready", 5),
        ]);
        let stacked = of_kind(&facts, FactKind::StackedStructuralDirectives);
        assert_eq!(stacked.len(), 1);
        assert_eq!(stacked[0].text("directives"), Some("ngFor, ngIf"));
    }

    #[test]
    fn pipe_source_ignores_signal_call_parens() {
        assert_eq!(pipe_source(" user$ "), "user$");
        assert_eq!(pipe_source("items()"), "items");
    }
}
