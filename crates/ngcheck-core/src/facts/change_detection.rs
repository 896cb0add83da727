//! Change-detection facts.

use super::extract::is_input;
use super::{Fact, FactKind, Subject};
use crate::model::{DeclKind, Declaration, Literal, RootKind};

const RECOMPUTE_METHODS: &[&str] = &["markForCheck", "detectChanges"];

pub(super) fn extract(decl: &Declaration, facts: &mut Vec<Fact>) {
    if decl.kind != DeclKind::Component {
        return;
    }
    let Some(component) = decl.decorator("Component") else {
        return;
    };
    let strategy = match component.property("changeDetection").and_then(Literal::as_text) {
        Some(text) if text.ends_with("OnPush") => "OnPush",
        _ => "Default",
    };
    facts.push(
        Fact::new(FactKind::DetectionStrategy, Subject::declaration(decl.id), component.span)
            .with("strategy", strategy)
            .with("component", decl.name.as_str()),
    );

    for write in decl.writes.iter().filter(|w| w.root == RootKind::This) {
        if write.hops() < 2 {
            continue;
        }
        let field = write.target.get(1).map_or("", String::as_str);
        facts.push(
            Fact::new(
                FactKind::NestedFieldMutation,
                Subject::declaration(decl.id).with_member(write.member),
                write.span,
            )
            .with("field", field)
            .with("path", write.target.join("."))
            .with("input", is_input(decl, field))
            .with("strategy", strategy),
        );
    }

    for call in &decl.calls {
        if RECOMPUTE_METHODS.contains(&call.method.as_str()) && call.receiver.is_some() {
            facts.push(
                Fact::new(
                    FactKind::RecomputeRequested,
                    Subject::declaration(decl.id).with_member(call.member),
                    call.span,
                )
                .with("method", call.method.as_str()),
            );
        }
    }
}
