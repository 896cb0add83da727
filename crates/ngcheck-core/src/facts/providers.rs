//! Dependency-injection and DOM security facts.

use super::{Fact, FactKind, Subject};
use crate::model::{ArgKind, DeclKind, Declaration, Literal, WriteOp};

const PROVIDER_HOSTS: &[&str] = &["Component", "Directive", "NgModule"];
const HTML_SINKS: &[&str] = &["innerHTML", "outerHTML"];

pub(super) fn extract(decl: &Declaration, facts: &mut Vec<Fact>) {
    providers(decl, facts);

    for call in &decl.calls {
        let subject = Subject::declaration(decl.id).with_member(call.member);
        if call.method.starts_with("bypassSecurityTrust") {
            let literal_arg = call
                .arguments
                .first()
                .is_some_and(|a| a.kind == ArgKind::Literal);
            facts.push(
                Fact::new(FactKind::SanitizerBypass, subject, call.span)
                    .with("method", call.method.as_str())
                    .with("literal_arg", literal_arg),
            );
        } else if call.method == "insertAdjacentHTML"
            || (call.method == "write" && call.receiver.as_deref() == Some("document"))
        {
            facts.push(
                Fact::new(FactKind::DomHtmlWrite, subject, call.span)
                    .with("property", call.method.as_str()),
            );
        }
    }

    for write in &decl.writes {
        let Some(property) = write.target.last() else {
            continue;
        };
        if write.op == WriteOp::Assign && HTML_SINKS.contains(&property.as_str()) {
            facts.push(
                Fact::new(
                    FactKind::DomHtmlWrite,
                    Subject::declaration(decl.id).with_member(write.member),
                    write.span,
                )
                .with("property", property.as_str()),
            );
        }
    }
}

fn providers(decl: &Declaration, facts: &mut Vec<Fact>) {
    if decl.kind == DeclKind::Service {
        let root = decl
            .decorator("Injectable")
            .and_then(|d| d.property("providedIn"))
            .and_then(Literal::as_text);
        if let (Some("root"), Some(injectable)) = (root, decl.decorator("Injectable")) {
            facts.push(
                Fact::new(FactKind::RootProvidedService, Subject::declaration(decl.id), injectable.span)
                    .with("name", decl.name.as_str()),
            );
        }
    }

    for decorator in decl
        .decorators
        .iter()
        .filter(|d| PROVIDER_HOSTS.contains(&d.name.as_str()))
    {
        let Some(Literal::Array(entries)) = decorator.property("providers") else {
            continue;
        };
        for entry in entries {
            let token = match entry {
                Literal::Object(_) => entry.get("provide").and_then(Literal::as_text),
                other => other.as_text(),
            };
            if let Some(token) = token {
                facts.push(
                    Fact::new(FactKind::ProviderRegistered, Subject::declaration(decl.id), decorator.span)
                        .with("token", token)
                        .with("host", decl.name.as_str())
                        .with("host_kind", decl.kind.as_str()),
                );
            }
        }
    }
}
