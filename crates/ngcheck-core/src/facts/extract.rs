//! Fact extraction entry point.

use std::path::PathBuf;

use tracing::debug;

use super::{change_detection, providers, reactive, state, streams, subscriptions, template};
use super::{Fact, FactKind, Subject};
use crate::model::{Declaration, MemberKind, SourceUnit};

/// Errors raised while extracting facts from a unit.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExtractError {
    /// The unit's model carries syntax errors.
    #[error("{}:{line}:{column}: malformed source: {message}", path.display())]
    MalformedSource {
        /// File that failed to parse.
        path: PathBuf,
        /// Line of the first syntax error (1-indexed).
        line: usize,
        /// Column of the first syntax error (1-indexed).
        column: usize,
        /// Byte offset of the first syntax error.
        offset: usize,
        /// Parser description of the first syntax error.
        message: String,
    },
}

/// Walks a [`SourceUnit`]'s model and emits its fact sequence.
///
/// Extraction is a pure function of the unit: the same unit always yields the
/// same facts in the same order (declaration order, then fact category, then
/// source order within a category).
#[derive(Debug, Clone, Copy, Default)]
pub struct FactExtractor;

impl FactExtractor {
    /// Creates an extractor.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Fact kinds this extractor can emit.
    #[must_use]
    pub fn produced_kinds() -> &'static [FactKind] {
        FactKind::ALL
    }

    /// Extracts the facts of one unit.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractError::MalformedSource`] if the unit's model has syntax
    /// errors. No facts are produced for such a unit.
    pub fn extract(&self, unit: &SourceUnit) -> Result<Vec<Fact>, ExtractError> {
        if let Some(err) = unit.model.syntax_errors.first() {
            return Err(ExtractError::MalformedSource {
                path: unit.relative_path.clone(),
                line: err.span.line,
                column: err.span.column,
                offset: err.span.offset,
                message: err.message.clone(),
            });
        }

        let mut facts = Vec::new();
        for decl in &unit.model.declarations {
            members(decl, &mut facts);
            reactive::extract(decl, &mut facts);
            subscriptions::extract(decl, &mut facts);
            streams::extract(decl, &mut facts);
            template::extract(decl, &mut facts);
            state::extract(decl, &mut facts);
            change_detection::extract(decl, &mut facts);
            providers::extract(decl, &mut facts);
        }

        debug!(
            "Extracted {} facts from {}",
            facts.len(),
            unit.relative_path.display()
        );
        Ok(facts)
    }
}

/// Returns true for members bound as component inputs.
pub(super) fn is_input(decl: &Declaration, name: &str) -> bool {
    decl.member(name).is_some_and(|m| {
        m.decorator("Input").is_some()
            || m.initializer_callee()
                .is_some_and(|c| c == "input" || c.starts_with("input.") || c.starts_with("model"))
    })
}

fn members(decl: &Declaration, facts: &mut Vec<Fact>) {
    for member in &decl.members {
        let shared = member.initializer.as_ref().is_some_and(|init| {
            ["shareReplay(", "share(", "toSignal("]
                .iter()
                .any(|op| init.text.contains(op))
        });
        facts.push(
            Fact::new(
                FactKind::MemberDeclared,
                Subject::declaration(decl.id).with_member(Some(member.id)),
                member.span,
            )
            .with("name", member.name.as_str())
            .with("member_kind", member.kind.as_str())
            .with("input", is_input(decl, &member.name))
            .with("shared", shared)
            .with("decl_kind", decl.kind.as_str()),
        );
        if member.kind == MemberKind::Method && member.name == "ngOnDestroy" {
            facts.push(
                Fact::new(
                    FactKind::TeardownHook,
                    Subject::declaration(decl.id).with_member(Some(member.id)),
                    member.span,
                )
                .with("hook", "ngOnDestroy"),
            );
        }
    }
}
