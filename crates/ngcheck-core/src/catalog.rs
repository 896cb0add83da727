//! Rule definitions and the validated rule catalog.
//!
//! A rule is data: an id, a code, a severity, message/fix templates and a
//! [`Matcher`]. [`Catalog::load`] validates a set of rules once at startup;
//! after that the catalog is read-only and shared between workers.

use std::collections::{BTreeMap, HashSet};
use std::fmt;

use miette::Diagnostic;
use tracing::debug;

use crate::config::Config;
use crate::facts::{FactKind, Value};
use crate::matcher::Matcher;
use crate::types::Severity;

/// Whether a rule encodes generic structure or framework runtime behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleClass {
    /// Purely structural (missing disposal, unbounded buffer).
    Structural,
    /// Depends on framework semantics (change detection, DI scoping).
    FrameworkSpecific,
}

impl fmt::Display for RuleClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Structural => f.write_str("structural"),
            Self::FrameworkSpecific => f.write_str("framework"),
        }
    }
}

/// One anti-pattern definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleSpec {
    /// Kebab-case id (e.g., "memory-leak-subscription").
    pub id: String,
    /// Short code (e.g., "NG101").
    pub code: String,
    /// One-line title.
    pub title: String,
    /// Default severity.
    pub severity: Severity,
    /// Structural or framework-specific.
    pub class: RuleClass,
    /// Why the pattern is harmful.
    pub rationale: String,
    /// Message template; `{key}` placeholders are filled from match bindings.
    pub message: String,
    /// Optional fix hint template.
    pub fix: Option<String>,
    /// The predicate identifying instances.
    pub matcher: Matcher,
}

impl RuleSpec {
    /// Creates a rule with an empty rationale and no fix hint.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        code: impl Into<String>,
        severity: Severity,
        title: impl Into<String>,
        matcher: Matcher,
    ) -> Self {
        let title = title.into();
        Self {
            id: id.into(),
            code: code.into(),
            message: title.clone(),
            title,
            severity,
            class: RuleClass::Structural,
            rationale: String::new(),
            fix: None,
            matcher,
        }
    }

    /// Sets the rule class.
    #[must_use]
    pub fn class(mut self, class: RuleClass) -> Self {
        self.class = class;
        self
    }

    /// Sets the rationale.
    #[must_use]
    pub fn rationale(mut self, rationale: impl Into<String>) -> Self {
        self.rationale = rationale.into();
        self
    }

    /// Sets the message template.
    #[must_use]
    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Sets the fix hint template.
    #[must_use]
    pub fn fix(mut self, fix: impl Into<String>) -> Self {
        self.fix = Some(fix.into());
        self
    }
}

/// Fills `{key}` placeholders from `bindings`.
///
/// Unknown placeholders are left as written.
#[must_use]
pub fn render(template: &str, bindings: &BTreeMap<String, Value>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        match after.find('}') {
            Some(close) => {
                let key = &after[..close];
                match bindings.get(key) {
                    Some(value) => out.push_str(&value.to_string()),
                    None => {
                        out.push('{');
                        out.push_str(key);
                        out.push('}');
                    }
                }
                rest = &after[close + 1..];
            }
            None => {
                out.push_str(&rest[open..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

/// Errors that prevent the catalog from loading.
#[derive(Debug, thiserror::Error, Diagnostic)]
pub enum CatalogLoadError {
    /// Two rules share an id.
    #[error("duplicate rule id `{id}`")]
    #[diagnostic(code(ngcheck::catalog::duplicate_id), help("rule ids must be unique across built-in and custom rules"))]
    DuplicateId {
        /// The repeated id.
        id: String,
    },

    /// Two rules share a code.
    #[error("rules `{first}` and `{second}` share code `{code}`")]
    #[diagnostic(code(ngcheck::catalog::duplicate_code))]
    DuplicateCode {
        /// The repeated code.
        code: String,
        /// First rule using it.
        first: String,
        /// Second rule using it.
        second: String,
    },

    /// A rule id is not kebab-case.
    #[error("invalid rule id `{id}`: {reason}")]
    #[diagnostic(code(ngcheck::catalog::invalid_id), help("use lowercase letters, digits and `-`"))]
    InvalidId {
        /// The offending id.
        id: String,
        /// What is wrong with it.
        reason: &'static str,
    },

    /// A matcher refers to a fact kind the extractor never emits.
    #[error("rule `{rule}` matches on `{kind}` facts, which are never produced")]
    #[diagnostic(code(ngcheck::catalog::unknown_fact_kind))]
    UnproducedFactKind {
        /// The rule.
        rule: String,
        /// The fact kind.
        kind: FactKind,
    },

    /// A rule restriction names a rule that does not exist.
    #[error("unknown rule `{id}`")]
    #[diagnostic(code(ngcheck::catalog::unknown_rule), help("run `ngcheck list-rules` to see available rules"))]
    UnknownRule {
        /// The requested id or code.
        id: String,
    },

    /// A declarative custom rule failed to load.
    #[error("custom rules: {0}")]
    #[diagnostic(code(ngcheck::catalog::custom_rule))]
    Custom(#[from] crate::declarative::LoadRulesError),
}

/// Validated, read-only set of rules in declaration order.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    rules: Vec<RuleSpec>,
}

impl Catalog {
    /// Validates rules against the fact kinds the extractor produces.
    ///
    /// # Errors
    ///
    /// Fails on duplicate ids or codes, ids that are not kebab-case, and
    /// matchers referencing a fact kind outside `produced`.
    pub fn load(rules: Vec<RuleSpec>, produced: &[FactKind]) -> Result<Self, CatalogLoadError> {
        let mut ids = HashSet::new();
        let mut codes: BTreeMap<&str, &str> = BTreeMap::new();
        for rule in &rules {
            validate_id(&rule.id)?;
            if !ids.insert(rule.id.as_str()) {
                return Err(CatalogLoadError::DuplicateId {
                    id: rule.id.clone(),
                });
            }
            if let Some(first) = codes.insert(rule.code.as_str(), rule.id.as_str()) {
                return Err(CatalogLoadError::DuplicateCode {
                    code: rule.code.clone(),
                    first: first.to_string(),
                    second: rule.id.clone(),
                });
            }
            if let Some(kind) = rule
                .matcher
                .fact_kinds()
                .into_iter()
                .find(|k| !produced.contains(k))
            {
                return Err(CatalogLoadError::UnproducedFactKind {
                    rule: rule.id.clone(),
                    kind,
                });
            }
        }
        debug!("Loaded catalog with {} rules", rules.len());
        Ok(Self { rules })
    }

    /// Rules in declaration order.
    #[must_use]
    pub fn rules(&self) -> &[RuleSpec] {
        &self.rules
    }

    /// Number of rules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Returns true if the catalog has no rules.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Finds a rule by id or code.
    #[must_use]
    pub fn get(&self, id_or_code: &str) -> Option<&RuleSpec> {
        self.rules
            .iter()
            .find(|r| r.id == id_or_code || r.code.eq_ignore_ascii_case(id_or_code))
    }

    /// Keeps only the listed rules (ids or codes), preserving catalog order.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogLoadError::UnknownRule`] for a name matching no rule.
    pub fn restrict<S: AsRef<str>>(self, ids: &[S]) -> Result<Self, CatalogLoadError> {
        let mut keep = HashSet::new();
        for id in ids {
            let id = id.as_ref().trim();
            let rule = self.get(id).ok_or_else(|| CatalogLoadError::UnknownRule {
                id: id.to_string(),
            })?;
            keep.insert(rule.id.clone());
        }
        Ok(Self {
            rules: self.rules.into_iter().filter(|r| keep.contains(&r.id)).collect(),
        })
    }

    /// Applies `[rules.<id>]` settings: drops disabled rules and overrides
    /// severities.
    #[must_use]
    pub fn configure(self, config: &Config) -> Self {
        let rules = self
            .rules
            .into_iter()
            .filter(|r| {
                let enabled = config.is_rule_enabled(&r.id);
                if !enabled {
                    debug!("Skipping disabled rule: {}", r.id);
                }
                enabled
            })
            .map(|mut r| {
                if let Some(severity) = config.rule_severity(&r.id) {
                    r.severity = severity;
                }
                r
            })
            .collect();
        Self { rules }
    }
}

fn validate_id(id: &str) -> Result<(), CatalogLoadError> {
    let reason = if id.is_empty() {
        Some("id is empty")
    } else if !id
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    {
        Some("only `[a-z0-9-]` is allowed")
    } else if id.starts_with('-') || id.ends_with('-') {
        Some("id must not start or end with `-`")
    } else {
        None
    };
    match reason {
        Some(reason) => Err(CatalogLoadError::InvalidId {
            id: id.to_string(),
            reason,
        }),
        None => Ok(()),
    }
}
