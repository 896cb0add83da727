//! Predicate combinators over a unit's fact set.
//!
//! A [`Matcher`] is plain data: rules describe *which* facts constitute an
//! anti-pattern instance, and [`Matcher::evaluate`] runs that description as a
//! pure query. Evaluation never mutates the facts it is given.
//!
//! ```text
//! Each(p)                    every fact matching p
//! WithRelated{a, r, on}      facts matching a that have a partner matching r
//! WithoutRelated{a, r, on}   facts matching a that have no such partner
//! Repeated{of, group_by, ..} groups of >= min facts sharing the group key
//! AnyOf([m..])               union of the sub-matchers, in order
//! ```

use std::collections::BTreeMap;

use crate::facts::{Fact, FactKind, Subject, Value};
use crate::model::Span;

/// Errors raised while evaluating a matcher.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MatchError {
    /// An ordering condition was applied to a non-integer value.
    #[error("condition `{key} >= {min}` on `{kind}` facts: value `{value}` is not an integer")]
    NotAnInteger {
        /// Fact kind being tested.
        kind: FactKind,
        /// Payload key.
        key: String,
        /// Required minimum.
        min: i64,
        /// The offending value.
        value: Value,
    },

    /// A `Repeated` matcher was configured with `min == 0`.
    #[error("repeated matcher over {kinds} needs a minimum of at least 1")]
    ZeroMinimum {
        /// Kinds the matcher groups.
        kinds: String,
    },
}

/// A predicate over one payload entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    /// Value equals.
    Eq(String, Value),
    /// Value is absent or differs.
    NotEq(String, Value),
    /// Value is one of the listed values.
    OneOf(String, Vec<Value>),
    /// Key is present.
    Present(String),
    /// Key is absent.
    Absent(String),
    /// Integer value is at least the given minimum.
    AtLeast(String, i64),
}

impl Condition {
    fn test(&self, fact: &Fact) -> Result<bool, MatchError> {
        Ok(match self {
            Self::Eq(key, v) => fact.get(key).as_ref() == Some(v),
            Self::NotEq(key, v) => fact.get(key).as_ref() != Some(v),
            Self::OneOf(key, vs) => fact.get(key).is_some_and(|x| vs.contains(&x)),
            Self::Present(key) => fact.get(key).is_some(),
            Self::Absent(key) => fact.get(key).is_none(),
            Self::AtLeast(key, min) => match fact.get(key) {
                None => false,
                Some(Value::Int(i)) => i >= *min,
                Some(value) => {
                    return Err(MatchError::NotAnInteger {
                        kind: fact.kind,
                        key: key.clone(),
                        min: *min,
                        value,
                    })
                }
            },
        })
    }
}

/// A fact kind plus conditions on its payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FactPattern {
    /// Required fact kind.
    pub kind: FactKind,
    /// All conditions must hold.
    pub conditions: Vec<Condition>,
}

impl FactPattern {
    /// Pattern matching every fact of a kind.
    #[must_use]
    pub fn new(kind: FactKind) -> Self {
        Self {
            kind,
            conditions: Vec::new(),
        }
    }

    /// Adds a condition.
    #[must_use]
    pub fn when(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    /// Requires `key == value`.
    #[must_use]
    pub fn eq(self, key: &str, value: impl Into<Value>) -> Self {
        self.when(Condition::Eq(key.to_string(), value.into()))
    }

    /// Requires `key` to be one of `values`.
    #[must_use]
    pub fn one_of<V: Into<Value>>(self, key: &str, values: impl IntoIterator<Item = V>) -> Self {
        self.when(Condition::OneOf(
            key.to_string(),
            values.into_iter().map(Into::into).collect(),
        ))
    }

    /// Requires `key` to be present.
    #[must_use]
    pub fn present(self, key: &str) -> Self {
        self.when(Condition::Present(key.to_string()))
    }

    /// Requires `key >= min`.
    #[must_use]
    pub fn at_least(self, key: &str, min: i64) -> Self {
        self.when(Condition::AtLeast(key.to_string(), min))
    }

    /// Tests a fact against this pattern.
    ///
    /// # Errors
    ///
    /// Returns an error if a condition cannot be evaluated on the fact's payload.
    pub fn matches(&self, fact: &Fact) -> Result<bool, MatchError> {
        if fact.kind != self.kind {
            return Ok(false);
        }
        for condition in &self.conditions {
            if !condition.test(fact)? {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

/// Equality between a key of the anchor fact and a key of a related fact.
///
/// A join whose anchor key is absent never holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Join {
    /// Key on the anchor fact.
    pub anchor: String,
    /// Key on the related fact.
    pub related: String,
}

impl Join {
    /// Creates a join.
    #[must_use]
    pub fn new(anchor: &str, related: &str) -> Self {
        Self {
            anchor: anchor.to_string(),
            related: related.to_string(),
        }
    }

    /// Joins a key with the same key on the related fact.
    #[must_use]
    pub fn same(key: &str) -> Self {
        Self::new(key, key)
    }

    fn holds(&self, anchor: &Fact, related: &Fact) -> bool {
        match (anchor.get(&self.anchor), related.get(&self.related)) {
            (Some(a), Some(r)) => a == r,
            _ => false,
        }
    }
}

/// Suppression clause of a [`Matcher::Repeated`]: a group is dropped when a
/// fact matching `pattern` agrees with the group's first fact on every join.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unless {
    /// Suppressing fact pattern.
    pub pattern: FactPattern,
    /// Joins from the group's first fact to the suppressing fact.
    pub on: Vec<Join>,
}

/// A data-only predicate over a fact set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Matcher {
    /// Every fact matching the pattern.
    Each(FactPattern),
    /// Anchors that have at least one related fact satisfying all joins.
    WithRelated {
        /// Anchor pattern; matches are reported at the anchor.
        anchor: FactPattern,
        /// Related pattern.
        related: FactPattern,
        /// Joins between anchor and related.
        on: Vec<Join>,
    },
    /// Anchors that have no related fact satisfying all joins.
    WithoutRelated {
        /// Anchor pattern; matches are reported at the anchor.
        anchor: FactPattern,
        /// Related pattern.
        related: FactPattern,
        /// Joins between anchor and related.
        on: Vec<Join>,
    },
    /// Groups of facts that share the same values for `group_by`.
    Repeated {
        /// Patterns whose facts are grouped together.
        of: Vec<FactPattern>,
        /// Keys forming the group identity; facts missing a key are skipped.
        group_by: Vec<String>,
        /// Minimum group size to report.
        min: usize,
        /// Optional suppression.
        unless: Option<Unless>,
    },
    /// Union of sub-matchers.
    AnyOf(Vec<Matcher>),
}

/// One matcher hit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Match {
    /// Where to report.
    pub span: Span,
    /// Subject of the reported fact.
    pub subject: Subject,
    /// Values available to message templates.
    pub bindings: BTreeMap<String, Value>,
}

impl Match {
    fn at(fact: &Fact) -> Self {
        let mut bindings = fact.payload.clone();
        bindings.insert("kind".to_string(), fact.kind.as_str().into());
        Self {
            span: fact.span,
            subject: fact.subject,
            bindings,
        }
    }

    fn with_related(mut self, related: &Fact) -> Self {
        for (key, value) in &related.payload {
            self.bindings
                .insert(format!("related.{key}"), value.clone());
        }
        self
    }
}

impl Matcher {
    /// Shorthand for [`Matcher::Each`].
    #[must_use]
    pub fn each(pattern: FactPattern) -> Self {
        Self::Each(pattern)
    }

    /// Shorthand for [`Matcher::WithRelated`].
    #[must_use]
    pub fn with_related(anchor: FactPattern, related: FactPattern, on: Vec<Join>) -> Self {
        Self::WithRelated {
            anchor,
            related,
            on,
        }
    }

    /// Shorthand for [`Matcher::WithoutRelated`].
    #[must_use]
    pub fn without_related(anchor: FactPattern, related: FactPattern, on: Vec<Join>) -> Self {
        Self::WithoutRelated {
            anchor,
            related,
            on,
        }
    }

    /// Fact kinds this matcher refers to, deduplicated in first-use order.
    #[must_use]
    pub fn fact_kinds(&self) -> Vec<FactKind> {
        let mut kinds = Vec::new();
        self.collect_kinds(&mut kinds);
        kinds
    }

    fn collect_kinds(&self, kinds: &mut Vec<FactKind>) {
        fn push(kinds: &mut Vec<FactKind>, kind: FactKind) {
            if !kinds.contains(&kind) {
                kinds.push(kind);
            }
        }
        match self {
            Self::Each(p) => push(kinds, p.kind),
            Self::WithRelated {
                anchor, related, ..
            }
            | Self::WithoutRelated {
                anchor, related, ..
            } => {
                push(kinds, anchor.kind);
                push(kinds, related.kind);
            }
            Self::Repeated { of, unless, .. } => {
                for p in of {
                    push(kinds, p.kind);
                }
                if let Some(u) = unless {
                    push(kinds, u.pattern.kind);
                }
            }
            Self::AnyOf(ms) => {
                for m in ms {
                    m.collect_kinds(kinds);
                }
            }
        }
    }

    /// Runs the matcher over a unit's facts.
    ///
    /// Matches are returned in fact discovery order (for `AnyOf`, sub-matcher
    /// order first).
    ///
    /// # Errors
    ///
    /// Returns an error if a condition cannot be evaluated, or if the matcher
    /// is misconfigured.
    pub fn evaluate(&self, facts: &[Fact]) -> Result<Vec<Match>, MatchError> {
        match self {
            Self::Each(pattern) => Ok(select(pattern, facts)?.into_iter().map(Match::at).collect()),
            Self::WithRelated {
                anchor,
                related,
                on,
            } => {
                let related = select(related, facts)?;
                Ok(select(anchor, facts)?
                    .into_iter()
                    .filter_map(|a| {
                        related
                            .iter()
                            .find(|r| on.iter().all(|j| j.holds(a, r)))
                            .map(|r| Match::at(a).with_related(r))
                    })
                    .collect())
            }
            Self::WithoutRelated {
                anchor,
                related,
                on,
            } => {
                let related = select(related, facts)?;
                Ok(select(anchor, facts)?
                    .into_iter()
                    .filter(|a| !related.iter().any(|r| on.iter().all(|j| j.holds(a, r))))
                    .map(Match::at)
                    .collect())
            }
            Self::Repeated {
                of,
                group_by,
                min,
                unless,
            } => repeated(of, group_by, *min, unless.as_ref(), facts),
            Self::AnyOf(matchers) => {
                let mut out = Vec::new();
                for m in matchers {
                    out.extend(m.evaluate(facts)?);
                }
                Ok(out)
            }
        }
    }
}

fn select<'a>(pattern: &FactPattern, facts: &'a [Fact]) -> Result<Vec<&'a Fact>, MatchError> {
    let mut out = Vec::new();
    for fact in facts {
        if pattern.matches(fact)? {
            out.push(fact);
        }
    }
    Ok(out)
}

fn repeated(
    of: &[FactPattern],
    group_by: &[String],
    min: usize,
    unless: Option<&Unless>,
    facts: &[Fact],
) -> Result<Vec<Match>, MatchError> {
    if min == 0 {
        let kinds: Vec<&str> = of.iter().map(|p| p.kind.as_str()).collect();
        return Err(MatchError::ZeroMinimum {
            kinds: kinds.join(", "),
        });
    }

    // Groups keep first-seen order so output follows discovery order.
    let mut order: Vec<Vec<Value>> = Vec::new();
    let mut groups: BTreeMap<Vec<Value>, Vec<&Fact>> = BTreeMap::new();
    for fact in facts {
        let mut hit = false;
        for pattern in of {
            if pattern.matches(fact)? {
                hit = true;
                break;
            }
        }
        if !hit {
            continue;
        }
        let Some(key) = group_by.iter().map(|k| fact.get(k)).collect::<Option<Vec<_>>>() else {
            continue;
        };
        let members = groups.entry(key.clone()).or_default();
        if members.is_empty() {
            order.push(key);
        }
        members.push(fact);
    }

    let suppressors = match unless {
        Some(u) => select(&u.pattern, facts)?,
        None => Vec::new(),
    };

    let mut out = Vec::new();
    for key in order {
        let Some(members) = groups.get(&key) else {
            continue;
        };
        if members.len() < min {
            continue;
        }
        let first = members[0];
        if let Some(u) = unless {
            if suppressors
                .iter()
                .any(|s| u.on.iter().all(|j| j.holds(first, s)))
            {
                continue;
            }
        }
        let mut m = Match::at(first);
        m.bindings.insert("count".to_string(), members.len().into());
        out.push(m);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::DeclId;

    fn fact(kind: FactKind, offset: usize, payload: &[(&str, Value)]) -> Fact {
        let mut f = Fact::new(
            kind,
            Subject::declaration(DeclId(0)),
            Span::new(offset, 1, 1, offset + 1),
        );
        for (k, v) in payload {
            f = f.with(k, v.clone());
        }
        f
    }

    fn s(v: &str) -> Value {
        Value::Str(v.to_string())
    }

    fn offsets(matches: &[Match]) -> Vec<usize> {
        matches.iter().map(|m| m.span.offset).collect()
    }

    #[test]
    fn with_related_requires_all_joins() {
        let facts = vec![
            fact(FactKind::SignalRead, 1, &[("signal", s("count")), ("effect", Value::Int(0))]),
            fact(FactKind::SignalWritten, 2, &[("signal", s("count")), ("effect", Value::Int(0))]),
            fact(FactKind::SignalWritten, 3, &[("signal", s("other")), ("effect", Value::Int(0))]),
            fact(FactKind::SignalWritten, 4, &[("signal", s("count"))]),
        ];
        let matcher = Matcher::with_related(
            FactPattern::new(FactKind::SignalWritten).present("effect"),
            FactPattern::new(FactKind::SignalRead),
            vec![Join::same("effect"), Join::same("signal")],
        );
        let matches = matcher.evaluate(&facts).unwrap();
        assert_eq!(offsets(&matches), vec![2]);
        assert_eq!(matches[0].bindings.get("related.signal"), Some(&s("count")));
    }

    #[test]
    fn without_related_reports_unpaired_anchors() {
        let facts = vec![
            fact(FactKind::SubscriptionCreated, 5, &[("stored_in", s("sub"))]),
            fact(FactKind::SubscriptionCreated, 9, &[]),
            fact(FactKind::SubscriptionDisposed, 20, &[("field", s("sub"))]),
        ];
        let matcher = Matcher::without_related(
            FactPattern::new(FactKind::SubscriptionCreated),
            FactPattern::new(FactKind::SubscriptionDisposed),
            vec![Join::new("stored_in", "field")],
        );
        assert_eq!(offsets(&matcher.evaluate(&facts).unwrap()), vec![9]);
    }

    #[test]
    fn repeated_groups_and_unless_suppresses() {
        let facts = vec![
            fact(FactKind::SubscriptionCreated, 1, &[("source", s("user$"))]),
            fact(FactKind::PipeUsage, 2, &[("source", s("user$"))]),
            fact(FactKind::SubscriptionCreated, 3, &[("source", s("orders$"))]),
            fact(FactKind::PipeUsage, 4, &[("source", s("orders$"))]),
            fact(FactKind::MemberDeclared, 0, &[("name", s("orders$")), ("shared", Value::Bool(true))]),
        ];
        let matcher = Matcher::Repeated {
            of: vec![
                FactPattern::new(FactKind::SubscriptionCreated),
                FactPattern::new(FactKind::PipeUsage),
            ],
            group_by: vec!["@declaration".into(), "source".into()],
            min: 2,
            unless: Some(Unless {
                pattern: FactPattern::new(FactKind::MemberDeclared).eq("shared", true),
                on: vec![Join::same("@declaration"), Join::new("source", "name")],
            }),
        };
        let matches = matcher.evaluate(&facts).unwrap();
        assert_eq!(offsets(&matches), vec![1]);
        assert_eq!(matches[0].bindings.get("count"), Some(&Value::Int(2)));
    }

    #[test]
    fn at_least_on_text_is_an_error() {
        let facts = vec![fact(FactKind::StateContainer, 1, &[("depth", s("deep"))])];
        let matcher = Matcher::each(FactPattern::new(FactKind::StateContainer).at_least("depth", 4));
        assert!(matches!(
            matcher.evaluate(&facts),
            Err(MatchError::NotAnInteger { .. })
        ));
    }

    #[test]
    fn any_of_keeps_sub_matcher_order_and_lists_kinds() {
        let facts = vec![
            fact(FactKind::DomHtmlWrite, 1, &[]),
            fact(FactKind::SanitizerBypass, 2, &[("literal_arg", Value::Bool(false))]),
        ];
        let matcher = Matcher::AnyOf(vec![
            Matcher::each(FactPattern::new(FactKind::SanitizerBypass).eq("literal_arg", false)),
            Matcher::each(FactPattern::new(FactKind::DomHtmlWrite)),
        ]);
        assert_eq!(offsets(&matcher.evaluate(&facts).unwrap()), vec![2, 1]);
        assert_eq!(
            matcher.fact_kinds(),
            vec![FactKind::SanitizerBypass, FactKind::DomHtmlWrite]
        );
    }
}
