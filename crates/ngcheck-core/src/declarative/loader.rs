//! DTO → [`RuleSpec`] conversion with validation.

use crate::catalog::{RuleClass, RuleSpec};
use crate::facts::{FactKind, Value};
use crate::matcher::{Condition, FactPattern, Join, Matcher};
use crate::types::Severity;

use super::config_dto::{CustomRuleDto, DeclarativeConfigDto, PatternDto, RelationDto};

/// Errors during DTO → rule conversion.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// Unknown fact kind name.
    #[error("{context}: unknown fact kind `{value}`")]
    UnknownFactKind {
        /// Where the error occurred (e.g., "custom-rule 'x'.without").
        context: String,
        /// The invalid value.
        value: String,
    },

    /// Unknown severity string.
    #[error("{context}: unknown severity `{value}`, expected: error, warning, info")]
    UnknownSeverity {
        /// Where the error occurred.
        context: String,
        /// The invalid value.
        value: String,
    },

    /// A `where` value has a type facts never carry.
    #[error("{context}: `where.{key}` must be a string, integer, boolean or an array of those")]
    UnsupportedValue {
        /// Where the error occurred.
        context: String,
        /// The offending key.
        key: String,
    },

    /// Both `with` and `without` are set.
    #[error("{rule}: at most one of `with` or `without` may be set")]
    AmbiguousRelation {
        /// The rule that has the conflict.
        rule: String,
    },
}

/// Converts a `DeclarativeConfigDto` into rule definitions.
///
/// # Errors
///
/// Returns the first error encountered during conversion.
pub fn load(dto: DeclarativeConfigDto) -> Result<Vec<RuleSpec>, LoadError> {
    dto.custom_rules.into_iter().map(convert_rule).collect()
}

fn convert_rule(dto: CustomRuleDto) -> Result<RuleSpec, LoadError> {
    let ctx = format!("custom-rule '{}'", dto.id);
    let severity = dto
        .severity
        .parse::<Severity>()
        .map_err(|_| LoadError::UnknownSeverity {
            context: ctx.clone(),
            value: dto.severity.clone(),
        })?;

    let anchor = convert_pattern(&dto.pattern, &ctx)?;
    let matcher = match (dto.with, dto.without) {
        (Some(_), Some(_)) => return Err(LoadError::AmbiguousRelation { rule: ctx }),
        (Some(rel), None) => {
            let (related, on) = convert_relation(&rel, &format!("{ctx}.with"))?;
            Matcher::with_related(anchor, related, on)
        }
        (None, Some(rel)) => {
            let (related, on) = convert_relation(&rel, &format!("{ctx}.without"))?;
            Matcher::without_related(anchor, related, on)
        }
        (None, None) => Matcher::each(anchor),
    };

    let mut rule = RuleSpec::new(dto.id, dto.code, severity, dto.title, matcher)
        .class(RuleClass::Structural);
    if let Some(message) = dto.message {
        rule = rule.message(message);
    }
    if let Some(fix) = dto.fix {
        rule = rule.fix(fix);
    }
    if let Some(rationale) = dto.rationale {
        rule = rule.rationale(rationale);
    }
    Ok(rule)
}

fn convert_relation(dto: &RelationDto, ctx: &str) -> Result<(FactPattern, Vec<Join>), LoadError> {
    let pattern = convert_pattern(&dto.pattern, ctx)?;
    let on = dto.on.iter().map(|(a, r)| Join::new(a, r)).collect();
    Ok((pattern, on))
}

fn convert_pattern(dto: &PatternDto, ctx: &str) -> Result<FactPattern, LoadError> {
    let kind = dto
        .fact
        .parse::<FactKind>()
        .map_err(|_| LoadError::UnknownFactKind {
            context: ctx.to_string(),
            value: dto.fact.clone(),
        })?;

    let mut pattern = FactPattern::new(kind);
    for (key, value) in &dto.where_ {
        let unsupported = || LoadError::UnsupportedValue {
            context: ctx.to_string(),
            key: key.clone(),
        };
        let condition = match value {
            toml::Value::Array(items) => Condition::OneOf(
                key.clone(),
                items
                    .iter()
                    .map(convert_value)
                    .collect::<Option<Vec<_>>>()
                    .ok_or_else(unsupported)?,
            ),
            other => Condition::Eq(key.clone(), convert_value(other).ok_or_else(unsupported)?),
        };
        pattern = pattern.when(condition);
    }
    for key in &dto.present {
        pattern = pattern.when(Condition::Present(key.clone()));
    }
    for key in &dto.absent {
        pattern = pattern.when(Condition::Absent(key.clone()));
    }
    for (key, min) in &dto.at_least {
        pattern = pattern.at_least(key, *min);
    }
    Ok(pattern)
}

fn convert_value(value: &toml::Value) -> Option<Value> {
    match value {
        toml::Value::String(s) => Some(Value::Str(s.clone())),
        toml::Value::Integer(i) => Some(Value::Int(*i)),
        toml::Value::Boolean(b) => Some(Value::Bool(*b)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(toml_str: &str) -> Result<Vec<RuleSpec>, LoadError> {
        load(toml::from_str(toml_str).unwrap())
    }

    #[test]
    fn each_rule_with_conditions() {
        let rules = parse(
            r#"
[[custom-rule]]
id = "deep-state"
code = "APP002"
title = "State deeper than 2"
severity = "error"
fact = "state-container"
where = { wrapper = ["signal", "signalState"] }
at-least = { depth = 3 }
"#,
        )
        .unwrap();
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].severity, Severity::Error);
        assert_eq!(
            rules[0].matcher,
            Matcher::each(
                FactPattern::new(FactKind::StateContainer)
                    .one_of("wrapper", ["signal", "signalState"])
                    .at_least("depth", 3)
            )
        );
    }

    #[test]
    fn without_relation_builds_joins() {
        let rules = parse(
            r#"
[[custom-rule]]
id = "stored-never-disposed"
code = "APP003"
title = "Stored subscription never disposed"
fact = "subscription-stored"

[custom-rule.without]
fact = "subscription-disposed"
on = { field = "field" }
"#,
        )
        .unwrap();
        assert!(matches!(
            &rules[0].matcher,
            Matcher::WithoutRelated { on, .. } if on == &vec![Join::same("field")]
        ));
    }

    #[test]
    fn unknown_fact_kind_is_rejected() {
        let err = parse(
            r#"
[[custom-rule]]
id = "x"
code = "X1"
title = "t"
fact = "signal-teleported"
"#,
        )
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "custom-rule 'x': unknown fact kind `signal-teleported`"
        );
    }

    #[test]
    fn bad_severity_and_values_are_rejected() {
        let err = parse(
            r#"
[[custom-rule]]
id = "x"
code = "X1"
title = "t"
severity = "fatal"
fact = "teardown-hook"
"#,
        )
        .unwrap_err();
        assert!(matches!(err, LoadError::UnknownSeverity { .. }));

        let err = parse(
            r#"
[[custom-rule]]
id = "x"
code = "X1"
title = "t"
fact = "teardown-hook"
where = { hook = 1.5 }
"#,
        )
        .unwrap_err();
        assert!(matches!(err, LoadError::UnsupportedValue { .. }));
    }
}
