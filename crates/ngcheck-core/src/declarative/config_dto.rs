//! TOML deserialization types (DTO layer).
//!
//! These types exist solely for serde deserialization.
//! They are converted to [`crate::RuleSpec`]s via the loader.

use serde::Deserialize;
use std::collections::BTreeMap;

/// Raw TOML representation of declarative rules.
///
/// Extends the base `Config` with `[[custom-rule]]` sections.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeclarativeConfigDto {
    /// Custom rule definitions.
    #[serde(rename = "custom-rule", default)]
    pub custom_rules: Vec<CustomRuleDto>,
}

/// TOML representation of one custom rule.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CustomRuleDto {
    /// Rule id (e.g., "no-detect-changes").
    pub id: String,
    /// Rule code (e.g., "APP001").
    pub code: String,
    /// One-line title.
    pub title: String,
    /// Severity (default: "warning").
    #[serde(default = "default_severity_str")]
    pub severity: String,
    /// Message template (default: the title).
    #[serde(default)]
    pub message: Option<String>,
    /// Fix hint template.
    #[serde(default)]
    pub fix: Option<String>,
    /// Rationale shown by `list-rules`.
    #[serde(default)]
    pub rationale: Option<String>,
    /// Anchor pattern.
    #[serde(flatten)]
    pub pattern: PatternDto,
    /// Report anchors that have a related fact.
    #[serde(default)]
    pub with: Option<RelationDto>,
    /// Report anchors that have no related fact.
    #[serde(default)]
    pub without: Option<RelationDto>,
}

/// A fact kind plus payload conditions.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PatternDto {
    /// Fact kind name (e.g., "recompute-requested").
    pub fact: String,
    /// Equality conditions; an array value means "one of".
    #[serde(default, rename = "where")]
    pub where_: BTreeMap<String, toml::Value>,
    /// Keys that must be present.
    #[serde(default)]
    pub present: Vec<String>,
    /// Keys that must be absent.
    #[serde(default)]
    pub absent: Vec<String>,
    /// Integer minimums.
    #[serde(default)]
    pub at_least: BTreeMap<String, i64>,
}

/// Related-fact clause of a custom rule.
#[derive(Debug, Clone, Deserialize)]
pub struct RelationDto {
    /// Related pattern.
    #[serde(flatten)]
    pub pattern: PatternDto,
    /// Joins: anchor key = related key.
    #[serde(default)]
    pub on: BTreeMap<String, String>,
}

fn default_severity_str() -> String {
    "warning".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserialize_empty() {
        let dto: DeclarativeConfigDto = toml::from_str("").unwrap();
        assert!(dto.custom_rules.is_empty());
    }

    #[test]
    fn deserialize_full_rule() {
        let toml_str = r#"
preset = "recommended"

[[custom-rule]]
id = "onpush-detect-changes"
code = "APP001"
title = "Synchronous change detection"
severity = "info"
fact = "recompute-requested"
where = { method = "detectChanges" }
present = ["@member"]
message = "`{method}` forces a synchronous check"

[custom-rule.without]
fact = "teardown-hook"
on = { "@declaration" = "@declaration" }
"#;
        let dto: DeclarativeConfigDto = toml::from_str(toml_str).unwrap();
        assert_eq!(dto.custom_rules.len(), 1);
        let rule = &dto.custom_rules[0];
        assert_eq!(rule.pattern.fact, "recompute-requested");
        assert_eq!(
            rule.pattern.where_.get("method").and_then(toml::Value::as_str),
            Some("detectChanges")
        );
        assert_eq!(rule.severity, "info");
        let without = rule.without.as_ref().unwrap();
        assert_eq!(without.pattern.fact, "teardown-hook");
        assert_eq!(without.on.get("@declaration").map(String::as_str), Some("@declaration"));
    }

    #[test]
    fn severity_defaults_to_warning() {
        let toml_str = r#"
[[custom-rule]]
id = "x"
code = "X1"
title = "t"
fact = "teardown-hook"
"#;
        let dto: DeclarativeConfigDto = toml::from_str(toml_str).unwrap();
        assert_eq!(dto.custom_rules[0].severity, "warning");
    }
}
