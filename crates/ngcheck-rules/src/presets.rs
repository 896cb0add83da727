//! Rule presets for common configurations.

use std::fmt;
use std::str::FromStr;

use ngcheck_core::{RuleSpec, Severity};

use crate::{
    change_detection, providers, security, signals, state, streams, subscriptions, templates,
};

/// Preset configurations for ngcheck.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Preset {
    /// Every rule at its default severity.
    #[default]
    Recommended,
    /// Every rule, with informational findings raised to warnings and
    /// warnings raised to errors.
    Strict,
    /// Only rules for outright bugs, for gradual adoption.
    Minimal,
}

impl Preset {
    /// Returns the rules for this preset.
    #[must_use]
    pub fn rules(self) -> Vec<RuleSpec> {
        match self {
            Self::Recommended => recommended_rules(),
            Self::Strict => strict_rules(),
            Self::Minimal => minimal_rules(),
        }
    }

    /// Name used in configuration files.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Recommended => "recommended",
            Self::Strict => "strict",
            Self::Minimal => "minimal",
        }
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for an unrecognized preset name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown preset `{0}` (expected recommended, strict or minimal)")]
pub struct UnknownPreset(pub String);

impl FromStr for Preset {
    type Err = UnknownPreset;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "recommended" => Ok(Self::Recommended),
            "strict" => Ok(Self::Strict),
            "minimal" => Ok(Self::Minimal),
            _ => Err(UnknownPreset(s.to_string())),
        }
    }
}

/// Returns the recommended set of rules: every built-in rule.
#[must_use]
pub fn recommended_rules() -> Vec<RuleSpec> {
    all_rules()
}

/// Returns the strict set of rules.
///
/// Same rules as [`recommended_rules`], one severity step higher.
#[must_use]
pub fn strict_rules() -> Vec<RuleSpec> {
    all_rules()
        .into_iter()
        .map(|mut rule| {
            rule.severity = match rule.severity {
                Severity::Info => Severity::Warning,
                Severity::Warning | Severity::Error => Severity::Error,
            };
            rule
        })
        .collect()
}

/// Returns the minimal set of rules.
///
/// For gradual adoption, only includes:
/// - `memory-leak-subscription` (NG101)
/// - `switchmap-data-loss` (NG111)
/// - `signal-write-in-effect` (NG121)
/// - `stacked-structural-directives` (NG134)
/// - `ngrx-state-mutation` (NG141)
/// - `unsafe-inner-html` (NG171)
#[must_use]
pub fn minimal_rules() -> Vec<RuleSpec> {
    vec![
        subscriptions::memory_leak_subscription(),
        streams::switchmap_data_loss(),
        signals::signal_write_in_effect(),
        templates::stacked_structural_directives(),
        state::ngrx_state_mutation(),
        security::unsafe_inner_html(),
    ]
}

/// Returns all available rules in catalog order.
#[must_use]
pub fn all_rules() -> Vec<RuleSpec> {
    vec![
        subscriptions::memory_leak_subscription(),
        subscriptions::nested_subscribe(),
        subscriptions::shared_source_resubscription(),
        streams::unbounded_replay(),
        streams::switchmap_data_loss(),
        signals::signal_write_in_effect(),
        signals::effect_derived_state(),
        templates::missing_trackby(),
        templates::template_method_call(),
        templates::impure_pipe(),
        templates::stacked_structural_directives(),
        state::ngrx_state_mutation(),
        state::deeply_nested_state(),
        state::denormalized_state(),
        state::deep_parameter_mutation(),
        change_detection::missing_onpush(),
        change_detection::onpush_misuse(),
        change_detection::input_mutation(),
        providers::provider_pollution(),
        security::unsafe_inner_html(),
    ]
}
