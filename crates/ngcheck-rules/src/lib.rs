//! # ngcheck-rules
//!
//! Built-in rule catalog for ngcheck.
//!
//! Every rule is plain data: a [`RuleSpec`] whose matcher is evaluated by
//! [`ngcheck_core::RuleEngine`] over the facts of one file.
//!
//! ## Available Rules
//!
//! | Code | Name | Description |
//! |------|------|-------------|
//! | NG101 | `memory-leak-subscription` | Subscription in a component that is never disposed |
//! | NG102 | `nested-subscribe` | `.subscribe()` inside another subscribe callback |
//! | NG103 | `shared-source-resubscription` | Same source subscribed repeatedly without sharing |
//! | NG104 | `unbounded-replay` | `shareReplay`/`ReplaySubject` without a buffer size |
//! | NG111 | `switchmap-data-loss` | Mutating request under `switchMap` |
//! | NG121 | `signal-write-in-effect` | Effect writes a signal it reads |
//! | NG122 | `effect-derived-state` | Effect keeps derived state in sync |
//! | NG131 | `missing-trackby` | List rendered without identity key |
//! | NG132 | `template-method-call` | Method called from a template binding |
//! | NG133 | `impure-pipe` | Pipe declared with `pure: false` |
//! | NG134 | `stacked-structural-directives` | Several `*` directives on one element |
//! | NG141 | `ngrx-state-mutation` | Reducer mutates its state argument |
//! | NG142 | `deeply-nested-state` | State nested three or more levels deep |
//! | NG143 | `denormalized-state` | State field duplicating another field |
//! | NG144 | `deep-parameter-mutation` | Function mutating nested parameter fields |
//! | NG151 | `missing-onpush` | Component on the default change-detection strategy |
//! | NG152 | `onpush-misuse` | In-place mutation in an `OnPush` component |
//! | NG153 | `input-mutation` | Component mutates an input it received |
//! | NG161 | `provider-pollution` | Root-provided service provided again |
//! | NG171 | `unsafe-inner-html` | Unsanitized HTML written to the DOM |
//!
//! ## Usage
//!
//! ```ignore
//! use ngcheck_core::RuleEngine;
//! use ngcheck_rules::{builtin_catalog, Preset};
//!
//! let engine = RuleEngine::new(builtin_catalog()?);
//! let strict = Preset::Strict.rules();
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod change_detection;
mod presets;
pub mod providers;
pub mod security;
pub mod signals;
pub mod state;
pub mod streams;
pub mod subscriptions;
pub mod templates;

use tracing::debug;

pub use presets::{all_rules, minimal_rules, recommended_rules, strict_rules, Preset, UnknownPreset};

/// Re-export core types for convenience.
pub use ngcheck_core::{Catalog, CatalogLoadError, RuleClass, RuleSpec, Severity};

use ngcheck_core::FactExtractor;

/// Every built-in rule, in catalog order.
#[must_use]
pub fn builtin_rules() -> Vec<RuleSpec> {
    all_rules()
}

/// Loads a validated catalog of the rules of `preset`.
///
/// # Errors
///
/// Returns an error if a rule fails catalog validation.
pub fn preset_catalog(preset: Preset) -> Result<Catalog, CatalogLoadError> {
    let rules = preset.rules();
    debug!("Loading {} rules for preset {}", rules.len(), preset);
    Catalog::load(rules, FactExtractor::produced_kinds())
}

/// Loads a validated catalog of every built-in rule.
///
/// # Errors
///
/// Returns an error if a rule fails catalog validation.
pub fn builtin_catalog() -> Result<Catalog, CatalogLoadError> {
    preset_catalog(Preset::Recommended)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_catalog_loads() {
        let catalog = builtin_catalog().unwrap();
        assert_eq!(catalog.len(), 20);
        assert_eq!(catalog.rules()[0].id, "memory-leak-subscription");
        assert!(catalog.get("NG111").is_some());
    }

    #[test]
    fn every_preset_loads() {
        for preset in [Preset::Recommended, Preset::Strict, Preset::Minimal] {
            assert!(preset_catalog(preset).is_ok(), "{preset}");
        }
    }

    #[test]
    fn every_rule_has_text() {
        for rule in builtin_rules() {
            assert!(!rule.rationale.is_empty(), "{}", rule.id);
            assert!(!rule.message.is_empty(), "{}", rule.id);
            assert!(rule.fix.is_some(), "{}", rule.id);
        }
    }
}
