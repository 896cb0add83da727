//! Declarative custom rules driven by TOML configuration.
//!
//! Projects can add rules without writing Rust: each `[[custom-rule]]` table
//! names a fact kind, payload conditions and an optional `with`/`without`
//! relation, which map one-to-one onto [`crate::matcher`] combinators.
//!
//! # Architecture
//!
//! ```text
//! TOML text
//!   ↓ serde (DTO layer)
//! config_dto types
//!   ↓ validate + convert
//! Vec<RuleSpec>
//!   ↓ Catalog::load (alongside built-in rules)
//! ```

pub mod config_dto;
pub mod loader;

use crate::catalog::RuleSpec;

/// Errors from parsing TOML and loading declarative rules.
#[derive(Debug, thiserror::Error)]
pub enum LoadRulesError {
    /// TOML deserialization failed.
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// A custom rule failed validation.
    #[error("{0}")]
    Load(#[from] loader::LoadError),
}

/// Parses TOML content and converts every `[[custom-rule]]` table.
///
/// Returns `Ok(vec![])` if no custom rules are present.
///
/// # Errors
///
/// Returns an error if TOML parsing or rule validation fails.
pub fn load_rules_from_toml(content: &str) -> Result<Vec<RuleSpec>, LoadRulesError> {
    let dto: config_dto::DeclarativeConfigDto = toml::from_str(content)?;
    Ok(loader::load(dto)?)
}
