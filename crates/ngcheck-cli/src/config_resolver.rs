//! Configuration file resolution and loading.
//!
//! The configuration file is looked up in this order:
//!
//! 1. `--config` flag (or `$NGCHECK_CONFIG`)
//! 2. `{project}/ngcheck.toml`, then `{project}/.ngcheck.toml`
//! 3. `~/.ngcheck/config.toml`
//! 4. built-in defaults
//!
//! One file carries both the [`Config`] options and any `[[custom-rule]]`
//! tables, so it is read once and parsed twice.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use ngcheck_core::declarative::load_rules_from_toml;
use ngcheck_core::{Config, RuleSpec};
use tracing::{debug, info};

/// Where the configuration was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Given with `--config`.
    Explicit(PathBuf),
    /// Found in the project directory.
    Project(PathBuf),
    /// Found in the global config directory.
    Global(PathBuf),
    /// Nothing found; defaults apply.
    Default,
}

impl ConfigSource {
    /// Returns the resolved path, if any.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Explicit(p) | Self::Project(p) | Self::Global(p) => Some(p),
            Self::Default => None,
        }
    }
}

/// A resolved configuration together with its custom rules.
#[derive(Debug, Default)]
pub struct LoadedConfig {
    /// Where the file came from.
    pub source: Option<PathBuf>,
    /// Parsed options.
    pub config: Config,
    /// Declarative `[[custom-rule]]` rules, not yet validated by a catalog.
    pub custom_rules: Vec<RuleSpec>,
}

/// Project-level config file names, checked in order.
pub const PROJECT_CONFIG_NAMES: &[&str] = &["ngcheck.toml", ".ngcheck.toml"];

const GLOBAL_CONFIG_NAME: &str = "config.toml";

/// Resolves the configuration file for `project_dir`.
#[must_use]
pub fn resolve(project_dir: &Path, explicit: Option<&Path>) -> ConfigSource {
    resolve_in(project_dir, explicit, global_config_dir())
}

/// Resolves and reads the configuration for `project_dir`.
///
/// # Errors
///
/// Fails if the resolved file cannot be read, is not valid TOML, or holds
/// an invalid custom rule.
pub fn load(project_dir: &Path, explicit: Option<&Path>) -> Result<LoadedConfig> {
    let source = resolve(project_dir, explicit);
    let Some(path) = source.path() else {
        debug!("No config file found, using defaults");
        return Ok(LoadedConfig::default());
    };
    if matches!(source, ConfigSource::Global(_)) {
        info!("Using global config: {}", path.display());
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config: {}", path.display()))?;
    parse(path, &content)
}

fn parse(path: &Path, content: &str) -> Result<LoadedConfig> {
    let config = Config::parse(content)
        .with_context(|| format!("Failed to load config: {}", path.display()))?;
    let custom_rules = load_rules_from_toml(content)
        .with_context(|| format!("Invalid custom rule in {}", path.display()))?;
    debug!(
        "Loaded {} with {} custom rule(s)",
        path.display(),
        custom_rules.len()
    );
    Ok(LoadedConfig {
        source: Some(path.to_path_buf()),
        config,
        custom_rules,
    })
}

/// Takes the global directory as a parameter so tests need no env vars.
fn resolve_in(project_dir: &Path, explicit: Option<&Path>, global_dir: Option<PathBuf>) -> ConfigSource {
    if let Some(p) = explicit {
        return ConfigSource::Explicit(p.to_path_buf());
    }

    if let Some(found) = PROJECT_CONFIG_NAMES
        .iter()
        .map(|name| project_dir.join(name))
        .find(|candidate| candidate.is_file())
    {
        debug!("Found project config: {}", found.display());
        return ConfigSource::Project(found);
    }

    match global_dir.map(|dir| dir.join(GLOBAL_CONFIG_NAME)) {
        Some(candidate) if candidate.is_file() => {
            debug!("Found global config: {}", candidate.display());
            ConfigSource::Global(candidate)
        }
        _ => ConfigSource::Default,
    }
}

/// Global config directory: `$NGCHECK_CONFIG_DIR`, else `~/.ngcheck/`.
#[must_use]
pub fn global_config_dir() -> Option<PathBuf> {
    if let Ok(dir) = std::env::var("NGCHECK_CONFIG_DIR") {
        return Some(PathBuf::from(dir));
    }
    home::home_dir().map(|h| h.join(".ngcheck"))
}
