//! Init command implementation.

use std::path::Path;

use anyhow::{bail, Context, Result};

/// Name of the file written by `ngcheck init`.
pub const CONFIG_FILE_NAME: &str = "ngcheck.toml";

const DEFAULT_CONFIG: &str = r#"# ngcheck configuration

# Rule preset: "recommended" (default), "strict" or "minimal"
preset = "recommended"

# Drop diagnostics below this severity: "info", "warning" or "error"
# severity_min = "info"

# Exit with status 1 only for diagnostics at or above this severity
# fail_on = "warning"

# Output format: "text" or "json"
# format = "text"

# Run only these rules (ids or codes)
# only = ["NG101", "switchmap-data-loss"]

[analyzer]
# Glob patterns to exclude from analysis
exclude = [
    "**/node_modules/**",
    "**/dist/**",
    "**/*.spec.ts",
]

# Respect .gitignore files
respect_gitignore = true

# Worker threads (default: one per core)
# parallelism = 4

# Rule configurations
# Each rule can be enabled/disabled and have its severity overridden

[rules.missing-onpush]
enabled = true
# severity = "warning"

[rules.template-method-call]
enabled = true

# Custom rules match on the facts ngcheck extracts.
#
# [[custom-rule]]
# id = "no-document-write"
# code = "X001"
# title = "document.write replaces the whole page"
# severity = "error"
# message = "avoid `{property}`"
# fix = "Render the content through a template binding"
# fact = "dom-html-write"
# where = { property = "write" }
"#;

/// Writes the default configuration into `dir`.
pub fn run(dir: &Path, force: bool) -> Result<()> {
    let config_path = dir.join(CONFIG_FILE_NAME);

    if config_path.exists() && !force {
        bail!(
            "Configuration file already exists at {}. Use --force to overwrite.",
            config_path.display()
        );
    }

    std::fs::write(&config_path, DEFAULT_CONFIG)
        .with_context(|| format!("Failed to write {}", config_path.display()))?;

    println!("Created {CONFIG_FILE_NAME}");
    println!("\nNext steps:");
    println!("  1. Edit {CONFIG_FILE_NAME} to configure rules");
    println!("  2. Run: ngcheck analyze src");

    Ok(())
}
