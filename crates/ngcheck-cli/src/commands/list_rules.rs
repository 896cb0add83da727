//! List rules command implementation.

use anyhow::Result;
use ngcheck_core::{RuleSpec, Severity};
use ngcheck_rules::{all_rules, minimal_rules};
use serde::Serialize;

use crate::OutputFormat;

/// One rule as written by `list-rules --format json`.
#[derive(Debug, Serialize)]
struct RuleRow<'a> {
    code: &'a str,
    id: &'a str,
    severity: Severity,
    class: String,
    title: &'a str,
    rationale: &'a str,
    fix: Option<&'a str>,
}

impl<'a> From<&'a RuleSpec> for RuleRow<'a> {
    fn from(rule: &'a RuleSpec) -> Self {
        Self {
            code: &rule.code,
            id: &rule.id,
            severity: rule.severity,
            class: rule.class.to_string(),
            title: &rule.title,
            rationale: &rule.rationale,
            fix: rule.fix.as_deref(),
        }
    }
}

/// Runs the list-rules command.
pub fn run(format: OutputFormat) -> Result<()> {
    let rules = all_rules();
    match format {
        OutputFormat::Text => print_text(&rules),
        OutputFormat::Json => {
            let rows: Vec<RuleRow<'_>> = rules.iter().map(RuleRow::from).collect();
            println!("{}", serde_json::to_string_pretty(&rows)?);
        }
    }
    Ok(())
}

fn print_text(rules: &[RuleSpec]) {
    println!("Available rules:\n");
    println!(
        "{:<7} {:<31} {:<8} {:<10} Title",
        "Code", "Name", "Severity", "Class"
    );
    println!("{}", "-".repeat(96));

    for rule in rules {
        println!(
            "{:<7} {:<31} {:<8} {:<10} {}",
            rule.code,
            rule.id,
            rule.severity.to_string(),
            rule.class.to_string(),
            rule.title
        );
    }

    let minimal: Vec<String> = minimal_rules().into_iter().map(|r| r.code).collect();
    println!("\nPresets (set `preset` in ngcheck.toml):");
    println!("  recommended  - all rules at their default severity (default)");
    println!("  strict       - all rules, one severity step higher");
    println!("  minimal      - {}", minimal.join(", "));

    println!("\nUse --rules to run specific rules, e.g.:");
    println!("  ngcheck analyze src --rules memory-leak-subscription,switchmap-data-loss");
    println!("  ngcheck analyze src --rules NG101,NG111");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_serialize_with_lowercase_severity() {
        let rules = all_rules();
        let rows: Vec<RuleRow<'_>> = rules.iter().map(RuleRow::from).collect();
        let json: serde_json::Value = serde_json::to_value(&rows).unwrap();

        assert_eq!(json.as_array().map(Vec::len), Some(rules.len()));
        assert_eq!(json[0]["code"], "NG101");
        assert_eq!(json[0]["id"], "memory-leak-subscription");
        assert_eq!(json[0]["class"], "structural");
        assert!(["info", "warning", "error"].contains(&json[0]["severity"].as_str().unwrap()));
    }
}
