//! Analyze command implementation.

use std::path::Path;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use ngcheck_core::{
    Analyzer, AnalyzerError, CancellationToken, Catalog, Config, FactExtractor, Format, Severity,
};
use ngcheck_rules::Preset;
use ngcheck_ts::TypeScriptFrontend;
use tracing::{debug, info, warn};

use crate::config_resolver;
use crate::{AnalyzeArgs, EXIT_CLEAN, EXIT_FAILURE, EXIT_FINDINGS};

/// Runs the analyze command and returns the process exit code.
pub fn run(args: &AnalyzeArgs, explicit_config: Option<&Path>) -> Result<u8> {
    let loaded = config_resolver::load(Path::new("."), explicit_config)?;
    if let Some(source) = &loaded.source {
        debug!("Using config: {}", source.display());
    }
    let mut config = loaded.config;
    apply_overrides(&mut config, args);

    let preset = match config.preset.as_deref() {
        Some(name) => name
            .parse::<Preset>()
            .with_context(|| format!("Invalid preset in configuration: {name}"))?,
        None => Preset::default(),
    };
    debug!("Using preset {preset}");

    let mut rules = preset.rules();
    rules.extend(loaded.custom_rules);
    let catalog = match Catalog::load(rules, FactExtractor::produced_kinds()) {
        Ok(catalog) => catalog,
        Err(e) => {
            eprintln!("{:?}", miette::Report::new(e));
            return Ok(EXIT_FAILURE);
        }
    };

    let cancellation = CancellationToken::new();
    if let Some(secs) = args.timeout_secs {
        let token = cancellation.clone();
        thread::spawn(move || {
            thread::sleep(Duration::from_secs(secs));
            token.cancel();
        });
    }

    let format = config.format.unwrap_or_default();
    let threshold = failure_threshold(&config);

    let mut builder = Analyzer::builder()
        .root(".")
        .frontend(TypeScriptFrontend::new())
        .frontend(TypeScriptFrontend::tsx())
        .catalog(catalog)
        .excludes(args.exclude.iter().cloned())
        .config(config)
        .cancellation(cancellation);
    if let Some(jobs) = args.jobs {
        builder = builder.parallelism(jobs);
    }

    let analyzer = match builder.build() {
        Ok(analyzer) => analyzer,
        Err(AnalyzerError::Catalog(e)) => {
            eprintln!("{:?}", miette::Report::new(e));
            return Ok(EXIT_FAILURE);
        }
        Err(e) => return Err(e).context("Failed to set up analyzer"),
    };
    info!("Running {} rule(s)", analyzer.rule_count());

    let report = analyzer.analyze(&args.paths).context("Analysis failed")?;
    super::output::print(&report, format)?;

    if report.was_cancelled() {
        warn!(
            "Timed out: {} file(s) were not analyzed",
            report.units_cancelled
        );
        return Ok(EXIT_FAILURE);
    }
    if report.has_diagnostics_at(threshold) {
        Ok(EXIT_FINDINGS)
    } else {
        Ok(EXIT_CLEAN)
    }
}

/// Command-line flags win over the configuration file.
fn apply_overrides(config: &mut Config, args: &AnalyzeArgs) {
    if let Some(format) = args.format {
        config.format = Some(Format::from(format));
    }
    if let Some(min) = args.severity_min {
        config.severity_min = Some(Severity::from(min));
    }
    if let Some(fail_on) = args.fail_on {
        config.fail_on = Some(Severity::from(fail_on));
    }
    if let Some(rules) = &args.rules {
        config.only = rules
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect();
    }
    if let Some(jobs) = args.jobs {
        config.analyzer.parallelism = Some(jobs);
    }
}

/// `fail_on`, else `severity_min`, else any diagnostic.
fn failure_threshold(config: &Config) -> Severity {
    config
        .fail_on
        .or(config.severity_min)
        .unwrap_or(Severity::Info)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{OutputFormat, SeverityArg};
    use std::path::PathBuf;

    fn default_args() -> AnalyzeArgs {
        AnalyzeArgs {
            paths: vec![PathBuf::from(".")],
            format: None,
            severity_min: None,
            rules: None,
            fail_on: None,
            exclude: Vec::new(),
            jobs: None,
            timeout_secs: None,
        }
    }

    #[test]
    fn flags_override_file_options() {
        let mut config = Config::parse(
            r#"
format = "text"
severity_min = "info"
only = ["NG101"]
"#,
        )
        .unwrap();
        let args = AnalyzeArgs {
            format: Some(OutputFormat::Json),
            severity_min: Some(SeverityArg::Warning),
            rules: Some("NG111, missing-trackby,".to_string()),
            jobs: Some(2),
            ..default_args()
        };
        apply_overrides(&mut config, &args);

        assert_eq!(config.format, Some(Format::Json));
        assert_eq!(config.severity_min, Some(Severity::Warning));
        assert_eq!(config.only, vec!["NG111", "missing-trackby"]);
        assert_eq!(config.analyzer.parallelism, Some(2));
    }

    #[test]
    fn absent_flags_keep_file_options() {
        let mut config = Config::parse("only = [\"NG101\"]\nfail_on = \"error\"\n").unwrap();
        apply_overrides(&mut config, &default_args());
        assert_eq!(config.only, vec!["NG101"]);
        assert_eq!(config.fail_on, Some(Severity::Error));
    }

    #[test]
    fn threshold_prefers_fail_on() {
        let mut config = Config::default();
        assert_eq!(failure_threshold(&config), Severity::Info);

        config.severity_min = Some(Severity::Warning);
        assert_eq!(failure_threshold(&config), Severity::Warning);

        config.fail_on = Some(Severity::Error);
        assert_eq!(failure_threshold(&config), Severity::Error);
    }
}
