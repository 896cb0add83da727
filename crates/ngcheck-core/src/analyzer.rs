//! Core analyzer for orchestrating analysis runs.
//!
//! One run discovers the input units, then pushes each through
//! read → parse → extract → evaluate on a `rayon` pool. Units never share
//! mutable state: each worker returns its own diagnostics and the caller
//! concatenates and re-sorts them.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rayon::prelude::*;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::catalog::{Catalog, CatalogLoadError};
use crate::config::Config;
use crate::engine::RuleEngine;
use crate::facts::{ExtractError, FactExtractor};
use crate::frontend::{FrontendBox, LanguageFrontend};
use crate::model::SourceUnit;
use crate::types::{Diagnostic, Location, Report};

/// Errors that prevent an analysis run from starting.
#[derive(Debug, Error)]
pub enum AnalyzerError {
    /// IO error resolving the root directory.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Glob pattern error.
    #[error("Invalid glob pattern: {0}")]
    Glob(#[from] glob::PatternError),

    /// The worker pool could not be created.
    #[error("Failed to start worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    /// The configured rule selection is invalid.
    #[error(transparent)]
    Catalog(#[from] CatalogLoadError),
}

/// Shared flag for cooperative cancellation.
///
/// Clones observe the same flag. Workers check it before starting a unit and
/// between extraction and evaluation; a cancelled unit emits nothing.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    /// Creates a token that is not cancelled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// Returns true once [`cancel`](Self::cancel) has been called.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Builder for configuring an [`Analyzer`].
#[derive(Default)]
pub struct AnalyzerBuilder {
    root: Option<PathBuf>,
    frontends: Vec<FrontendBox>,
    catalog: Option<Catalog>,
    exclude_patterns: Vec<String>,
    config: Option<Config>,
    parallelism: Option<usize>,
    cancellation: Option<CancellationToken>,
}

impl AnalyzerBuilder {
    /// Creates a new builder with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the root that diagnostic paths are reported relative to.
    #[must_use]
    pub fn root(mut self, path: impl Into<PathBuf>) -> Self {
        self.root = Some(path.into());
        self
    }

    /// Adds a parser front end.
    #[must_use]
    pub fn frontend<F: LanguageFrontend + 'static>(mut self, frontend: F) -> Self {
        self.frontends.push(Box::new(frontend));
        self
    }

    /// Sets the rule catalog.
    #[must_use]
    pub fn catalog(mut self, catalog: Catalog) -> Self {
        self.catalog = Some(catalog);
        self
    }

    /// Adds an exclude glob pattern.
    #[must_use]
    pub fn exclude(mut self, pattern: impl Into<String>) -> Self {
        self.exclude_patterns.push(pattern.into());
        self
    }

    /// Adds multiple exclude glob patterns.
    #[must_use]
    pub fn excludes<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude_patterns
            .extend(patterns.into_iter().map(Into::into));
        self
    }

    /// Sets the configuration.
    #[must_use]
    pub fn config(mut self, config: Config) -> Self {
        self.config = Some(config);
        self
    }

    /// Caps the number of worker threads (default: one per core).
    #[must_use]
    pub fn parallelism(mut self, threads: usize) -> Self {
        self.parallelism = Some(threads);
        self
    }

    /// Sets the cancellation token observed by workers.
    #[must_use]
    pub fn cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Builds the analyzer.
    ///
    /// Rule settings from the configuration (`only`, `[rules.<id>]`) are
    /// applied to the catalog here.
    ///
    /// # Errors
    ///
    /// Returns an error if an exclude pattern is invalid, the current
    /// directory cannot be resolved, or `only` names an unknown rule.
    pub fn build(self) -> Result<Analyzer, AnalyzerError> {
        let config = self.config.unwrap_or_default();

        let root = self.root.unwrap_or_else(|| PathBuf::from("."));
        let root = if root.is_absolute() {
            root
        } else {
            std::env::current_dir()?.join(&root)
        };

        let mut exclude_patterns = self.exclude_patterns;
        exclude_patterns.extend(config.analyzer.exclude.iter().cloned());
        let excludes = exclude_patterns
            .iter()
            .map(|p| glob::Pattern::new(p).map(|g| (p.clone(), g)))
            .collect::<Result<Vec<_>, _>>()?;

        let mut catalog = self.catalog.unwrap_or_default();
        if !config.only.is_empty() {
            catalog = catalog.restrict(&config.only)?;
        }
        let catalog = catalog.configure(&config);

        Ok(Analyzer {
            root,
            frontends: self.frontends,
            engine: RuleEngine::new(catalog),
            extractor: FactExtractor::new(),
            excludes,
            parallelism: self.parallelism.or(config.analyzer.parallelism),
            cancellation: self.cancellation.unwrap_or_default(),
            config,
        })
    }
}

/// Outcome of pushing one unit through the pipeline.
enum UnitOutcome {
    Done(Vec<Diagnostic>),
    Cancelled,
}

/// The main analyzer that orchestrates analysis runs.
///
/// Use [`Analyzer::builder()`] to construct an instance.
pub struct Analyzer {
    root: PathBuf,
    frontends: Vec<FrontendBox>,
    engine: RuleEngine,
    extractor: FactExtractor,
    excludes: Vec<(String, glob::Pattern)>,
    parallelism: Option<usize>,
    cancellation: CancellationToken,
    config: Config,
}

impl Analyzer {
    /// Creates a new builder for configuring an analyzer.
    #[must_use]
    pub fn builder() -> AnalyzerBuilder {
        AnalyzerBuilder::new()
    }

    /// Returns the root directory diagnostics are relative to.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the number of active rules.
    #[must_use]
    pub fn rule_count(&self) -> usize {
        self.engine.catalog().len()
    }

    /// Returns the cancellation token workers observe.
    #[must_use]
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    /// Analyzes the given files and directories.
    ///
    /// Per-path failures (missing paths, unreadable files, malformed sources,
    /// faulting rules) become diagnostics in the report; they never abort
    /// the run.
    ///
    /// # Errors
    ///
    /// Returns an error only if the worker pool cannot be started.
    pub fn analyze(&self, paths: &[PathBuf]) -> Result<Report, AnalyzerError> {
        info!("Starting analysis of {} path(s) at {:?}", paths.len(), self.root);

        let (files, mut diagnostics) = self.discover_files(paths);
        info!("Found {} files to analyze", files.len());

        let mut pool = rayon::ThreadPoolBuilder::new();
        if let Some(threads) = self.parallelism {
            pool = pool.num_threads(threads);
        }
        let pool = pool.build()?;
        let outcomes: Vec<UnitOutcome> =
            pool.install(|| files.par_iter().map(|f| self.analyze_unit(f)).collect());

        let mut report = Report::new();
        for outcome in outcomes {
            match outcome {
                UnitOutcome::Done(unit) => {
                    diagnostics.extend(unit);
                    report.files_checked += 1;
                }
                UnitOutcome::Cancelled => report.units_cancelled += 1,
            }
        }
        report.diagnostics = diagnostics;
        report.sort();
        if let Some(min) = self.config.severity_min {
            report.retain_min_severity(min);
        }

        if report.was_cancelled() {
            warn!(
                "Analysis cancelled: {} unit(s) not analyzed",
                report.units_cancelled
            );
        }
        info!(
            "Analysis complete: {} diagnostics in {} files",
            report.diagnostics.len(),
            report.files_checked
        );
        Ok(report)
    }

    /// Runs read → parse → extract → evaluate for one file.
    fn analyze_unit(&self, path: &Path) -> UnitOutcome {
        if self.cancellation.is_cancelled() {
            return UnitOutcome::Cancelled;
        }
        debug!("Analyzing: {}", path.display());

        let relative = self.relative(path);
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) => {
                warn!("Failed to read {}: {}", path.display(), e);
                return UnitOutcome::Done(vec![Diagnostic::io_error(
                    &relative,
                    format!("cannot read file: {e}"),
                )]);
            }
        };
        let Some(frontend) = self.frontend_for(path) else {
            return UnitOutcome::Done(Vec::new());
        };

        let model = frontend.parse(&text);
        let unit = SourceUnit::new(path, &self.root, text, model);
        let facts = match self.extractor.extract(&unit) {
            Ok(facts) => facts,
            Err(ExtractError::MalformedSource {
                path,
                line,
                column,
                offset,
                message,
            }) => {
                warn!("Failed to parse {}:{}:{}: {}", path.display(), line, column, message);
                let location = Location::new(path, line, column).with_span(offset, 0);
                return UnitOutcome::Done(vec![Diagnostic::malformed_source(
                    location,
                    format!("malformed source: {message}"),
                )]);
            }
        };

        if self.cancellation.is_cancelled() {
            return UnitOutcome::Cancelled;
        }
        UnitOutcome::Done(self.engine.evaluate(&unit.relative_path, &facts))
    }

    fn frontend_for(&self, path: &Path) -> Option<&dyn LanguageFrontend> {
        self.frontends
            .iter()
            .find(|f| f.handles(path))
            .map(|f| &**f)
    }

    fn relative(&self, path: &Path) -> PathBuf {
        path.strip_prefix(&self.root)
            .map_or_else(|_| path.to_path_buf(), Path::to_path_buf)
    }

    /// Expands the input paths into a sorted, deduplicated file list.
    ///
    /// Missing paths and walk errors are returned as `io-error` diagnostics.
    fn discover_files(&self, paths: &[PathBuf]) -> (Vec<PathBuf>, Vec<Diagnostic>) {
        let mut files = Vec::new();
        let mut diagnostics = Vec::new();

        for input in paths {
            let path = if input.is_absolute() {
                input.clone()
            } else {
                self.root.join(input)
            };

            if path.is_file() {
                if self.frontend_for(&path).is_some() {
                    files.push(path);
                } else {
                    debug!("No front end for {}, skipping", path.display());
                }
                continue;
            }
            if !path.is_dir() {
                warn!("Path not found: {}", path.display());
                diagnostics.push(Diagnostic::io_error(
                    &self.relative(&path),
                    "path does not exist",
                ));
                continue;
            }

            let mut walker = ignore::WalkBuilder::new(&path);
            walker
                .hidden(false)
                .git_ignore(self.config.analyzer.respect_gitignore)
                .require_git(false);
            for entry in walker.build() {
                let entry = match entry {
                    Ok(entry) => entry,
                    Err(e) => {
                        warn!("Walk error under {}: {}", path.display(), e);
                        diagnostics.push(Diagnostic::io_error(
                            &self.relative(&path),
                            format!("cannot walk directory: {e}"),
                        ));
                        continue;
                    }
                };
                let file = entry.path();
                if !file.is_file() || self.frontend_for(file).is_none() {
                    continue;
                }
                if self.should_exclude(file) {
                    debug!("Excluding: {}", file.display());
                    continue;
                }
                files.push(file.to_path_buf());
            }
        }

        files.sort();
        files.dedup();
        (files, diagnostics)
    }

    /// Checks if a path should be excluded.
    fn should_exclude(&self, path: &Path) -> bool {
        let path_str = path.to_string_lossy().replace('\\', "/");
        let relative = self.relative(path).to_string_lossy().replace('\\', "/");

        self.excludes.iter().any(|(raw, pattern)| {
            if pattern.matches(&path_str) || pattern.matches(&relative) {
                return true;
            }
            // Directory patterns like "**/node_modules/**" also match as a substring.
            let normalized = raw.replace("**", "");
            normalized.starts_with('/')
                && normalized.ends_with('/')
                && normalized.len() > 2
                && path_str.contains(&normalized)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::RuleSpec;
    use crate::facts::FactKind;
    use crate::matcher::{FactPattern, Matcher};
    use crate::model::{DeclId, DeclKind, Declaration, Decorator, Literal, SourceModel, Span, SyntaxError};
    use crate::types::{DiagnosticKind, Severity};

    /// Every file is one component; `@@` marks a syntax error.
    struct Stub;

    impl LanguageFrontend for Stub {
        fn language_id(&self) -> &'static str {
            "stub"
        }

        fn extensions(&self) -> &'static [&'static str] {
            &[".ts"]
        }

        fn parse(&self, source: &str) -> SourceModel {
            let mut model = SourceModel::default();
            if let Some(offset) = source.find("@@") {
                model.syntax_errors.push(SyntaxError {
                    span: Span::new(offset, 2, 1, offset + 1),
                    message: "unexpected `@@`".into(),
                });
                return model;
            }
            let mut decl = Declaration::new(DeclId(0), DeclKind::Component, "Stub", Span::default());
            decl.decorators.push(Decorator {
                name: "Component".into(),
                arguments: vec![Literal::Object(Vec::new())],
                span: Span::new(0, 10, 1, 1),
            });
            model.declarations.push(decl);
            model
        }
    }

    fn catalog() -> Catalog {
        Catalog::load(
            vec![RuleSpec::new(
                "default-cd",
                "T1",
                Severity::Warning,
                "default change detection",
                Matcher::each(FactPattern::new(FactKind::DetectionStrategy).eq("strategy", "Default")),
            )],
            FactKind::ALL,
        )
        .unwrap()
    }

    fn analyzer(root: &Path) -> Analyzer {
        Analyzer::builder()
            .root(root)
            .frontend(Stub)
            .catalog(catalog())
            .parallelism(2)
            .build()
            .expect("Failed to build analyzer")
    }

    #[test]
    fn test_exclude_patterns() {
        let analyzer = Analyzer::builder()
            .root("/foo")
            .exclude("**/generated/**")
            .build()
            .expect("Failed to build analyzer");

        assert!(analyzer.should_exclude(Path::new("/foo/node_modules/x/index.ts")));
        assert!(analyzer.should_exclude(Path::new("/foo/src/generated/api.ts")));
        assert!(analyzer.should_exclude(Path::new("/foo/src/app.component.spec.ts")));
        assert!(!analyzer.should_exclude(Path::new("/foo/src/app.component.ts")));
    }

    #[test]
    fn invalid_exclude_is_rejected() {
        let result = Analyzer::builder().root("/foo").exclude("[").build();
        assert!(matches!(result, Err(AnalyzerError::Glob(_))));
    }

    #[test]
    fn only_with_unknown_rule_fails_to_build() {
        let mut config = Config::default();
        config.only = vec!["nope".into()];
        let result = Analyzer::builder().root("/foo").catalog(catalog()).config(config).build();
        assert!(matches!(result, Err(AnalyzerError::Catalog(_))));
    }

    #[test]
    fn empty_input_yields_empty_report() {
        let dir = tempfile::tempdir().unwrap();
        let report = analyzer(dir.path()).analyze(&[]).unwrap();
        assert!(report.diagnostics.is_empty());
        assert_eq!(report.files_checked, 0);
        assert_eq!(report.exit_code(Severity::Info), 0);
    }

    #[test]
    fn missing_path_is_an_io_diagnostic() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.ts"), "ok").unwrap();
        let report = analyzer(dir.path())
            .analyze(&[PathBuf::from("missing"), PathBuf::from("a.ts")])
            .unwrap();
        assert_eq!(report.files_checked, 1);
        let kinds: Vec<DiagnosticKind> = report.diagnostics.iter().map(|d| d.kind).collect();
        assert_eq!(kinds, vec![DiagnosticKind::Finding, DiagnosticKind::Io]);
        assert_eq!(report.diagnostics[1].location.file, PathBuf::from("missing"));
    }

    #[test]
    fn malformed_unit_is_isolated() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.ts"), "ok").unwrap();
        std::fs::write(dir.path().join("b.ts"), "x @@ y").unwrap();
        std::fs::write(dir.path().join("notes.md"), "ignored").unwrap();
        let report = analyzer(dir.path()).analyze(&[dir.path().to_path_buf()]).unwrap();
        assert_eq!(report.files_checked, 2);
        assert_eq!(report.diagnostics.len(), 2);
        assert_eq!(report.diagnostics[0].rule, "default-cd");
        assert_eq!(report.diagnostics[1].kind, DiagnosticKind::MalformedSource);
        assert_eq!(report.diagnostics[1].location.offset, 2);
    }

    #[test]
    fn severity_min_filters_report() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.ts"), "ok").unwrap();
        let mut config = Config::default();
        config.severity_min = Some(Severity::Error);
        let report = Analyzer::builder()
            .root(dir.path())
            .frontend(Stub)
            .catalog(catalog())
            .config(config)
            .build()
            .unwrap()
            .analyze(&[PathBuf::from(".")])
            .unwrap();
        assert!(report.diagnostics.is_empty());
        assert_eq!(report.files_checked, 1);
    }

    #[test]
    fn cancelled_run_emits_nothing_for_skipped_units() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["a.ts", "b.ts", "c.ts"] {
            std::fs::write(dir.path().join(name), "ok").unwrap();
        }
        let token = CancellationToken::new();
        let analyzer = Analyzer::builder()
            .root(dir.path())
            .frontend(Stub)
            .catalog(catalog())
            .cancellation(token.clone())
            .build()
            .unwrap();
        token.cancel();
        let report = analyzer.analyze(&[PathBuf::from(".")]).unwrap();
        assert!(report.diagnostics.is_empty());
        assert_eq!(report.units_cancelled, 3);
        assert!(report.was_cancelled());
    }
}
