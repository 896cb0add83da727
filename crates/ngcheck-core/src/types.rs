//! Core types for diagnostics and analysis reports.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::model::Span;

/// Severity level for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational message, does not fail analysis by default.
    Info,
    /// Warning that should be addressed.
    Warning,
    /// Error that must be fixed.
    Error,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Info => write!(f, "info"),
            Self::Warning => write!(f, "warning"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Error returned when a severity string is not recognized.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown severity `{0}`, expected: error, warning, info")]
pub struct UnknownSeverity(pub String);

impl FromStr for Severity {
    type Err = UnknownSeverity;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "info" => Ok(Self::Info),
            "warning" | "warn" => Ok(Self::Warning),
            "error" => Ok(Self::Error),
            _ => Err(UnknownSeverity(s.to_string())),
        }
    }
}

/// Source code location.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
    /// File path relative to the analysis root.
    pub file: PathBuf,
    /// Line number (1-indexed).
    pub line: usize,
    /// Column number (1-indexed).
    pub column: usize,
    /// Byte offset in file.
    pub offset: usize,
    /// Length of the span in bytes.
    pub length: usize,
}

impl Location {
    /// Creates a location covering a source model span.
    #[must_use]
    pub fn from_span(file: impl Into<PathBuf>, span: Span) -> Self {
        Self {
            file: file.into(),
            line: span.line,
            column: span.column,
            offset: span.offset,
            length: span.length,
        }
    }

    /// Creates a location pointing at the start of a file.
    #[must_use]
    pub fn file_start(file: impl Into<PathBuf>) -> Self {
        Self::new(file, 1, 1)
    }

    /// Creates a new location with explicit values.
    #[must_use]
    pub fn new(file: impl Into<PathBuf>, line: usize, column: usize) -> Self {
        Self {
            file: file.into(),
            line,
            column,
            offset: 0,
            length: 0,
        }
    }

    /// Sets the byte offset and length for this location.
    #[must_use]
    pub fn with_span(mut self, offset: usize, length: usize) -> Self {
        self.offset = offset;
        self.length = length;
        self
    }
}

/// What produced a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DiagnosticKind {
    /// A rule matched an anti-pattern instance.
    Finding,
    /// The unit could not be parsed.
    MalformedSource,
    /// A rule's matcher failed while evaluating a unit.
    EngineFault,
    /// The path could not be read.
    Io,
}

/// Rule id used for diagnostics about unparseable files.
pub const MALFORMED_SOURCE_RULE: &str = "malformed-source";

/// Rule id used for diagnostics about unreadable paths.
pub const IO_ERROR_RULE: &str = "io-error";

/// A single reported finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Rule id (e.g., "memory-leak-subscription").
    pub rule: String,
    /// Rule code (e.g., "NG101").
    pub code: String,
    /// What produced this diagnostic.
    pub kind: DiagnosticKind,
    /// Severity of this diagnostic.
    pub severity: Severity,
    /// Primary location.
    pub location: Location,
    /// Human-readable message.
    pub message: String,
    /// Optional fix suggestion rendered from the rule's fix hint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fix: Option<String>,
}

impl Diagnostic {
    /// Creates a new rule finding.
    #[must_use]
    pub fn new(
        rule: impl Into<String>,
        code: impl Into<String>,
        severity: Severity,
        location: Location,
        message: impl Into<String>,
    ) -> Self {
        Self {
            rule: rule.into(),
            code: code.into(),
            kind: DiagnosticKind::Finding,
            severity,
            location,
            message: message.into(),
            fix: None,
        }
    }

    /// Diagnostic for a unit whose source could not be parsed.
    #[must_use]
    pub fn malformed_source(location: Location, message: impl Into<String>) -> Self {
        Self {
            kind: DiagnosticKind::MalformedSource,
            ..Self::new(
                MALFORMED_SOURCE_RULE,
                "NG000",
                Severity::Error,
                location,
                message,
            )
        }
    }

    /// Diagnostic for a rule whose matcher failed on a unit.
    #[must_use]
    pub fn engine_fault(
        rule: impl Into<String>,
        code: impl Into<String>,
        file: &Path,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind: DiagnosticKind::EngineFault,
            ..Self::new(rule, code, Severity::Error, Location::file_start(file), message)
        }
    }

    /// Diagnostic for a path that could not be read.
    #[must_use]
    pub fn io_error(file: &Path, message: impl Into<String>) -> Self {
        Self {
            kind: DiagnosticKind::Io,
            ..Self::new(
                IO_ERROR_RULE,
                "NG001",
                Severity::Error,
                Location::file_start(file),
                message,
            )
        }
    }

    /// Adds a fix suggestion to this diagnostic.
    #[must_use]
    pub fn with_fix(mut self, fix: impl Into<String>) -> Self {
        self.fix = Some(fix.into());
        self
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}:{}:{}: {} [{}] {}",
            self.location.file.display(),
            self.location.line,
            self.location.column,
            self.severity,
            self.rule,
            self.message
        )
    }
}

/// Result of one analysis run.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct Report {
    /// All diagnostics, ordered by file path then source offset.
    pub diagnostics: Vec<Diagnostic>,
    /// Number of units that went through the pipeline.
    pub files_checked: usize,
    /// Number of units skipped because the run was cancelled.
    pub units_cancelled: usize,
}

impl Report {
    /// Creates a new empty report.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if the run was cancelled before every unit finished.
    #[must_use]
    pub fn was_cancelled(&self) -> bool {
        self.units_cancelled > 0
    }

    /// Highest severity present, if any.
    #[must_use]
    pub fn max_severity(&self) -> Option<Severity> {
        self.diagnostics.iter().map(|d| d.severity).max()
    }

    /// Returns true if any diagnostic meets or exceeds the given severity.
    #[must_use]
    pub fn has_diagnostics_at(&self, severity: Severity) -> bool {
        self.diagnostics.iter().any(|d| d.severity >= severity)
    }

    /// Drops diagnostics below the given severity, keeping order.
    pub fn retain_min_severity(&mut self, min: Severity) {
        self.diagnostics.retain(|d| d.severity >= min);
    }

    /// Counts diagnostics by severity as `(errors, warnings, infos)`.
    #[must_use]
    pub fn count_by_severity(&self) -> (usize, usize, usize) {
        self.diagnostics
            .iter()
            .fold((0, 0, 0), |(e, w, i), d| match d.severity {
                Severity::Error => (e + 1, w, i),
                Severity::Warning => (e, w + 1, i),
                Severity::Info => (e, w, i + 1),
            })
    }

    /// Diagnostics reported for a given rule id.
    #[must_use]
    pub fn by_rule(&self, rule: &str) -> Vec<&Diagnostic> {
        self.diagnostics.iter().filter(|d| d.rule == rule).collect()
    }

    /// Process exit code: `1` if any diagnostic reaches `threshold`, else `0`.
    #[must_use]
    pub fn exit_code(&self, threshold: Severity) -> u8 {
        u8::from(self.has_diagnostics_at(threshold))
    }

    /// Sorts diagnostics by file path, then source offset.
    ///
    /// The sort is stable, so diagnostics at the same offset keep the order
    /// they were produced in (catalog declaration order).
    pub fn sort(&mut self) {
        self.diagnostics.sort_by(|a, b| {
            a.location
                .file
                .cmp(&b.location.file)
                .then(a.location.offset.cmp(&b.location.offset))
        });
    }
}
