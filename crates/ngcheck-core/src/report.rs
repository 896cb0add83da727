//! Rendering of analysis reports.

use std::fmt;
use std::io::{self, Write};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::types::{Diagnostic, DiagnosticKind, Report, Severity};

/// Output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    /// Human-readable text.
    #[default]
    Text,
    /// JSON array of diagnostic records.
    Json,
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text => f.write_str("text"),
            Self::Json => f.write_str("json"),
        }
    }
}

/// Error returned when a format name is not recognized.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown format `{0}`, expected: text, json")]
pub struct UnknownFormat(pub String);

impl FromStr for Format {
    type Err = UnknownFormat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(UnknownFormat(s.to_string())),
        }
    }
}

/// One diagnostic as written in JSON output.
#[derive(Debug, Serialize)]
struct Record<'a> {
    rule: &'a str,
    code: &'a str,
    kind: DiagnosticKind,
    severity: Severity,
    file: String,
    line: usize,
    column: usize,
    offset: usize,
    message: &'a str,
    fix: Option<&'a str>,
}

impl<'a> From<&'a Diagnostic> for Record<'a> {
    fn from(d: &'a Diagnostic) -> Self {
        Self {
            rule: &d.rule,
            code: &d.code,
            kind: d.kind,
            severity: d.severity,
            file: d.location.file.to_string_lossy().replace('\\', "/"),
            line: d.location.line,
            column: d.location.column,
            offset: d.location.offset,
            message: &d.message,
            fix: d.fix.as_deref(),
        }
    }
}

/// Writes a [`Report`] to a sink.
///
/// Rendering never reorders: diagnostics are written in report order, each
/// exactly once. The same report always renders to the same bytes.
#[derive(Debug, Clone, Copy)]
pub struct Reporter {
    format: Format,
    pretty: bool,
}

impl Reporter {
    /// Creates a reporter for a format, without color.
    #[must_use]
    pub fn new(format: Format) -> Self {
        Self {
            format,
            pretty: false,
        }
    }

    /// Enables ANSI color for text output.
    #[must_use]
    pub fn pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    /// Renders the report into `out`.
    ///
    /// # Errors
    ///
    /// Returns an error if writing to the sink fails.
    pub fn write(&self, report: &Report, out: &mut impl Write) -> io::Result<()> {
        match self.format {
            Format::Text => self.write_text(report, out),
            Format::Json => write_json(report, out),
        }
    }

    /// Renders the report into a string.
    #[must_use]
    pub fn render(&self, report: &Report) -> String {
        let mut buf = Vec::new();
        // Writing into a Vec cannot fail.
        let _ = self.write(report, &mut buf);
        String::from_utf8_lossy(&buf).into_owned()
    }

    fn write_text(&self, report: &Report, out: &mut impl Write) -> io::Result<()> {
        for d in &report.diagnostics {
            writeln!(
                out,
                "{}:{}:{}: {} [{}] {}",
                d.location.file.display(),
                d.location.line,
                d.location.column,
                self.paint(d.severity),
                d.rule,
                d.message
            )?;
            if let Some(fix) = &d.fix {
                writeln!(out, "  = help: {fix}")?;
            }
        }
        if !report.diagnostics.is_empty() {
            writeln!(out)?;
        }

        let (errors, warnings, infos) = report.count_by_severity();
        let summary = format!(
            "Found {errors} error(s), {warnings} warning(s), {infos} info(s) in {} file(s)",
            report.files_checked
        );
        if self.pretty {
            let color = if errors > 0 {
                "\x1b[31m"
            } else if warnings > 0 {
                "\x1b[33m"
            } else {
                "\x1b[32m"
            };
            writeln!(out, "{color}{summary}\x1b[0m")?;
        } else {
            writeln!(out, "{summary}")?;
        }
        if report.was_cancelled() {
            writeln!(
                out,
                "Analysis cancelled: {} unit(s) not analyzed",
                report.units_cancelled
            )?;
        }
        Ok(())
    }

    fn paint(&self, severity: Severity) -> String {
        if !self.pretty {
            return severity.to_string();
        }
        let color = match severity {
            Severity::Error => "\x1b[31m",
            Severity::Warning => "\x1b[33m",
            Severity::Info => "\x1b[34m",
        };
        format!("{color}{severity}\x1b[0m")
    }
}

fn write_json(report: &Report, out: &mut impl Write) -> io::Result<()> {
    let records: Vec<Record<'_>> = report.diagnostics.iter().map(Record::from).collect();
    serde_json::to_writer_pretty(&mut *out, &records)?;
    writeln!(out)
}
