//! Shared output of analysis reports.

use std::io::{self, IsTerminal, Write};

use anyhow::{Context, Result};
use ngcheck_core::{Format, Report, Reporter};

/// Prints a report to stdout in the given format.
///
/// Text output is colored only when stdout is a terminal.
pub fn print(report: &Report, format: Format) -> Result<()> {
    let stdout = io::stdout();
    let pretty = format == Format::Text && stdout.is_terminal();
    let mut out = stdout.lock();
    Reporter::new(format)
        .pretty(pretty)
        .write(report, &mut out)
        .context("Failed to write report")?;
    out.flush().context("Failed to write report")?;
    Ok(())
}
