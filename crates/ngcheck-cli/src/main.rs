//! ngcheck CLI tool.
//!
//! Usage:
//! ```bash
//! ngcheck analyze [OPTIONS] [PATH]...
//! ngcheck list-rules
//! ngcheck init
//! ```
//!
//! Exit codes: `0` nothing at or above the failure threshold, `1` findings,
//! `2` the catalog, configuration or analyzer could not be set up.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use ngcheck_core::{Format, Severity};
use tracing_subscriber::EnvFilter;

mod commands;
mod config_resolver;

/// Exit status for a run with nothing at or above the threshold.
pub const EXIT_CLEAN: u8 = 0;
/// Exit status for a run with findings at or above the threshold.
pub const EXIT_FINDINGS: u8 = 1;
/// Exit status when the run could not be set up or did not complete.
pub const EXIT_FAILURE: u8 = 2;

/// Angular anti-pattern checker
#[derive(Parser)]
#[command(name = "ngcheck")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to configuration file
    #[arg(short, long, global = true, env = "NGCHECK_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze source files and directories
    Analyze(AnalyzeArgs),

    /// List available rules
    ListRules {
        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Initialize configuration file
    Init {
        /// Overwrite existing config
        #[arg(long)]
        force: bool,
    },
}

/// Options of the `analyze` command. Flags override the configuration file.
#[derive(clap::Args, Debug)]
pub struct AnalyzeArgs {
    /// Files or directories to analyze (default: current directory)
    #[arg(default_value = ".")]
    pub paths: Vec<PathBuf>,

    /// Output format
    #[arg(short, long)]
    pub format: Option<OutputFormat>,

    /// Drop diagnostics below this severity
    #[arg(long)]
    pub severity_min: Option<SeverityArg>,

    /// Only run specific rules (comma-separated ids or codes)
    #[arg(long)]
    pub rules: Option<String>,

    /// Exit with status 1 when a diagnostic at or above this severity remains
    #[arg(long)]
    pub fail_on: Option<SeverityArg>,

    /// Exclude patterns (can be specified multiple times)
    #[arg(short, long)]
    pub exclude: Vec<String>,

    /// Number of worker threads (default: one per core)
    #[arg(short, long)]
    pub jobs: Option<usize>,

    /// Cancel analysis after this many seconds
    #[arg(long)]
    pub timeout_secs: Option<u64>,
}

/// Output format for reports.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    #[default]
    Text,
    /// JSON output.
    Json,
}

impl From<OutputFormat> for Format {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Text => Self::Text,
            OutputFormat::Json => Self::Json,
        }
    }
}

/// Severity given on the command line.
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum SeverityArg {
    /// Informational findings and above.
    Info,
    /// Warnings and errors.
    Warning,
    /// Errors only.
    Error,
}

impl From<SeverityArg> for Severity {
    fn from(severity: SeverityArg) -> Self {
        match severity {
            SeverityArg::Info => Self::Info,
            SeverityArg::Warning => Self::Warning,
            SeverityArg::Error => Self::Error,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("warn")
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match run(cli) {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("Error: {e:?}");
            ExitCode::from(EXIT_FAILURE)
        }
    }
}

fn run(cli: Cli) -> Result<u8> {
    match cli.command {
        Commands::Analyze(args) => commands::analyze::run(&args, cli.config.as_deref()),
        Commands::ListRules { format } => {
            commands::list_rules::run(format)?;
            Ok(EXIT_CLEAN)
        }
        Commands::Init { force } => {
            commands::init::run(std::path::Path::new("."), force)?;
            Ok(EXIT_CLEAN)
        }
    }
}
