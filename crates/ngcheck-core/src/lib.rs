//! # ngcheck-core
//!
//! Core engine for detecting Angular anti-patterns.
//!
//! The pipeline is:
//!
//! ```text
//! source file → LanguageFrontend → SourceModel → FactExtractor → [Fact]
//!             → RuleEngine (+ Catalog) → [Diagnostic] → Reporter
//! ```
//!
//! This crate provides:
//!
//! - [`model`]: the language-agnostic source model parser front ends produce
//! - [`LanguageFrontend`] for plugging in a parser
//! - [`facts`]: typed facts and the [`FactExtractor`]
//! - [`matcher`]: data-only predicate combinators over facts
//! - [`Catalog`] of [`RuleSpec`]s, validated once at startup
//! - [`RuleEngine`] and the parallel [`Analyzer`]
//! - [`Reporter`] for text and JSON output
//!
//! ## Example
//!
//! ```ignore
//! use ngcheck_core::{Analyzer, Catalog, FactExtractor, Format, Reporter};
//!
//! let catalog = Catalog::load(my_rules(), FactExtractor::produced_kinds())?;
//! let analyzer = Analyzer::builder()
//!     .root(".")
//!     .frontend(MyFrontend)
//!     .catalog(catalog)
//!     .build()?;
//!
//! let report = analyzer.analyze(&["src".into()])?;
//! Reporter::new(Format::Text).write(&report, &mut std::io::stdout())?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod analyzer;
mod catalog;
mod config;
mod engine;
mod frontend;
mod report;
mod types;

/// Declarative custom rules loaded from TOML.
pub mod declarative;
pub mod facts;
pub mod matcher;
pub mod model;

pub use analyzer::{Analyzer, AnalyzerBuilder, AnalyzerError, CancellationToken};
pub use catalog::{render, Catalog, CatalogLoadError, RuleClass, RuleSpec};
pub use config::{AnalyzerConfig, Config, ConfigError, RuleConfig};
pub use engine::RuleEngine;
pub use facts::{ExtractError, Fact, FactExtractor, FactKind, Subject, Value};
pub use frontend::{FrontendBox, LanguageFrontend};
pub use matcher::{Condition, FactPattern, Join, Match, MatchError, Matcher, Unless};
pub use report::{Format, Reporter, UnknownFormat};
pub use types::{
    Diagnostic, DiagnosticKind, Location, Report, Severity, UnknownSeverity, IO_ERROR_RULE,
    MALFORMED_SOURCE_RULE,
};
