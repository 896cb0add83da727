//! Parser front end extension point.
//!
//! `LanguageFrontend` is how a concrete parser plugs into the pipeline.
//! Implement it to teach ngcheck how to turn source text of a new language
//! (or dialect) into a [`SourceModel`].

use std::path::Path;

use crate::model::SourceModel;

/// Trait for language-specific parser front ends.
///
/// The front end receives raw source text and returns the language-agnostic
/// [`SourceModel`]. It never fails: syntax problems are reported through
/// [`SourceModel::syntax_errors`] so the caller can decide what to do with a
/// malformed unit.
pub trait LanguageFrontend: Send + Sync {
    /// Language identifier (e.g., `"typescript"`).
    fn language_id(&self) -> &'static str;

    /// File extensions this front end handles, with the leading dot (e.g., `&[".ts"]`).
    fn extensions(&self) -> &'static [&'static str];

    /// Parses source text into a model.
    fn parse(&self, source: &str) -> SourceModel;

    /// Returns true if this front end handles the given path.
    fn handles(&self, path: &Path) -> bool {
        let name = path.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
        self.extensions()
            .iter()
            .any(|ext| name.ends_with(ext) && !name.ends_with(".d.ts"))
    }
}

/// Boxed front end, as stored by the analyzer.
pub type FrontendBox = Box<dyn LanguageFrontend>;
