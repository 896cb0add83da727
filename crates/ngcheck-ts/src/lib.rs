//! # ngcheck-ts
//!
//! TypeScript front end for ngcheck, built on tree-sitter.
//!
//! [`TypeScriptFrontend`] turns `.ts` / `.tsx` source text into the
//! language-agnostic [`ngcheck_core::model::SourceModel`]: Angular
//! declarations classified by decorator, their members, the calls and
//! property writes in their bodies, decorator metadata as literal trees and
//! the bindings of inline templates.
//!
//! ## Example
//!
//! ```ignore
//! use ngcheck_core::LanguageFrontend;
//! use ngcheck_ts::TypeScriptFrontend;
//!
//! let model = TypeScriptFrontend::new().parse("export class Empty {}");
//! assert!(!model.is_malformed());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod collector;
mod syntax;
mod template;
mod typescript;

pub use template::scan_template;
pub use typescript::TypeScriptFrontend;
