//! Subcommand implementations.

pub mod analyze;
pub mod init;
pub mod list_rules;
pub mod output;
