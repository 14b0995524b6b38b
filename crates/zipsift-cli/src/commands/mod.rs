//! Subcommand implementations.

pub mod extract;
pub mod list;
