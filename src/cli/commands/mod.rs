//! Subcommand implementations.

pub mod activity;
pub mod fields;
pub mod import;
pub mod save;
