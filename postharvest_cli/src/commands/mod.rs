//! CLI subcommand implementations.

pub mod api;
pub mod browser;
pub mod harvest;
pub mod report;
pub mod search;
