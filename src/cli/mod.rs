//! CLI layer for search-agent.
//!
//! Provides the command-line interface using clap, with commands for
//! running a strategy, comparing strategies across models and managing
//! prompt templates.

pub mod commands;
pub mod output;
pub mod parser;

pub use commands::execute;
pub use output::OutputFormat;
pub use parser::{BackendArgs, BudgetArgs, Cli, Commands};
