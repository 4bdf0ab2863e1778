//! search-agent CLI entry point.

use std::io::Write;

use anyhow::Context;
use clap::Parser;
use search_agent::cli::{Cli, execute};
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // RUST_LOG wins; otherwise warn, or debug with --verbose.
    let default_level = if cli.verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let output = execute(&cli)?;

    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{}", output.trim_end()).context("failed to write output")?;
    Ok(())
}
