//! CLI command implementations.
//!
//! Contains the business logic for each CLI command.

// Allow certain patterns that improve readability in CLI output formatting
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::format_push_string)]

use std::path::Path;
use std::time::Duration;

use futures_util::future::join_all;
use tokio_util::sync::CancellationToken;

use crate::agent::config::{AgentConfig, RunConfig, resolve_model_alias};
use crate::agent::message::ChatMessage;
use crate::agent::prompt::PromptSet;
use crate::agent::router::StrategyRouter;
use crate::agent::strategy::{Query, StrategyId, StrategyResult};
use crate::cli::output::{OutputFormat, format_comparison, format_result, format_strategies};
use crate::cli::parser::{BackendArgs, Cli, Commands};
use crate::error::{AgentError, CommandError, Result};

/// Executes the CLI command.
///
/// # Arguments
///
/// * `cli` - Parsed CLI arguments.
///
/// # Returns
///
/// Result with output string on success.
///
/// # Errors
///
/// Returns an error if configuration is incomplete or a backend cannot
/// be created. Strategy failures are reported in the output, not here.
pub fn execute(cli: &Cli) -> Result<String> {
    let format = OutputFormat::parse(&cli.format);

    match &cli.command {
        Commands::Run {
            query,
            strategy,
            history,
            backend,
            budget,
        } => cmd_run(
            query,
            *strategy,
            history.as_deref(),
            backend,
            &budget.to_run_config(),
            format,
            cli.verbose,
        ),
        Commands::Compare {
            query,
            strategies,
            models,
            history,
            backend,
            budget,
        } => cmd_compare(
            query,
            strategies,
            models,
            history.as_deref(),
            backend,
            &budget.to_run_config(),
            format,
        ),
        Commands::InitPrompts { dir } => cmd_init_prompts(dir.as_deref(), format),
        Commands::Strategies => cmd_strategies(format),
    }
}

/// Builds backend configuration, letting flags override the environment.
fn build_config(backend: &BackendArgs) -> Result<AgentConfig> {
    let mut builder = AgentConfig::builder();
    if let Some(provider) = &backend.provider {
        builder = builder.provider(provider);
    }
    if let Some(model) = &backend.model {
        builder = builder.model(model);
    }
    if let Some(url) = &backend.base_url {
        builder = builder.base_url(url);
    }
    if let Some(temperature) = backend.temperature {
        builder = builder.temperature(temperature);
    }
    if let Some(n) = backend.max_tokens {
        builder = builder.max_tokens(n);
    }
    if let Some(secs) = backend.timeout {
        builder = builder.timeout(Duration::from_secs(secs));
    }
    if let Some(n) = backend.search_results {
        builder = builder.search_max_results(n);
    }
    if let Some(dir) = &backend.prompt_dir {
        builder = builder.prompt_dir(dir);
    }
    Ok(builder.from_env().build()?)
}

/// Reads prior conversation turns from a JSON file.
fn load_history(path: &Path) -> Result<Vec<ChatMessage>> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        CommandError::InvalidArgument(format!(
            "Failed to read history file {}: {e}",
            path.display()
        ))
    })?;
    let history: Vec<ChatMessage> = serde_json::from_str(&content).map_err(|e| {
        CommandError::InvalidArgument(format!(
            "History file {} is not a JSON message list: {e}",
            path.display()
        ))
    })?;
    Ok(history)
}

fn build_query(text: &str, history: Option<&Path>) -> Result<Query> {
    let query = Query::new(text)?;
    match history {
        Some(path) => Ok(query.with_history(load_history(path)?)),
        None => Ok(query),
    }
}

fn create_runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Runtime::new().map_err(|e| {
        CommandError::ExecutionFailed(format!("Failed to create async runtime: {e}")).into()
    })
}

/// Cancels `cancel` on Ctrl-C. Must be called inside the runtime.
fn spawn_interrupt_watcher(cancel: &CancellationToken) -> tokio::task::JoinHandle<()> {
    let cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, cancelling");
            cancel.cancel();
        }
    })
}

fn cmd_run(
    text: &str,
    strategy: StrategyId,
    history: Option<&Path>,
    backend: &BackendArgs,
    run_config: &RunConfig,
    format: OutputFormat,
    verbose: bool,
) -> Result<String> {
    run_config.validate()?;
    let query = build_query(text, history)?;
    let config = build_config(backend)?;

    let rt = create_runtime()?;
    let result = rt.block_on(async {
        let router = StrategyRouter::from_config(&config)?;
        let cancel = CancellationToken::new();
        let watcher = spawn_interrupt_watcher(&cancel);
        let result = router
            .run_with_cancel(strategy, &query, run_config, &cancel)
            .await;
        watcher.abort();
        result
    })?;

    match format {
        OutputFormat::Text => Ok(format_result(&result, verbose)),
        OutputFormat::Json => Ok(format.to_json(&result)?),
    }
}

fn cmd_compare(
    text: &str,
    strategies: &[StrategyId],
    models: &[String],
    history: Option<&Path>,
    backend: &BackendArgs,
    run_config: &RunConfig,
    format: OutputFormat,
) -> Result<String> {
    run_config.validate()?;
    let query = build_query(text, history)?;
    let config = build_config(backend)?;

    let strategies: Vec<StrategyId> = if strategies.is_empty() {
        StrategyId::ALL.to_vec()
    } else {
        strategies.to_vec()
    };
    let models: Vec<String> = if models.is_empty() {
        vec![config.model.clone()]
    } else {
        models
            .iter()
            .map(|m| resolve_model_alias(m.trim()).to_string())
            .collect()
    };

    let rt = create_runtime()?;
    let results = rt.block_on(async {
        let router = StrategyRouter::from_config(&config)?;
        let token = CancellationToken::new();
        let watcher = spawn_interrupt_watcher(&token);

        let (query, cancel) = (&query, &token);
        let runs = models.iter().flat_map(|model| {
            let router = router.with_model(model.clone());
            strategies.iter().map(move |&strategy| {
                let router = router.clone();
                async move {
                    router
                        .run_with_cancel(strategy, query, run_config, cancel)
                        .await
                }
            })
        });
        let outcomes = join_all(runs).await;
        watcher.abort();
        outcomes
            .into_iter()
            .collect::<std::result::Result<Vec<StrategyResult>, AgentError>>()
    })?;

    match format {
        OutputFormat::Text => Ok(format_comparison(&results)),
        OutputFormat::Json => Ok(format.to_json(&results)?),
    }
}

fn cmd_init_prompts(dir: Option<&Path>, format: OutputFormat) -> Result<String> {
    let target_dir = dir
        .map(Path::to_path_buf)
        .or_else(PromptSet::default_dir)
        .ok_or_else(|| {
            CommandError::ExecutionFailed(
                "Could not determine home directory for default prompt path".to_string(),
            )
        })?;

    let written = PromptSet::write_defaults(&target_dir).map_err(|e| {
        CommandError::ExecutionFailed(format!("Failed to write prompt templates: {e}"))
    })?;

    match format {
        OutputFormat::Text => {
            if written.is_empty() {
                return Ok(format!(
                    "All prompt templates already exist in: {}\n",
                    target_dir.display()
                ));
            }
            let mut output = format!(
                "Wrote {} prompt template(s) to: {}\n",
                written.len(),
                target_dir.display()
            );
            for path in &written {
                output.push_str(&format!(
                    "  {}\n",
                    path.file_name()
                        .and_then(|n| n.to_str())
                        .unwrap_or("unknown")
                ));
            }
            output.push_str("\nEdit these files to customize prompts; bump VERSION when you do.\n");
            Ok(output)
        }
        OutputFormat::Json => {
            let json = serde_json::json!({
                "directory": target_dir.to_string_lossy(),
                "written": written.iter().map(|p| p.to_string_lossy().into_owned()).collect::<Vec<_>>(),
                "count": written.len()
            });
            Ok(format.to_json(&json)?)
        }
    }
}

fn cmd_strategies(format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Text => Ok(format_strategies()),
        OutputFormat::Json => {
            let json: Vec<_> = StrategyId::ALL
                .iter()
                .map(|id| {
                    serde_json::json!({
                        "id": id.as_str(),
                        "description": id.description(),
                    })
                })
                .collect();
            Ok(format.to_json(&json)?)
        }
    }
}
