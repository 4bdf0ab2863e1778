//! Command-line argument parsing.
//!
//! Defines the CLI structure using clap derive macros.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::agent::config::{
    DEFAULT_MAX_MALFORMED, DEFAULT_MAX_SNIPPET_CHARS, DEFAULT_MAX_SNIPPETS,
    DEFAULT_MAX_TOOL_FAILURES, DEFAULT_MAX_TURNS, RunConfig,
};
use crate::agent::strategy::StrategyId;

/// search-agent: strategy-routed, search-augmented reasoning agent.
///
/// Answers questions by combining a language model with web search,
/// using one of several reasoning strategies.
#[derive(Parser, Debug)]
#[command(name = "search-agent")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output (debug logging, full transcripts).
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format (text, json).
    #[arg(long, default_value = "text", global = true)]
    pub format: String,

    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Answer a query with one strategy.
    #[command(after_help = r#"Examples:
  search-agent run "Who won the 2018 World Cup?"
  search-agent run --strategy simple_search "capital of France"
  search-agent run --model llama --provider huggingface "..."
  search-agent --format json run --max-turns 4 "..." | jq .status
"#)]
    Run {
        /// The question to answer.
        query: String,

        /// Strategy to run.
        #[arg(short, long, value_enum, default_value_t = StrategyId::SearchAgent)]
        strategy: StrategyId,

        /// JSON file with prior conversation turns
        /// (`[{"role": "user", "content": "..."}, ...]`).
        #[arg(long)]
        history: Option<PathBuf>,

        /// Backend options.
        #[command(flatten)]
        backend: BackendArgs,

        /// Per-invocation budgets.
        #[command(flatten)]
        budget: BudgetArgs,
    },

    /// Run several strategies and models on one query and compare.
    ///
    /// All combinations run concurrently against shared backends.
    #[command(after_help = r#"Examples:
  search-agent compare "Who won the 2018 World Cup?"
  search-agent compare --strategies simple_search,search_agent --models gemma,llama "..."
"#)]
    Compare {
        /// The question to answer.
        query: String,

        /// Strategies to compare (comma-separated). Defaults to all.
        #[arg(long, value_enum, value_delimiter = ',')]
        strategies: Vec<StrategyId>,

        /// Models to compare (comma-separated, aliases allowed).
        /// Defaults to the configured model.
        #[arg(long, value_delimiter = ',')]
        models: Vec<String>,

        /// JSON file with prior conversation turns.
        #[arg(long)]
        history: Option<PathBuf>,

        /// Backend options.
        #[command(flatten)]
        backend: BackendArgs,

        /// Per-invocation budgets.
        #[command(flatten)]
        budget: BudgetArgs,
    },

    /// Write the default prompt templates for customization.
    ///
    /// Existing files are left untouched.
    InitPrompts {
        /// Target directory for prompt templates.
        ///
        /// Defaults to `~/.config/search-agent/prompts/`.
        #[arg(long)]
        dir: Option<PathBuf>,
    },

    /// List the available strategies.
    Strategies,
}

/// Backend selection shared by `run` and `compare`.
///
/// API keys are read from the environment only (`OPENAI_API_KEY`,
/// `HF_TOKEN`, `SEARCH_AGENT_API_KEY`, `TAVILY_API_KEY`).
#[derive(Args, Debug, Clone, Default)]
pub struct BackendArgs {
    /// LLM provider: openai or huggingface.
    #[arg(long, env = "SEARCH_AGENT_PROVIDER")]
    pub provider: Option<String>,

    /// Model id or alias (gemma, llama, mistral).
    #[arg(short, long, env = "SEARCH_AGENT_MODEL")]
    pub model: Option<String>,

    /// Base URL of an OpenAI-compatible endpoint.
    #[arg(long, env = "SEARCH_AGENT_BASE_URL")]
    pub base_url: Option<String>,

    /// Sampling temperature (0.0-2.0).
    #[arg(long)]
    pub temperature: Option<f32>,

    /// Maximum tokens per completion.
    #[arg(long)]
    pub max_tokens: Option<u32>,

    /// Request timeout in seconds.
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Search results requested per call.
    #[arg(long)]
    pub search_results: Option<usize>,

    /// Directory containing prompt template files.
    #[arg(long, env = "SEARCH_AGENT_PROMPT_DIR")]
    pub prompt_dir: Option<PathBuf>,
}

/// Budgets of one invocation.
#[derive(Args, Debug, Clone)]
pub struct BudgetArgs {
    /// Maximum Action/Observation turns.
    #[arg(long, default_value_t = DEFAULT_MAX_TURNS)]
    pub max_turns: usize,

    /// Snippets kept per observation.
    #[arg(long, default_value_t = DEFAULT_MAX_SNIPPETS)]
    pub max_snippets: usize,

    /// Characters kept per snippet.
    #[arg(long, default_value_t = DEFAULT_MAX_SNIPPET_CHARS)]
    pub max_snippet_chars: usize,

    /// Consecutive search failures tolerated before aborting.
    #[arg(long, default_value_t = DEFAULT_MAX_TOOL_FAILURES)]
    pub max_tool_failures: usize,

    /// Consecutive malformed model replies that abort the run.
    #[arg(long, default_value_t = DEFAULT_MAX_MALFORMED)]
    pub max_malformed: usize,

    /// Ask the model for a final answer when the turn budget runs out.
    #[arg(long)]
    pub final_answer_on_budget: bool,
}

impl BudgetArgs {
    /// Converts to a [`RunConfig`].
    #[must_use]
    pub const fn to_run_config(&self) -> RunConfig {
        RunConfig {
            max_turns: self.max_turns,
            max_snippets_per_observation: self.max_snippets,
            max_snippet_chars: self.max_snippet_chars,
            max_consecutive_tool_failures: self.max_tool_failures,
            max_consecutive_malformed_responses: self.max_malformed,
            final_answer_on_budget: self.final_answer_on_budget,
        }
    }
}
