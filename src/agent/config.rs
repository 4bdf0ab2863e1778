//! Agent configuration with builder pattern and environment variable support.
//!
//! Two layers of configuration exist:
//!
//! - [`AgentConfig`] describes the backends (model provider, search provider,
//!   credentials) and is resolved explicit value → environment → default.
//! - [`RunConfig`] holds the per-invocation budgets of one strategy run.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::AgentError;

/// Default request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 60;
/// Default maximum tokens per completion.
const DEFAULT_MAX_TOKENS: u32 = 1024;
/// Default sampling temperature.
const DEFAULT_TEMPERATURE: f32 = 0.0;
/// Default number of results requested from the search provider.
const DEFAULT_SEARCH_MAX_RESULTS: usize = 5;
/// Default model for `OpenAI`.
const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
/// Default model for the Hugging Face router.
const DEFAULT_HUGGINGFACE_MODEL: &str = "meta-llama/Meta-Llama-3-8B-Instruct";

/// OpenAI-compatible endpoint of the Hugging Face inference router.
pub const HUGGINGFACE_BASE_URL: &str = "https://router.huggingface.co/v1";

/// Default maximum Action/Observation turns per invocation.
pub const DEFAULT_MAX_TURNS: usize = 8;
/// Default number of snippets kept per observation.
pub const DEFAULT_MAX_SNIPPETS: usize = 5;
/// Default per-snippet character limit.
pub const DEFAULT_MAX_SNIPPET_CHARS: usize = 800;
/// Default consecutive tool failures tolerated before aborting.
pub const DEFAULT_MAX_TOOL_FAILURES: usize = 3;
/// Default consecutive malformed responses that abort the loop.
pub const DEFAULT_MAX_MALFORMED: usize = 2;

/// Short model names accepted in place of full model ids.
const MODEL_ALIASES: &[(&str, &str)] = &[
    ("gemma", "google/gemma-2-2b-it"),
    ("llama", "meta-llama/Meta-Llama-3-8B-Instruct"),
    ("mistral", "mistralai/Mistral-7B-Instruct-v0.3"),
];

/// Resolves a model alias (`gemma`, `llama`, `mistral`) to its full id.
///
/// Anything that is not an alias is returned unchanged.
#[must_use]
pub fn resolve_model_alias(model: &str) -> &str {
    MODEL_ALIASES
        .iter()
        .find(|(alias, _)| alias.eq_ignore_ascii_case(model))
        .map_or(model, |(_, id)| id)
}

/// Backend configuration for the agent system.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// LLM provider name ("openai" or "huggingface").
    pub provider: String,
    /// API key for the provider.
    pub api_key: String,
    /// Optional base URL override (for proxies or compatible APIs).
    pub base_url: Option<String>,
    /// Model identifier, aliases already resolved.
    pub model: String,
    /// Sampling temperature.
    pub temperature: f32,
    /// Maximum tokens per completion.
    pub max_tokens: u32,
    /// Request timeout, applied to model and search calls alike.
    pub timeout: Duration,
    /// Search provider name ("tavily").
    pub search_provider: String,
    /// API key for the search provider.
    pub search_api_key: Option<String>,
    /// Results requested per search call.
    pub search_max_results: usize,
    /// Directory containing prompt template files.
    pub prompt_dir: Option<PathBuf>,
}

impl AgentConfig {
    /// Creates a new builder for `AgentConfig`.
    #[must_use]
    pub fn builder() -> AgentConfigBuilder {
        AgentConfigBuilder::default()
    }

    /// Creates configuration from environment variables with defaults.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::ApiKeyMissing`] if no API key is found.
    pub fn from_env() -> Result<Self, AgentError> {
        Self::builder().from_env().build()
    }
}

/// Builder for [`AgentConfig`].
#[derive(Debug, Clone, Default)]
pub struct AgentConfigBuilder {
    provider: Option<String>,
    api_key: Option<String>,
    base_url: Option<String>,
    model: Option<String>,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
    timeout: Option<Duration>,
    search_provider: Option<String>,
    search_api_key: Option<String>,
    search_max_results: Option<usize>,
    prompt_dir: Option<PathBuf>,
}

impl AgentConfigBuilder {
    /// Populates unset fields from environment variables.
    ///
    /// The API key is looked up according to the provider: `HF_TOKEN` for
    /// `huggingface`, `OPENAI_API_KEY` otherwise, with
    /// `SEARCH_AGENT_API_KEY` as a fallback for both.
    #[must_use]
    pub fn from_env(mut self) -> Self {
        if self.provider.is_none() {
            self.provider = std::env::var("SEARCH_AGENT_PROVIDER").ok();
        }
        if self.api_key.is_none() {
            let primary = if self.provider.as_deref() == Some("huggingface") {
                "HF_TOKEN"
            } else {
                "OPENAI_API_KEY"
            };
            self.api_key = std::env::var(primary)
                .or_else(|_| std::env::var("SEARCH_AGENT_API_KEY"))
                .ok()
                .filter(|k| !k.trim().is_empty());
        }
        if self.base_url.is_none() {
            self.base_url = std::env::var("SEARCH_AGENT_BASE_URL").ok();
        }
        if self.model.is_none() {
            self.model = std::env::var("SEARCH_AGENT_MODEL").ok();
        }
        if self.search_api_key.is_none() {
            self.search_api_key = std::env::var("TAVILY_API_KEY")
                .ok()
                .filter(|k| !k.trim().is_empty());
        }
        if self.prompt_dir.is_none() {
            self.prompt_dir = std::env::var("SEARCH_AGENT_PROMPT_DIR")
                .ok()
                .map(PathBuf::from);
        }
        self
    }

    /// Sets the LLM provider name.
    #[must_use]
    pub fn provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    /// Sets the API key.
    #[must_use]
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Sets the base URL override.
    #[must_use]
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Sets the model (aliases are resolved at build time).
    #[must_use]
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Sets the sampling temperature.
    #[must_use]
    pub const fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Sets the maximum tokens per completion.
    #[must_use]
    pub const fn max_tokens(mut self, n: u32) -> Self {
        self.max_tokens = Some(n);
        self
    }

    /// Sets the request timeout.
    #[must_use]
    pub const fn timeout(mut self, duration: Duration) -> Self {
        self.timeout = Some(duration);
        self
    }

    /// Sets the search provider name.
    #[must_use]
    pub fn search_provider(mut self, provider: impl Into<String>) -> Self {
        self.search_provider = Some(provider.into());
        self
    }

    /// Sets the search provider API key.
    #[must_use]
    pub fn search_api_key(mut self, key: impl Into<String>) -> Self {
        self.search_api_key = Some(key.into());
        self
    }

    /// Sets the number of results requested per search call.
    #[must_use]
    pub const fn search_max_results(mut self, n: usize) -> Self {
        self.search_max_results = Some(n);
        self
    }

    /// Sets the prompt template directory.
    #[must_use]
    pub fn prompt_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.prompt_dir = Some(dir.into());
        self
    }

    /// Builds the [`AgentConfig`].
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::ApiKeyMissing`] if no API key was set, or
    /// [`AgentError::InvalidConfig`] for out-of-range values.
    pub fn build(self) -> Result<AgentConfig, AgentError> {
        let provider = self.provider.unwrap_or_else(|| "openai".to_string());
        let api_key = self
            .api_key
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| AgentError::ApiKeyMissing {
                provider: provider.clone(),
            })?;

        let temperature = self.temperature.unwrap_or(DEFAULT_TEMPERATURE);
        if !(0.0..=2.0).contains(&temperature) {
            return Err(AgentError::InvalidConfig {
                message: format!("temperature {temperature} outside 0.0..=2.0"),
            });
        }
        let search_max_results = self
            .search_max_results
            .unwrap_or(DEFAULT_SEARCH_MAX_RESULTS);
        if search_max_results == 0 {
            return Err(AgentError::InvalidConfig {
                message: "search_max_results must be at least 1".to_string(),
            });
        }

        let is_huggingface = provider == "huggingface";
        let model = self.model.unwrap_or_else(|| {
            if is_huggingface {
                DEFAULT_HUGGINGFACE_MODEL.to_string()
            } else {
                DEFAULT_OPENAI_MODEL.to_string()
            }
        });
        let base_url = self
            .base_url
            .or_else(|| is_huggingface.then(|| HUGGINGFACE_BASE_URL.to_string()));

        Ok(AgentConfig {
            model: resolve_model_alias(&model).to_string(),
            provider,
            api_key,
            base_url,
            temperature,
            max_tokens: self.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            timeout: self
                .timeout
                .unwrap_or(Duration::from_secs(DEFAULT_TIMEOUT_SECS)),
            search_provider: self
                .search_provider
                .unwrap_or_else(|| "tavily".to_string()),
            search_api_key: self.search_api_key,
            search_max_results,
            prompt_dir: self.prompt_dir,
        })
    }
}

/// Budgets for a single strategy invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunConfig {
    /// Maximum Action/Observation turns.
    pub max_turns: usize,
    /// Snippets kept per observation, highest ranked first.
    pub max_snippets_per_observation: usize,
    /// Per-snippet character limit, in graphemes.
    pub max_snippet_chars: usize,
    /// Consecutive tool failures tolerated; one more aborts the run.
    pub max_consecutive_tool_failures: usize,
    /// Consecutive malformed responses at which the run aborts.
    pub max_consecutive_malformed_responses: usize,
    /// Ask the model for a final answer when the turn budget runs out.
    pub final_answer_on_budget: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            max_turns: DEFAULT_MAX_TURNS,
            max_snippets_per_observation: DEFAULT_MAX_SNIPPETS,
            max_snippet_chars: DEFAULT_MAX_SNIPPET_CHARS,
            max_consecutive_tool_failures: DEFAULT_MAX_TOOL_FAILURES,
            max_consecutive_malformed_responses: DEFAULT_MAX_MALFORMED,
            final_answer_on_budget: false,
        }
    }
}

impl RunConfig {
    /// Sets the maximum number of turns.
    #[must_use]
    pub const fn with_max_turns(mut self, n: usize) -> Self {
        self.max_turns = n;
        self
    }

    /// Sets the snippets kept per observation.
    #[must_use]
    pub const fn with_max_snippets(mut self, n: usize) -> Self {
        self.max_snippets_per_observation = n;
        self
    }

    /// Sets the per-snippet character limit.
    #[must_use]
    pub const fn with_max_snippet_chars(mut self, n: usize) -> Self {
        self.max_snippet_chars = n;
        self
    }

    /// Sets the tolerated consecutive tool failures.
    #[must_use]
    pub const fn with_max_tool_failures(mut self, n: usize) -> Self {
        self.max_consecutive_tool_failures = n;
        self
    }

    /// Sets the consecutive malformed responses that abort the run.
    #[must_use]
    pub const fn with_max_malformed(mut self, n: usize) -> Self {
        self.max_consecutive_malformed_responses = n;
        self
    }

    /// Enables or disables the budget summary call.
    #[must_use]
    pub const fn with_final_answer_on_budget(mut self, enabled: bool) -> Self {
        self.final_answer_on_budget = enabled;
        self
    }

    /// Checks that the budgets are usable.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::InvalidConfig`] when a limit that must be
    /// positive is zero.
    pub fn validate(&self) -> Result<(), AgentError> {
        let checks = [
            (
                self.max_snippets_per_observation,
                "max_snippets_per_observation",
            ),
            (self.max_snippet_chars, "max_snippet_chars"),
            (
                self.max_consecutive_malformed_responses,
                "max_consecutive_malformed_responses",
            ),
        ];
        for (value, name) in checks {
            if value == 0 {
                return Err(AgentError::InvalidConfig {
                    message: format!("{name} must be at least 1"),
                });
            }
        }
        Ok(())
    }
}
