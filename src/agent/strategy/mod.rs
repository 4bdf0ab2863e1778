//! Reasoning strategies.
//!
//! The strategy set is closed: [`StrategyId`] names every variant and the
//! router dispatches on it with a `match`. All strategies share the same
//! contract (query and budgets in, [`StrategyResult`] out) and the same
//! [`Runner`], which owns the two suspension points of an invocation: the
//! model call and the search call. Both race against the invocation's
//! cancellation token.

pub mod react;
pub mod rewrite;
pub mod simple;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use super::config::{AgentConfig, RunConfig};
use super::message::{ChatMessage, ChatRequest, ChatResponse, StopReason};
use super::prompt::{PromptSet, format_snippets};
use super::provider::LlmProvider;
use super::transcript::{Step, Transcript};
use crate::error::{AgentError, GenerationError};
use crate::search::{SearchTool, ToolResult, bound_snippets};

/// Answer used when no better text is available.
pub const UNABLE_TO_DETERMINE: &str =
    "Unable to determine an answer within the allotted search steps.";

/// Stop sequence sent with Reason-Act requests.
const OBSERVATION_STOP: &str = "Observation:";

/// Identifier of a reasoning strategy.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
#[value(rename_all = "snake_case")]
pub enum StrategyId {
    /// One search, one answer.
    SimpleSearch,
    /// Rewrite the query, then run the Reason-Act loop.
    RewriteReactSearch,
    /// Full Reason-Act loop.
    SearchAgent,
}

impl StrategyId {
    /// Every strategy, in display order.
    pub const ALL: [Self; 3] = [Self::SimpleSearch, Self::RewriteReactSearch, Self::SearchAgent];

    /// Stable string id.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SimpleSearch => "simple_search",
            Self::RewriteReactSearch => "rewrite_react_search",
            Self::SearchAgent => "search_agent",
        }
    }

    /// One-line description.
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::SimpleSearch => "one search call, one model call, no iteration",
            Self::RewriteReactSearch => {
                "rewrite the query for search, then reason and search iteratively"
            }
            Self::SearchAgent => "reason and search iteratively until a final answer",
        }
    }
}

impl fmt::Display for StrategyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StrategyId {
    type Err = AgentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|id| id.as_str() == s.trim())
            .ok_or_else(|| AgentError::UnknownStrategy { id: s.to_string() })
    }
}

/// A query plus the caller's prior conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Query {
    text: String,
    #[serde(default)]
    history: Vec<ChatMessage>,
}

impl Query {
    /// Creates a query.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::EmptyQuery`] if `text` is blank.
    pub fn new(text: impl Into<String>) -> Result<Self, AgentError> {
        let text = text.into();
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(AgentError::EmptyQuery);
        }
        Ok(Self {
            text: trimmed.to_string(),
            history: Vec::new(),
        })
    }

    /// Attaches prior conversation turns.
    #[must_use]
    pub fn with_history(mut self, history: Vec<ChatMessage>) -> Self {
        self.history = history;
        self
    }

    /// Query text.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Prior conversation turns.
    #[must_use]
    pub fn history(&self) -> &[ChatMessage] {
        &self.history
    }
}

/// Why an invocation ended without a usable answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AbortReason {
    /// The model backend failed.
    #[error("generation error: {message}")]
    GenerationError {
        /// Error text.
        message: String,
    },
    /// The model kept ignoring the structured format.
    #[error("model output could not be parsed")]
    UnparsableOutput,
    /// Too many consecutive search failures.
    #[error("search tool unavailable")]
    ToolUnavailable,
    /// The caller cancelled the invocation.
    #[error("cancelled")]
    Cancelled,
}

/// Terminal status of an invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum StrategyStatus {
    /// A final answer was produced.
    Completed,
    /// The turn budget ran out; the answer is best effort.
    BudgetExhausted,
    /// The invocation was aborted.
    Failed(AbortReason),
}

impl StrategyStatus {
    /// Short label for tables and logs.
    #[must_use]
    pub fn label(&self) -> String {
        match self {
            Self::Completed => "completed".to_string(),
            Self::BudgetExhausted => "budget_exhausted".to_string(),
            Self::Failed(reason) => format!("failed ({reason})"),
        }
    }
}

/// Everything an invocation produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyResult {
    /// Answer text; empty when the invocation failed.
    pub answer: String,
    /// Complete transcript, partial when aborted.
    pub transcript: Transcript,
    /// Terminal status.
    pub status: StrategyStatus,
    /// Strategy that ran.
    pub strategy: StrategyId,
    /// Model that ran.
    pub model: String,
    /// Version of the prompt set used.
    pub prompt_version: String,
    /// Wall-clock duration in milliseconds.
    pub elapsed_ms: u64,
}

/// How a strategy ended, before timing and labels are attached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Termination {
    /// Terminal status.
    pub status: StrategyStatus,
    /// Answer text.
    pub answer: String,
}

impl Termination {
    pub(crate) fn completed(answer: impl Into<String>) -> Self {
        Self {
            status: StrategyStatus::Completed,
            answer: answer.into(),
        }
    }

    pub(crate) fn budget_exhausted(answer: impl Into<String>) -> Self {
        Self {
            status: StrategyStatus::BudgetExhausted,
            answer: answer.into(),
        }
    }

    pub(crate) const fn aborted(reason: AbortReason) -> Self {
        Self {
            status: StrategyStatus::Failed(reason),
            answer: String::new(),
        }
    }

    pub(crate) fn generation_failed(error: &GenerationError) -> Self {
        Self::aborted(AbortReason::GenerationError {
            message: error.to_string(),
        })
    }
}

/// Model settings applied to every request of an invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationSettings {
    /// Model identifier.
    pub model: String,
    /// Sampling temperature.
    pub temperature: Option<f32>,
    /// Maximum tokens per completion.
    pub max_tokens: Option<u32>,
}

impl GenerationSettings {
    /// Settings for `model` with provider defaults.
    #[must_use]
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            temperature: None,
            max_tokens: None,
        }
    }
}

impl From<&AgentConfig> for GenerationSettings {
    fn from(config: &AgentConfig) -> Self {
        Self {
            model: config.model.clone(),
            temperature: Some(config.temperature),
            max_tokens: Some(config.max_tokens),
        }
    }
}

/// Why a suspension point did not produce a value.
#[derive(Debug)]
pub(crate) enum Interrupt {
    Cancelled,
    Generation(GenerationError),
}

/// Shared collaborators of one invocation.
pub(crate) struct Runner<'a> {
    pub provider: &'a dyn LlmProvider,
    pub tool: &'a dyn SearchTool,
    pub prompts: &'a PromptSet,
    pub generation: &'a GenerationSettings,
    pub config: &'a RunConfig,
    pub cancel: &'a CancellationToken,
}

impl Runner<'_> {
    /// Calls the model; `react` adds the observation stop sequence.
    ///
    /// A reply cut at the token limit is returned as is and logged.
    pub async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        react: bool,
    ) -> Result<ChatResponse, Interrupt> {
        let mut request = ChatRequest::new(self.generation.model.clone(), messages);
        request.temperature = self.generation.temperature;
        request.max_tokens = self.generation.max_tokens;
        if react {
            request.stop = vec![OBSERVATION_STOP.to_string()];
        }

        let response = tokio::select! {
            biased;
            () = self.cancel.cancelled() => return Err(Interrupt::Cancelled),
            result = self.provider.complete(&request) => result.map_err(Interrupt::Generation)?,
        };
        if response.stop_reason == StopReason::Length {
            tracing::warn!(
                model = %self.generation.model,
                max_tokens = ?self.generation.max_tokens,
                "model reply truncated at the token limit"
            );
        }
        Ok(response)
    }

    /// Runs one search; `None` when cancelled first.
    pub async fn search(&self, query: &str) -> Option<ToolResult> {
        tokio::select! {
            biased;
            () = self.cancel.cancelled() => None,
            result = self.tool.search(query) => Some(result),
        }
    }

    /// Builds the observation step for a search result.
    pub fn observation(&self, result: &ToolResult) -> Step {
        match result {
            ToolResult::Success(snippets) => {
                let bounded = bound_snippets(
                    snippets,
                    self.config.max_snippets_per_observation,
                    self.config.max_snippet_chars,
                );
                Step::observation(format_snippets(&bounded))
            }
            ToolResult::Failure(failure) => Step::error_observation(format!(
                "Search failed: {failure}. Try a different or simpler query."
            )),
        }
    }
}

/// Records a cancelled search so the pending action keeps its observation.
pub(crate) fn record_cancelled_search(transcript: &mut Transcript) -> Termination {
    transcript.append(Step::error_observation("Search cancelled."));
    Termination::aborted(AbortReason::Cancelled)
}
