//! Error types for search-agent-rs.
//!
//! Failures are split by who can act on them:
//!
//! - [`GenerationError`] comes out of the language model adapter and is
//!   fatal to the current turn.
//! - [`SearchFailure`] comes out of the search adapter and is never raised;
//!   it travels inside [`ToolResult::Failure`](crate::search::ToolResult)
//!   so the reasoning loop can show it to the model.
//! - [`AgentError`] covers construction and caller contract violations
//!   (missing keys, unknown providers, empty queries) and fails fast.
//! - [`CommandError`] is raised by the CLI layer.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type.
#[derive(Debug, Error)]
pub enum Error {
    /// Agent configuration or contract error.
    #[error(transparent)]
    Agent(#[from] AgentError),

    /// CLI command error.
    #[error(transparent)]
    Command(#[from] CommandError),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors raised while building or invoking the agent.
#[derive(Debug, Error)]
pub enum AgentError {
    /// No API key was configured for the named provider.
    #[error("API key missing for {provider}: set it via flag or environment")]
    ApiKeyMissing {
        /// Provider that needs the key.
        provider: String,
    },

    /// Unknown language model provider name.
    #[error("unsupported LLM provider: {name}")]
    UnsupportedProvider {
        /// Provider name as given.
        name: String,
    },

    /// Unknown search provider name.
    #[error("unsupported search provider: {name}")]
    UnsupportedSearchProvider {
        /// Provider name as given.
        name: String,
    },

    /// Strategy id outside the closed set.
    #[error("unknown strategy '{id}' (expected simple_search, rewrite_react_search or search_agent)")]
    UnknownStrategy {
        /// Strategy id as given.
        id: String,
    },

    /// Query text is empty after trimming.
    #[error("query cannot be empty")]
    EmptyQuery,

    /// Configuration value out of range or inconsistent.
    #[error("invalid configuration: {message}")]
    InvalidConfig {
        /// Description of the problem.
        message: String,
    },

    /// HTTP client construction failed.
    #[error("HTTP client error: {message}")]
    HttpClient {
        /// Underlying error text.
        message: String,
    },
}

/// Failure of the language model adapter.
///
/// Context-length overflow is reported as its own variant so the owning
/// strategy can decide what to do; the adapter never truncates input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerationError {
    /// Backend unreachable, erroring, or returning an unusable response.
    #[error("model backend unavailable: {message}")]
    Unavailable {
        /// Provider error text.
        message: String,
    },

    /// Request did not complete within the configured timeout.
    #[error("model request timed out after {seconds}s")]
    Timeout {
        /// Timeout that elapsed.
        seconds: u64,
    },

    /// Prompt exceeds the model's context window.
    #[error("context length exceeded: {message}")]
    ContextLengthExceeded {
        /// Provider error text.
        message: String,
    },

    /// Request or completion rejected by a content filter.
    #[error("content filtered: {message}")]
    ContentFiltered {
        /// Provider error text.
        message: String,
    },
}

/// Normalized failure of the search adapter.
///
/// Every provider-specific error maps onto one of these; the display form
/// is what the model sees in the failure observation.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SearchFailure {
    /// Query was empty after trimming; no request was sent.
    #[error("search query is empty")]
    EmptyQuery,

    /// Provider did not answer in time.
    #[error("search provider timed out")]
    Timeout,

    /// Provider rejected the request due to rate limiting.
    #[error("search provider rate limit reached")]
    RateLimited,

    /// Provider answered with a body that could not be decoded.
    #[error("malformed search response: {message}")]
    Malformed {
        /// Decode error text.
        message: String,
    },

    /// Any other provider-side error.
    #[error("search provider error{}: {message}", status.map_or_else(String::new, |s| format!(" (HTTP {s})")))]
    Provider {
        /// HTTP status, if one was received.
        status: Option<u16>,
        /// Provider error text.
        message: String,
    },
}

/// Errors raised by CLI commands.
#[derive(Debug, Error)]
pub enum CommandError {
    /// Invalid argument value.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Command failed while executing.
    #[error("command failed: {0}")]
    ExecutionFailed(String),
}
