//! Search Tool Adapter.
//!
//! A [`SearchTool`] takes a query string and returns ranked text snippets
//! with source identifiers. Provider errors never escape as `Err`: every
//! adapter folds them into [`ToolResult::Failure`] with a normalized
//! [`SearchFailure`], so strategies handle a single failure case and show
//! it to the model as an observation.

#[cfg(feature = "tavily")]
pub mod tavily;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use unicode_segmentation::UnicodeSegmentation;

use crate::agent::config::AgentConfig;
use crate::error::{AgentError, SearchFailure};

#[cfg(feature = "tavily")]
pub use tavily::TavilySearch;

/// Name under which the search tool is exposed to the model.
pub const SEARCH_TOOL_NAME: &str = "search";

/// Suffix appended to truncated snippet text.
const ELLIPSIS: &str = "...";

/// One ranked search hit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snippet {
    /// Snippet text.
    pub text: String,
    /// Source identifier (usually a URL).
    pub source: String,
}

impl Snippet {
    /// Creates a snippet.
    #[must_use]
    pub fn new(text: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            source: source.into(),
        }
    }
}

/// Outcome of one search call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "value", rename_all = "snake_case")]
pub enum ToolResult {
    /// Snippets in rank order, best first.
    Success(Vec<Snippet>),
    /// Normalized provider failure.
    Failure(SearchFailure),
}

impl ToolResult {
    /// Returns `true` for [`ToolResult::Failure`].
    #[must_use]
    pub const fn is_failure(&self) -> bool {
        matches!(self, Self::Failure(_))
    }
}

/// External search capability.
///
/// Implementations make exactly one outbound request per call, never retry,
/// and are safe to share across concurrent invocations.
#[async_trait]
pub trait SearchTool: Send + Sync {
    /// Provider name (e.g., `"tavily"`).
    fn name(&self) -> &'static str;

    /// Runs `query` against the provider.
    ///
    /// An empty (after trimming) query yields
    /// `ToolResult::Failure(SearchFailure::EmptyQuery)` without any request.
    async fn search(&self, query: &str) -> ToolResult;
}

/// Creates a [`SearchTool`] from the configured search provider.
///
/// # Errors
///
/// Returns [`AgentError::ApiKeyMissing`] when the provider needs a key that
/// is not configured, [`AgentError::UnsupportedSearchProvider`] for unknown
/// names, and [`AgentError::HttpClient`] if the HTTP client cannot be built.
pub fn create_search_tool(config: &AgentConfig) -> Result<Arc<dyn SearchTool>, AgentError> {
    match config.search_provider.as_str() {
        #[cfg(feature = "tavily")]
        "tavily" => {
            let api_key = config
                .search_api_key
                .clone()
                .ok_or_else(|| AgentError::ApiKeyMissing {
                    provider: "tavily".to_string(),
                })?;
            let tool = TavilySearch::new(api_key, config.search_max_results, config.timeout)?;
            Ok(Arc::new(tool))
        }
        other => Err(AgentError::UnsupportedSearchProvider {
            name: other.to_string(),
        }),
    }
}

/// Truncates `text` to at most `max_chars` grapheme clusters.
///
/// Truncated text ends with `...` (counted within the limit when possible).
#[must_use]
pub fn truncate_graphemes(text: &str, max_chars: usize) -> String {
    let total = text.graphemes(true).count();
    if total <= max_chars {
        return text.to_string();
    }
    let keep = max_chars.saturating_sub(ELLIPSIS.len());
    let mut out: String = text.graphemes(true).take(keep).collect();
    out.push_str(ELLIPSIS);
    out
}

/// Bounds a ranked snippet list: keeps the first `max_snippets` and
/// truncates each snippet's text to `max_chars` graphemes.
#[must_use]
pub fn bound_snippets(snippets: &[Snippet], max_snippets: usize, max_chars: usize) -> Vec<Snippet> {
    snippets
        .iter()
        .take(max_snippets)
        .map(|s| Snippet {
            text: truncate_graphemes(&s.text, max_chars),
            source: s.source.clone(),
        })
        .collect()
}
