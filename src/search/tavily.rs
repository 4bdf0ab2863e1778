//! Tavily web search provider.
//!
//! One `POST /search` per call. HTTP, timeout and decode errors are folded
//! into [`SearchFailure`]; nothing is retried here.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{SearchTool, Snippet, ToolResult};
use crate::error::{AgentError, SearchFailure};

/// Tavily search endpoint.
const TAVILY_ENDPOINT: &str = "https://api.tavily.com/search";

/// Longest provider error body echoed back to the model.
const MAX_ERROR_BODY_CHARS: usize = 200;

#[derive(Debug, Serialize)]
struct TavilyRequest<'a> {
    query: &'a str,
    max_results: usize,
    search_depth: &'static str,
    include_answer: bool,
}

#[derive(Debug, Deserialize)]
struct TavilyResponse {
    #[serde(default)]
    results: Vec<TavilyResult>,
}

#[derive(Debug, Deserialize)]
struct TavilyResult {
    #[serde(default)]
    url: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    score: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct TavilyApiError {
    detail: Option<serde_json::Value>,
    error: Option<String>,
}

/// Tavily-backed [`SearchTool`].
pub struct TavilySearch {
    client: Client,
    api_key: String,
    endpoint: String,
    max_results: usize,
    timeout: Duration,
}

impl TavilySearch {
    /// Creates a Tavily client.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::HttpClient`] if the HTTP client cannot be built.
    pub fn new(
        api_key: impl Into<String>,
        max_results: usize,
        timeout: Duration,
    ) -> Result<Self, AgentError> {
        let client = Client::builder()
            .build()
            .map_err(|e| AgentError::HttpClient {
                message: e.to_string(),
            })?;
        Ok(Self {
            client,
            api_key: api_key.into(),
            endpoint: TAVILY_ENDPOINT.to_string(),
            max_results,
            timeout,
        })
    }

    async fn send(&self, query: &str) -> Result<Vec<Snippet>, SearchFailure> {
        let request = TavilyRequest {
            query,
            max_results: self.max_results,
            search_depth: "basic",
            include_answer: false,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(map_transport_error)?;

        if !(200..300).contains(&status) {
            return Err(classify_status(status, &body));
        }
        parse_response(&body)
    }
}

impl std::fmt::Debug for TavilySearch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TavilySearch")
            .field("endpoint", &self.endpoint)
            .field("max_results", &self.max_results)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl SearchTool for TavilySearch {
    fn name(&self) -> &'static str {
        "tavily"
    }

    async fn search(&self, query: &str) -> ToolResult {
        let query = query.trim();
        if query.is_empty() {
            return ToolResult::Failure(SearchFailure::EmptyQuery);
        }

        match tokio::time::timeout(self.timeout, self.send(query)).await {
            Ok(Ok(snippets)) => {
                tracing::debug!(query, results = snippets.len(), "tavily search succeeded");
                ToolResult::Success(snippets)
            }
            Ok(Err(failure)) => {
                tracing::warn!(query, error = %failure, "tavily search failed");
                ToolResult::Failure(failure)
            }
            Err(_) => {
                tracing::warn!(query, timeout_secs = self.timeout.as_secs(), "tavily search timed out");
                ToolResult::Failure(SearchFailure::Timeout)
            }
        }
    }
}

fn map_transport_error(e: reqwest::Error) -> SearchFailure {
    if e.is_timeout() {
        SearchFailure::Timeout
    } else if e.is_decode() {
        SearchFailure::Malformed {
            message: e.to_string(),
        }
    } else {
        SearchFailure::Provider {
            status: e.status().map(|s| s.as_u16()),
            message: e.to_string(),
        }
    }
}

/// Maps a non-success HTTP status and body onto a [`SearchFailure`].
fn classify_status(status: u16, body: &str) -> SearchFailure {
    match status {
        429 => SearchFailure::RateLimited,
        408 | 504 => SearchFailure::Timeout,
        _ => {
            let message = serde_json::from_str::<TavilyApiError>(body)
                .ok()
                .and_then(|e| {
                    e.error.or_else(|| {
                        e.detail.map(|d| match d {
                            serde_json::Value::String(s) => s,
                            other => other.to_string(),
                        })
                    })
                })
                .unwrap_or_else(|| super::truncate_graphemes(body.trim(), MAX_ERROR_BODY_CHARS));
            SearchFailure::Provider {
                status: Some(status),
                message,
            }
        }
    }
}

/// Decodes a success body into snippets ordered by score, best first.
///
/// Results without content are dropped.
fn parse_response(body: &str) -> Result<Vec<Snippet>, SearchFailure> {
    let response: TavilyResponse =
        serde_json::from_str(body).map_err(|e| SearchFailure::Malformed {
            message: e.to_string(),
        })?;

    let mut results: Vec<TavilyResult> = response
        .results
        .into_iter()
        .filter(|r| !r.content.trim().is_empty())
        .collect();
    // Stable sort keeps provider order for equal or missing scores.
    results.sort_by(|a, b| {
        b.score
            .unwrap_or(0.0)
            .partial_cmp(&a.score.unwrap_or(0.0))
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    Ok(results
        .into_iter()
        .map(|r| Snippet::new(r.content.trim(), r.url))
        .collect())
}
