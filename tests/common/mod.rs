//! Scripted backends shared by the integration tests.

#![allow(dead_code, clippy::unwrap_used)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use search_agent::agent::{
    ChatRequest, ChatResponse, GenerationSettings, LlmProvider, PromptSet, StopReason,
    StrategyRouter, TokenUsage,
};
use search_agent::error::{GenerationError, SearchFailure};
use search_agent::search::{SearchTool, Snippet, ToolResult};

/// Model that replays canned replies, repeating the last one forever.
pub struct ScriptedProvider {
    replies: Mutex<VecDeque<Result<ChatResponse, GenerationError>>>,
    last: Mutex<Option<Result<ChatResponse, GenerationError>>>,
    requests: Mutex<Vec<ChatRequest>>,
    calls: AtomicUsize,
}

impl ScriptedProvider {
    pub fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_results(replies.into_iter().map(|r| Ok(r.into())))
    }

    pub fn with_results(replies: impl IntoIterator<Item = Result<String, GenerationError>>) -> Self {
        Self::with_responses(
            replies
                .into_iter()
                .map(|r| r.map(|content| response(&content, StopReason::Stop))),
        )
    }

    pub fn with_responses(
        replies: impl IntoIterator<Item = Result<ChatResponse, GenerationError>>,
    ) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().collect()),
            last: Mutex::new(None),
            requests: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn complete(&self, request: &ChatRequest) -> Result<ChatResponse, GenerationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());

        let next = self.replies.lock().unwrap().pop_front();
        match next {
            Some(reply) => {
                *self.last.lock().unwrap() = Some(reply.clone());
                reply
            }
            None => self
                .last
                .lock()
                .unwrap()
                .clone()
                .unwrap_or_else(|| Ok(response("", StopReason::Stop))),
        }
    }
}

/// A reply with the given finish reason.
pub fn response(content: &str, stop_reason: StopReason) -> ChatResponse {
    ChatResponse {
        content: content.to_string(),
        usage: TokenUsage::default(),
        stop_reason,
    }
}

/// Search tool that replays canned results, repeating the last one.
pub struct ScriptedSearch {
    results: Mutex<VecDeque<ToolResult>>,
    last: Mutex<Option<ToolResult>>,
    queries: Mutex<Vec<String>>,
}

impl ScriptedSearch {
    pub fn new(results: impl IntoIterator<Item = ToolResult>) -> Self {
        Self {
            results: Mutex::new(results.into_iter().collect()),
            last: Mutex::new(None),
            queries: Mutex::new(Vec::new()),
        }
    }

    /// Always returns the same snippets.
    pub fn always(snippets: Vec<Snippet>) -> Self {
        Self::new([ToolResult::Success(snippets)])
    }

    /// Always fails with a provider error.
    pub fn failing() -> Self {
        Self::new([ToolResult::Failure(SearchFailure::Provider {
            status: Some(503),
            message: "service unavailable".to_string(),
        })])
    }

    pub fn calls(&self) -> usize {
        self.queries.lock().unwrap().len()
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl SearchTool for ScriptedSearch {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn search(&self, query: &str) -> ToolResult {
        self.queries.lock().unwrap().push(query.to_string());
        let next = self.results.lock().unwrap().pop_front();
        match next {
            Some(result) => {
                *self.last.lock().unwrap() = Some(result.clone());
                result
            }
            None => self
                .last
                .lock()
                .unwrap()
                .clone()
                .unwrap_or(ToolResult::Success(Vec::new())),
        }
    }
}

/// Search tool that never returns.
pub struct PendingSearch;

#[async_trait]
impl SearchTool for PendingSearch {
    fn name(&self) -> &'static str {
        "pending"
    }

    async fn search(&self, _query: &str) -> ToolResult {
        std::future::pending().await
    }
}

pub fn snippet(text: &str) -> Snippet {
    Snippet::new(text, "https://example.com")
}

pub fn router(provider: Arc<ScriptedProvider>, tool: Arc<dyn SearchTool>) -> StrategyRouter {
    StrategyRouter::new(
        provider,
        tool,
        PromptSet::defaults(),
        GenerationSettings::new("test-model"),
    )
}
