//! Pluggable LLM provider trait.
//!
//! Implementations translate provider-agnostic [`ChatRequest`]/[`ChatResponse`]
//! into provider-specific SDK calls. This keeps the reasoning loop decoupled
//! from any particular LLM vendor.

use async_trait::async_trait;

use super::message::{ChatRequest, ChatResponse};
use crate::error::GenerationError;

/// Trait for LLM provider backends.
///
/// Implementations are stateless per call: every request carries its full
/// context, so one provider may be shared across concurrent invocations.
/// Timeouts are owned by the implementation, not by callers.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Provider name (e.g., `"openai"`, `"huggingface"`).
    fn name(&self) -> &'static str;

    /// Executes a chat completion request.
    ///
    /// # Errors
    ///
    /// Returns [`GenerationError`] on backend failures, timeouts, context
    /// overflow or content-filter rejection. Overflow is never handled by
    /// truncating the prompt.
    async fn complete(&self, request: &ChatRequest) -> Result<ChatResponse, GenerationError>;
}
