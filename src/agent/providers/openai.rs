//! `OpenAI` provider implementation using the `async-openai` crate.
//!
//! Supports any `OpenAI`-compatible API (`OpenAI`, the Hugging Face
//! inference router, local proxies) via the base URL in [`AgentConfig`].

use std::time::Duration;

use async_openai::Client;
use async_openai::config::OpenAIConfig;
use async_openai::error::OpenAIError;
use async_openai::types::{
    ChatCompletionRequestAssistantMessage, ChatCompletionRequestAssistantMessageContent,
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessage,
    ChatCompletionRequestSystemMessageContent, ChatCompletionRequestUserMessage,
    ChatCompletionRequestUserMessageContent, CreateChatCompletionRequest, FinishReason, Stop,
};
use async_trait::async_trait;

use crate::agent::config::AgentConfig;
use crate::agent::message::{ChatMessage, ChatRequest, ChatResponse, Role, StopReason, TokenUsage};
use crate::agent::provider::LlmProvider;
use crate::error::GenerationError;

/// `OpenAI`-compatible LLM provider.
///
/// Wraps the `async-openai` client for chat completions. Compatible
/// with any API that follows the `OpenAI` chat completion spec.
pub struct OpenAiProvider {
    client: Client<OpenAIConfig>,
    name: &'static str,
    timeout: Duration,
}

impl OpenAiProvider {
    /// Creates a new provider from agent configuration.
    #[must_use]
    pub fn new(config: &AgentConfig) -> Self {
        let mut openai_config = OpenAIConfig::new().with_api_key(&config.api_key);

        if let Some(ref base_url) = config.base_url {
            openai_config = openai_config.with_api_base(base_url);
        }

        let name = if config.provider == "huggingface" {
            "huggingface"
        } else {
            "openai"
        };

        Self {
            client: Client::with_config(openai_config),
            name,
            timeout: config.timeout,
        }
    }

    /// Converts our message type to the `OpenAI` SDK type.
    fn convert_message(msg: &ChatMessage) -> ChatCompletionRequestMessage {
        match msg.role {
            Role::System => {
                ChatCompletionRequestMessage::System(ChatCompletionRequestSystemMessage {
                    content: ChatCompletionRequestSystemMessageContent::Text(msg.content.clone()),
                    name: None,
                })
            }
            Role::User => ChatCompletionRequestMessage::User(ChatCompletionRequestUserMessage {
                content: ChatCompletionRequestUserMessageContent::Text(msg.content.clone()),
                name: None,
            }),
            Role::Assistant => {
                #[allow(deprecated)]
                ChatCompletionRequestMessage::Assistant(ChatCompletionRequestAssistantMessage {
                    content: Some(ChatCompletionRequestAssistantMessageContent::Text(
                        msg.content.clone(),
                    )),
                    name: None,
                    tool_calls: None,
                    refusal: None,
                    audio: None,
                    function_call: None,
                })
            }
        }
    }

    /// Builds an `OpenAI` chat completion request from our generic request.
    ///
    /// Uses `max_tokens` rather than `max_completion_tokens`, which several
    /// compatible backends (including the Hugging Face router) do not accept.
    #[allow(deprecated)]
    fn build_request(request: &ChatRequest) -> CreateChatCompletionRequest {
        let messages: Vec<_> = request.messages.iter().map(Self::convert_message).collect();

        let stop = if request.stop.is_empty() {
            None
        } else {
            Some(Stop::StringArray(request.stop.clone()))
        };

        CreateChatCompletionRequest {
            model: request.model.clone(),
            messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            stop,
            ..Default::default()
        }
    }
}

/// Normalizes the SDK finish reason.
const fn convert_finish_reason(reason: Option<&FinishReason>) -> StopReason {
    match reason {
        Some(FinishReason::Stop) => StopReason::Stop,
        Some(FinishReason::Length) => StopReason::Length,
        Some(FinishReason::ToolCalls | FinishReason::FunctionCall) => StopReason::ToolCall,
        Some(FinishReason::ContentFilter) => StopReason::ContentFilter,
        None => StopReason::Other,
    }
}

/// Classifies a provider error by its rendered text.
///
/// Context overflow and content-filter rejections are recognized from the
/// error codes and phrasing `OpenAI`-compatible backends use; everything
/// else counts as the backend being unavailable.
fn classify_error(error: &OpenAIError) -> GenerationError {
    classify_message(error.to_string())
}

fn classify_message(message: String) -> GenerationError {
    let lower = message.to_lowercase();
    if lower.contains("context_length_exceeded")
        || lower.contains("maximum context length")
        || lower.contains("context window")
        || lower.contains("too many tokens")
    {
        GenerationError::ContextLengthExceeded { message }
    } else if lower.contains("content_filter")
        || lower.contains("content management policy")
        || lower.contains("content filter")
    {
        GenerationError::ContentFiltered { message }
    } else {
        GenerationError::Unavailable { message }
    }
}

impl std::fmt::Debug for OpenAiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiProvider")
            .field("client", &"<async-openai::Client>")
            .field("name", &self.name)
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn complete(&self, request: &ChatRequest) -> Result<ChatResponse, GenerationError> {
        let openai_request = Self::build_request(request);

        let response = tokio::time::timeout(self.timeout, self.client.chat().create(openai_request))
            .await
            .map_err(|_| GenerationError::Timeout {
                seconds: self.timeout.as_secs(),
            })?
            .map_err(|e| classify_error(&e))?;

        let Some(choice) = response.choices.first() else {
            return Err(GenerationError::Unavailable {
                message: "response contained no choices".to_string(),
            });
        };

        let stop_reason = convert_finish_reason(choice.finish_reason.as_ref());
        let content = choice.message.content.clone().unwrap_or_default();

        if stop_reason == StopReason::ContentFilter && content.trim().is_empty() {
            return Err(GenerationError::ContentFiltered {
                message: "completion withheld by content filter".to_string(),
            });
        }

        let usage = response
            .usage
            .map_or_else(TokenUsage::default, |u| TokenUsage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
                total_tokens: u.total_tokens,
            });

        tracing::debug!(
            provider = self.name,
            model = %request.model,
            prompt_tokens = usage.prompt_tokens,
            completion_tokens = usage.completion_tokens,
            ?stop_reason,
            "completion received"
        );

        Ok(ChatResponse {
            content,
            usage,
            stop_reason,
        })
    }
}
