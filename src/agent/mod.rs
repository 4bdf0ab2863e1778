//! Strategy-routed, search-augmented reasoning agent.
//!
//! Provides the reasoning core: adapters for the language model, a
//! transcript that enforces step ordering, an output extractor, three
//! strategies and the router that dispatches between them.
//!
//! # Architecture
//!
//! ```text
//! caller → StrategyRouter
//!   └── StrategyId (simple_search | rewrite_react_search | search_agent)
//!         ├── LlmProvider::complete  ⇄  Transcript::render
//!         ├── SearchTool::search     →  Observation steps
//!         └── extractor              →  ToolCall | Answer | Malformed
//!   → StrategyResult { answer, transcript, status, .. }
//! ```

pub mod client;
pub mod config;
pub mod extractor;
pub mod message;
pub mod prompt;
pub mod provider;
pub mod providers;
pub mod router;
pub mod strategy;
pub mod transcript;

// Re-export key types
pub use client::create_provider;
pub use config::{AgentConfig, RunConfig, resolve_model_alias};
pub use extractor::{ModelResponse, parse_model_output, parse_rewrite};
pub use message::{ChatMessage, ChatRequest, ChatResponse, Role, StopReason, TokenUsage};
pub use prompt::PromptSet;
pub use provider::LlmProvider;
pub use router::StrategyRouter;
pub use strategy::{
    AbortReason, GenerationSettings, Query, StrategyId, StrategyResult, StrategyStatus,
};
pub use transcript::{OrderingViolation, Step, Transcript};
