//! Strategy router: the single entry point for callers.
//!
//! The router holds the shared, stateless collaborators (model provider,
//! search tool, prompt set) and dispatches on [`StrategyId`]. It never
//! inspects the query; the caller chooses the strategy. Each call owns its
//! own [`Transcript`], so one router can serve many concurrent invocations.

use std::sync::Arc;
use std::time::Instant;

use tokio_util::sync::CancellationToken;

use super::client::create_provider;
use super::config::{AgentConfig, RunConfig};
use super::prompt::PromptSet;
use super::provider::LlmProvider;
use super::strategy::{
    GenerationSettings, Query, Runner, StrategyId, StrategyResult, react, rewrite, simple,
};
use super::transcript::Transcript;
use crate::error::AgentError;
use crate::search::{SearchTool, create_search_tool};

/// Dispatches queries to reasoning strategies.
#[derive(Clone)]
pub struct StrategyRouter {
    provider: Arc<dyn LlmProvider>,
    tool: Arc<dyn SearchTool>,
    prompts: Arc<PromptSet>,
    generation: GenerationSettings,
}

impl StrategyRouter {
    /// Creates a router from explicit collaborators.
    #[must_use]
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        tool: Arc<dyn SearchTool>,
        prompts: PromptSet,
        generation: GenerationSettings,
    ) -> Self {
        Self {
            provider,
            tool,
            prompts: Arc::new(prompts),
            generation,
        }
    }

    /// Builds the provider, search tool and prompt set from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError`] if either backend cannot be created.
    pub fn from_config(config: &AgentConfig) -> Result<Self, AgentError> {
        let provider = create_provider(config)?;
        let tool = create_search_tool(config)?;
        let prompts = PromptSet::load(config.prompt_dir.as_deref());
        Ok(Self::new(provider, tool, prompts, GenerationSettings::from(config)))
    }

    /// Returns a router sharing the same collaborators but using `model`.
    #[must_use]
    pub fn with_model(&self, model: impl Into<String>) -> Self {
        let mut router = self.clone();
        router.generation.model = model.into();
        router
    }

    /// The model requests are sent to.
    #[must_use]
    pub fn model(&self) -> &str {
        &self.generation.model
    }

    /// The prompt set in use.
    #[must_use]
    pub fn prompts(&self) -> &PromptSet {
        &self.prompts
    }

    /// Runs `strategy` on `query`.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::InvalidConfig`] if `config` fails validation.
    /// Every runtime outcome, including failures, is a [`StrategyResult`].
    pub async fn run(
        &self,
        strategy: StrategyId,
        query: &Query,
        config: &RunConfig,
    ) -> Result<StrategyResult, AgentError> {
        self.run_with_cancel(strategy, query, config, &CancellationToken::new())
            .await
    }

    /// Runs `strategy` on `query`, stopping early when `cancel` fires.
    ///
    /// A cancelled run ends with `Failed(Cancelled)` and keeps every step
    /// appended so far.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::InvalidConfig`] if `config` fails validation.
    pub async fn run_with_cancel(
        &self,
        strategy: StrategyId,
        query: &Query,
        config: &RunConfig,
        cancel: &CancellationToken,
    ) -> Result<StrategyResult, AgentError> {
        config.validate()?;

        let started = Instant::now();
        let runner = Runner {
            provider: self.provider.as_ref(),
            tool: self.tool.as_ref(),
            prompts: &self.prompts,
            generation: &self.generation,
            config,
            cancel,
        };

        let system = match strategy {
            StrategyId::SimpleSearch => self.prompts.answer_system.clone(),
            StrategyId::RewriteReactSearch | StrategyId::SearchAgent => {
                self.prompts.react_system.clone()
            }
        };
        let mut transcript = Transcript::new(system, query.text(), query.history().to_vec());

        tracing::debug!(
            strategy = %strategy,
            model = %self.generation.model,
            max_turns = config.max_turns,
            "strategy started"
        );

        let termination = match strategy {
            StrategyId::SimpleSearch => simple::run(&runner, query, &mut transcript).await,
            StrategyId::RewriteReactSearch => rewrite::run(&runner, query, &mut transcript).await,
            StrategyId::SearchAgent => react::run(&runner, &mut transcript).await,
        };

        let elapsed = started.elapsed();
        tracing::info!(
            strategy = %strategy,
            model = %self.generation.model,
            status = %termination.status.label(),
            turns = transcript.turn_count(),
            elapsed_ms = elapsed.as_millis(),
            "strategy finished"
        );

        Ok(StrategyResult {
            answer: termination.answer,
            transcript,
            status: termination.status,
            strategy,
            model: self.generation.model.clone(),
            prompt_version: self.prompts.version.clone(),
            elapsed_ms: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
        })
    }
}

impl std::fmt::Debug for StrategyRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StrategyRouter")
            .field("provider", &self.provider.name())
            .field("tool", &self.tool.name())
            .field("prompt_version", &self.prompts.version)
            .field("generation", &self.generation)
            .finish()
    }
}
