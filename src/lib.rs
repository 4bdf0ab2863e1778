//! # search-agent-rs
//!
//! A search-augmented reasoning agent for long, context-heavy queries.
//!
//! Given a query, the agent runs one of three strategies:
//!
//! - `simple_search`: one web search, one model call
//! - `rewrite_react_search`: rewrite the query for search, then iterate
//! - `search_agent`: iterate Thought → Action → Observation until a final
//!   answer, a turn budget, or a fatal failure
//!
//! Each run returns a [`StrategyResult`](agent::StrategyResult) holding the
//! answer, a terminal status and the full transcript, so runs across
//! models and strategies can be compared side by side.
//!
//! ## Example
//!
//! ```no_run
//! use search_agent::agent::{AgentConfig, Query, RunConfig, StrategyId, StrategyRouter};
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let config = AgentConfig::from_env()?;
//! let router = StrategyRouter::from_config(&config)?;
//! let query = Query::new("What is the capital of the country that won the 2018 World Cup?")?;
//! let result = router
//!     .run(StrategyId::SearchAgent, &query, &RunConfig::default())
//!     .await?;
//! println!("{}", result.answer);
//! # Ok(())
//! # }
//! ```

pub mod agent;
pub mod cli;
pub mod error;
pub mod search;

pub use error::{AgentError, Error, GenerationError, Result, SearchFailure};
