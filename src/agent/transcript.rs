//! Append-only record of one query's resolution.
//!
//! A [`Transcript`] holds the system instructions, the caller's prior
//! conversation and the ordered [`Step`]s of the current invocation. It
//! renders to the message list the language model adapter expects.
//!
//! # Ordering
//!
//! - an `Action` is immediately followed by exactly one `Observation`
//! - an `Observation` follows an `Action`, or a `Thought` when it carries a
//!   corrective note about malformed output
//! - a `FinalAnswer` is always the last step
//!
//! [`Transcript::append`] treats a violation as a defect in the calling
//! strategy and panics; [`Transcript::try_append`] reports it instead.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::message::{ChatMessage, Role, assistant_message, system_message, user_message};

/// One step of a reasoning transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Step {
    /// Free-form model reasoning.
    Thought {
        /// Reasoning text.
        text: String,
    },
    /// A tool invocation proposed by the model.
    Action {
        /// Tool name.
        tool: String,
        /// Tool input.
        input: String,
    },
    /// Tool output or an error note.
    Observation {
        /// Text shown to the model.
        content: String,
        /// Whether this observation reports a failure.
        is_error: bool,
    },
    /// The answer that ends the invocation.
    FinalAnswer {
        /// Answer text.
        text: String,
    },
}

impl Step {
    /// Creates a thought step.
    #[must_use]
    pub fn thought(text: impl Into<String>) -> Self {
        Self::Thought { text: text.into() }
    }

    /// Creates an action step.
    #[must_use]
    pub fn action(tool: impl Into<String>, input: impl Into<String>) -> Self {
        Self::Action {
            tool: tool.into(),
            input: input.into(),
        }
    }

    /// Creates a successful observation.
    #[must_use]
    pub fn observation(content: impl Into<String>) -> Self {
        Self::Observation {
            content: content.into(),
            is_error: false,
        }
    }

    /// Creates an observation that reports a failure.
    #[must_use]
    pub fn error_observation(content: impl Into<String>) -> Self {
        Self::Observation {
            content: content.into(),
            is_error: true,
        }
    }

    /// Creates a final answer step.
    #[must_use]
    pub fn final_answer(text: impl Into<String>) -> Self {
        Self::FinalAnswer { text: text.into() }
    }

    const fn kind(&self) -> &'static str {
        match self {
            Self::Thought { .. } => "thought",
            Self::Action { .. } => "action",
            Self::Observation { .. } => "observation",
            Self::FinalAnswer { .. } => "final_answer",
        }
    }
}

/// A step that would break transcript ordering.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderingViolation {
    /// Something was appended after the final answer.
    #[error("cannot append {0} after final answer")]
    AfterFinalAnswer(&'static str),

    /// An action was followed by something other than an observation.
    #[error("action must be followed by an observation, got {0}")]
    MissingObservation(&'static str),

    /// An observation without a preceding action or thought.
    #[error("observation must follow an action or a thought")]
    OrphanObservation,
}

/// Record of one invocation: instructions, prior turns and steps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transcript {
    system: String,
    query: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    history: Vec<ChatMessage>,
    steps: Vec<Step>,
}

impl Transcript {
    /// Creates an empty transcript for `query`.
    #[must_use]
    pub fn new(
        system: impl Into<String>,
        query: impl Into<String>,
        history: Vec<ChatMessage>,
    ) -> Self {
        Self {
            system: system.into(),
            query: query.into(),
            history,
            steps: Vec::new(),
        }
    }

    /// Appends `step`.
    ///
    /// # Panics
    ///
    /// Panics if `step` violates the ordering rules; strategies never do.
    pub fn append(&mut self, step: Step) {
        let check = self.check_next(&step);
        assert!(check.is_ok(), "transcript ordering violated: {check:?}");
        self.steps.push(step);
    }

    /// Appends `step` if it keeps the ordering valid.
    ///
    /// # Errors
    ///
    /// Returns the [`OrderingViolation`] and leaves the transcript unchanged.
    pub fn try_append(&mut self, step: Step) -> Result<(), OrderingViolation> {
        self.check_next(&step)?;
        self.steps.push(step);
        Ok(())
    }

    fn check_next(&self, step: &Step) -> Result<(), OrderingViolation> {
        match (self.steps.last(), step) {
            (Some(Step::FinalAnswer { .. }), next) => {
                Err(OrderingViolation::AfterFinalAnswer(next.kind()))
            }
            (Some(Step::Action { .. }), Step::Observation { .. }) => Ok(()),
            (Some(Step::Action { .. }), next) => {
                Err(OrderingViolation::MissingObservation(next.kind()))
            }
            (Some(Step::Thought { .. }), Step::Observation { .. }) => Ok(()),
            (_, Step::Observation { .. }) => Err(OrderingViolation::OrphanObservation),
            _ => Ok(()),
        }
    }

    /// Number of completed or pending tool turns (one per `Action`).
    #[must_use]
    pub fn turn_count(&self) -> usize {
        self.steps
            .iter()
            .filter(|s| matches!(s, Step::Action { .. }))
            .count()
    }

    /// All steps in order.
    #[must_use]
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Text of the most recent non-empty `Thought`.
    #[must_use]
    pub fn last_thought(&self) -> Option<&str> {
        self.steps.iter().rev().find_map(|s| match s {
            Step::Thought { text } if !text.trim().is_empty() => Some(text.as_str()),
            _ => None,
        })
    }

    /// Renders the transcript as chat messages.
    ///
    /// Order: system instructions, prior conversation, the task, then the
    /// steps. Consecutive reasoning steps share one assistant message; each
    /// observation becomes a user message. Pure: repeated calls return the
    /// same messages.
    #[must_use]
    pub fn render(&self) -> Vec<ChatMessage> {
        let mut messages = Vec::with_capacity(self.history.len() + self.steps.len() + 2);
        messages.push(system_message(&self.system));
        messages.extend(prior_turns(&self.history).cloned());
        messages.push(user_message(&format!("Task: {}", self.query)));

        let mut pending: Vec<String> = Vec::new();
        for step in &self.steps {
            match step {
                Step::Thought { text } => pending.push(format!("Thought: {text}")),
                Step::Action { tool, input } => {
                    pending.push(format!("Action: {tool}\nAction Input: {input}"));
                }
                Step::FinalAnswer { text } => pending.push(format!("Final Answer: {text}")),
                Step::Observation { content, .. } => {
                    if !pending.is_empty() {
                        messages.push(assistant_message(&pending.join("\n")));
                        pending.clear();
                    }
                    messages.push(user_message(&format!("Observation: {content}")));
                }
            }
        }
        if !pending.is_empty() {
            messages.push(assistant_message(&pending.join("\n")));
        }

        messages
    }
}

/// Prior conversation as sent to the model; system messages are dropped.
pub(crate) fn prior_turns(history: &[ChatMessage]) -> impl Iterator<Item = &ChatMessage> {
    history.iter().filter(|m| m.role != Role::System)
}
