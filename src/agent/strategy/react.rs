//! Reason-Act search agent: the central state machine.
//!
//! ```text
//! Reasoning ──ToolCall──▶ Observing ──▶ Reasoning ...
//!     │                      │
//!     ├──Answer──▶ Done      └──too many tool failures──▶ Aborted
//!     ├──Malformed (again)──▶ Aborted
//!     └──turn budget spent──▶ Done (BudgetExhausted)
//! ```
//!
//! One turn is one Action/Observation pair. An action is only appended
//! while turns remain, so `turn_count()` never exceeds `max_turns`. Once
//! the budget is spent the run ends `BudgetExhausted` unless the model
//! answers; the failure thresholds no longer apply.

use super::{
    AbortReason, Interrupt, Runner, Termination, UNABLE_TO_DETERMINE, record_cancelled_search,
};
use crate::agent::extractor::{ModelResponse, parse_model_output};
use crate::agent::message::{StopReason, user_message};
use crate::agent::transcript::{Step, Transcript};
use crate::search::{SEARCH_TOOL_NAME, ToolResult};

/// Corrective note shown after output that matched neither form.
pub const CORRECTIVE_OBSERVATION: &str = "Your reply did not follow the required format. Reply with either\n'Action: search' followed by 'Action Input: <query>', or\n'Final Answer: <answer>'.";

/// Runs the search agent strategy.
pub(crate) async fn run(runner: &Runner<'_>, transcript: &mut Transcript) -> Termination {
    ReactLoop::default().run(runner, transcript).await
}

/// Counters of the Reason-Act loop.
#[derive(Debug, Default)]
pub(crate) struct ReactLoop {
    consecutive_tool_failures: usize,
    consecutive_malformed: usize,
}

impl ReactLoop {
    /// Runs until a terminal state.
    pub async fn run(mut self, runner: &Runner<'_>, transcript: &mut Transcript) -> Termination {
        loop {
            let turn = transcript.turn_count();
            tracing::debug!(
                turn,
                steps = transcript.steps().len(),
                state = "reasoning",
                "reason-act iteration"
            );

            let response = match runner.complete(transcript.render(), true).await {
                Ok(response) => response,
                Err(Interrupt::Cancelled) => {
                    return Termination::aborted(AbortReason::Cancelled);
                }
                Err(Interrupt::Generation(e)) => {
                    tracing::warn!(turn, error = %e, "generation failed");
                    return Termination::generation_failed(&e);
                }
            };

            // A truncated reply gets the corrective retry, even if a marker survived.
            let parsed = if response.stop_reason == StopReason::Length {
                ModelResponse::Malformed(response.content)
            } else {
                parse_model_output(&response.content)
            };

            match parsed {
                ModelResponse::Answer { text, thought } => {
                    if let Some(thought) = thought {
                        transcript.append(Step::thought(thought));
                    }
                    transcript.append(Step::final_answer(text.clone()));
                    return Termination::completed(text);
                }
                ModelResponse::ToolCall {
                    tool,
                    input,
                    thought,
                } => {
                    self.consecutive_malformed = 0;
                    if let Some(thought) = thought {
                        transcript.append(Step::thought(thought));
                    }
                    if turn >= runner.config.max_turns {
                        return exhaust_budget(runner, transcript).await;
                    }
                    if let Some(done) = self.act(runner, transcript, &tool, &input).await {
                        return done;
                    }
                }
                ModelResponse::Malformed(raw) => {
                    self.consecutive_malformed += 1;
                    tracing::warn!(
                        turn,
                        consecutive = self.consecutive_malformed,
                        "malformed model output"
                    );
                    transcript.append(Step::thought(raw.trim()));
                    if turn >= runner.config.max_turns {
                        return exhaust_budget(runner, transcript).await;
                    }
                    if self.consecutive_malformed
                        >= runner.config.max_consecutive_malformed_responses
                    {
                        return Termination::aborted(AbortReason::UnparsableOutput);
                    }
                    transcript.append(Step::error_observation(CORRECTIVE_OBSERVATION));
                }
            }
        }
    }

    /// Appends an action and its observation.
    ///
    /// Returns a termination when the invocation must stop: cancellation
    /// during the search, or too many consecutive tool failures. A failure
    /// on the last allowed turn ends on the budget instead.
    pub async fn act(
        &mut self,
        runner: &Runner<'_>,
        transcript: &mut Transcript,
        tool: &str,
        input: &str,
    ) -> Option<Termination> {
        transcript.append(Step::action(tool, input));

        let observation = if tool.eq_ignore_ascii_case(SEARCH_TOOL_NAME) {
            let Some(result) = runner.search(input).await else {
                return Some(record_cancelled_search(transcript));
            };
            if let ToolResult::Failure(ref failure) = result {
                tracing::warn!(query = input, error = %failure, "search failed");
            }
            runner.observation(&result)
        } else {
            tracing::warn!(tool, "model requested unknown tool");
            Step::error_observation(format!(
                "Unknown tool '{tool}'. The only available action is '{SEARCH_TOOL_NAME}'."
            ))
        };

        let failed = matches!(observation, Step::Observation { is_error: true, .. });
        transcript.append(observation);

        if failed {
            self.consecutive_tool_failures += 1;
            if self.consecutive_tool_failures > runner.config.max_consecutive_tool_failures {
                if transcript.turn_count() >= runner.config.max_turns {
                    return Some(exhaust_budget(runner, transcript).await);
                }
                tracing::warn!(
                    failures = self.consecutive_tool_failures,
                    "search tool unavailable, aborting"
                );
                return Some(Termination::aborted(AbortReason::ToolUnavailable));
            }
        } else {
            self.consecutive_tool_failures = 0;
        }
        None
    }
}

/// Ends the loop on an exhausted turn budget with the best available text.
async fn exhaust_budget(runner: &Runner<'_>, transcript: &mut Transcript) -> Termination {
    tracing::info!(
        turns = transcript.turn_count(),
        max_turns = runner.config.max_turns,
        "turn budget exhausted"
    );

    if runner.config.final_answer_on_budget {
        let mut messages = transcript.render();
        messages.push(user_message(&runner.prompts.budget_summary));
        match runner.complete(messages, true).await {
            Ok(response) => {
                // A model that still asks to search gets no say.
                let text = match parse_model_output(&response.content) {
                    ModelResponse::Answer { text, .. } => text,
                    ModelResponse::ToolCall { .. } => String::new(),
                    ModelResponse::Malformed(raw) => raw.trim().to_string(),
                };
                if !text.is_empty() {
                    transcript.append(Step::final_answer(text.clone()));
                    return Termination::budget_exhausted(text);
                }
            }
            Err(Interrupt::Cancelled) => {
                return Termination::aborted(AbortReason::Cancelled);
            }
            Err(Interrupt::Generation(e)) => {
                tracing::warn!(error = %e, "budget summary failed, using last thought");
            }
        }
    }

    let answer = transcript
        .last_thought()
        .map_or_else(|| UNABLE_TO_DETERMINE.to_string(), str::to_string);
    Termination::budget_exhausted(answer)
}
