//! Simple search strategy: one search, one answer.
//!
//! The search result, or a "no search results" marker when it failed,
//! goes into the answer prompt, sent after the rendered transcript. Only a
//! generation error or cancellation fails the invocation.

use super::{AbortReason, Interrupt, Runner, Termination, UNABLE_TO_DETERMINE};
use crate::agent::extractor::{ModelResponse, parse_model_output};
use crate::agent::message::user_message;
use crate::agent::prompt::{NO_SEARCH_RESULTS, build_answer_context};
use crate::agent::strategy::{Query, record_cancelled_search};
use crate::agent::transcript::{Step, Transcript};
use crate::search::SEARCH_TOOL_NAME;

/// Runs the simple search strategy.
pub(crate) async fn run(
    runner: &Runner<'_>,
    query: &Query,
    transcript: &mut Transcript,
) -> Termination {
    let results = if runner.config.max_turns == 0 {
        NO_SEARCH_RESULTS.to_string()
    } else {
        transcript.append(Step::action(SEARCH_TOOL_NAME, query.text()));
        let Some(result) = runner.search(query.text()).await else {
            return record_cancelled_search(transcript);
        };
        let observation = runner.observation(&result);
        let results = match &observation {
            Step::Observation {
                is_error: true,
                content,
            } => {
                tracing::warn!(query = query.text(), "search failed, answering without results");
                format!("{NO_SEARCH_RESULTS} ({content})")
            }
            Step::Observation { content, .. } => content.clone(),
            _ => NO_SEARCH_RESULTS.to_string(),
        };
        transcript.append(observation);
        results
    };

    let context = build_answer_context(query.text(), &results);
    let mut messages = transcript.render();
    messages.push(user_message(
        &runner.prompts.render_answer(query.text(), &context),
    ));

    let raw = match runner.complete(messages, false).await {
        Ok(response) => response.content,
        Err(Interrupt::Cancelled) => return Termination::aborted(AbortReason::Cancelled),
        Err(Interrupt::Generation(e)) => {
            tracing::warn!(error = %e, "answer generation failed");
            return Termination::generation_failed(&e);
        }
    };

    // The answer prompt asks for plain text; honour a marker if one shows up.
    let answer = match parse_model_output(&raw) {
        ModelResponse::Answer { text, .. } => text,
        _ => raw.trim().to_string(),
    };
    let answer = if answer.is_empty() {
        UNABLE_TO_DETERMINE.to_string()
    } else {
        answer
    };

    transcript.append(Step::final_answer(answer.clone()));
    Termination::completed(answer)
}
