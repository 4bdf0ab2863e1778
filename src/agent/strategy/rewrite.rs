//! Query-rewrite + Reason-Act strategy.
//!
//! One model call turns the raw query into a search-engine query. That
//! query seeds the first action, after which the Reason-Act loop takes
//! over. A rewrite that fails or yields nothing falls back to the original
//! query verbatim; it never aborts the strategy.

use super::react::ReactLoop;
use super::{AbortReason, Interrupt, Runner, Termination};
use crate::agent::extractor::parse_rewrite;
use crate::agent::message::user_message;
use crate::agent::strategy::Query;
use crate::agent::transcript::{Transcript, prior_turns};
use crate::search::SEARCH_TOOL_NAME;

/// Runs the rewrite strategy.
pub(crate) async fn run(
    runner: &Runner<'_>,
    query: &Query,
    transcript: &mut Transcript,
) -> Termination {
    let Some(search_query) = rewrite_query(runner, query).await else {
        return Termination::aborted(AbortReason::Cancelled);
    };

    let mut react = ReactLoop::default();
    if runner.config.max_turns > 0
        && let Some(done) = react
            .act(runner, transcript, SEARCH_TOOL_NAME, &search_query)
            .await
    {
        return done;
    }
    react.run(runner, transcript).await
}

/// Produces the search query; `None` only on cancellation.
async fn rewrite_query(runner: &Runner<'_>, query: &Query) -> Option<String> {
    let mut messages: Vec<_> = prior_turns(query.history()).cloned().collect();
    messages.push(user_message(&runner.prompts.render_rewrite(query.text())));

    match runner.complete(messages, false).await {
        Ok(response) => {
            if let Some(rewritten) = parse_rewrite(&response.content) {
                tracing::debug!(original = query.text(), rewritten = %rewritten, "query rewritten");
                Some(rewritten)
            } else {
                tracing::warn!(
                    original = query.text(),
                    "rewrite output unusable, using original query"
                );
                Some(query.text().to_string())
            }
        }
        Err(Interrupt::Cancelled) => None,
        Err(Interrupt::Generation(e)) => {
            tracing::warn!(error = %e, "rewrite failed, using original query");
            Some(query.text().to_string())
        }
    }
}
