//! End-to-end strategy behaviour against scripted backends.

#![allow(clippy::unwrap_used, clippy::panic)]

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{PendingSearch, ScriptedProvider, ScriptedSearch, response, router, snippet};
use search_agent::agent::message::{assistant_message, system_message, user_message};
use search_agent::agent::prompt::{ANSWER_SYSTEM_PROMPT, NO_SEARCH_RESULTS};
use search_agent::agent::strategy::UNABLE_TO_DETERMINE;
use search_agent::agent::{
    AbortReason, Query, Role, RunConfig, Step, StopReason, StrategyId, StrategyResult,
    StrategyStatus,
};
use search_agent::error::{AgentError, GenerationError, SearchFailure};
use search_agent::search::ToolResult;
use tokio_util::sync::CancellationToken;

const SEARCH_WINNER: &str =
    "Thought: I need the 2018 winner.\nAction: search\nAction Input: 2018 World Cup winner";
const SEARCH_CAPITAL: &str =
    "Thought: France won. Now the capital.\nAction: search\nAction Input: capital of France";

fn query(text: &str) -> Query {
    Query::new(text).unwrap()
}

fn error_observations(result: &StrategyResult) -> usize {
    result
        .transcript
        .steps()
        .iter()
        .filter(|s| matches!(s, Step::Observation { is_error: true, .. }))
        .count()
}

#[tokio::test]
async fn test_search_agent_single_search_answer() {
    let provider = Arc::new(ScriptedProvider::new([
        SEARCH_WINNER,
        "Final Answer: Paris",
    ]));
    let search = Arc::new(ScriptedSearch::always(vec![snippet(
        "France won the 2018 FIFA World Cup",
    )]));
    let router = router(provider, search.clone());

    let result = router
        .run(
            StrategyId::SearchAgent,
            &query("What is the capital of the country that won the 2018 World Cup?"),
            &RunConfig::default(),
        )
        .await
        .unwrap();

    assert_eq!(result.status, StrategyStatus::Completed);
    assert_eq!(result.answer, "Paris");
    assert_eq!(result.transcript.turn_count(), 1);
    assert_eq!(search.queries(), vec!["2018 World Cup winner"]);
    let observations = result
        .transcript
        .steps()
        .iter()
        .filter(|s| matches!(s, Step::Observation { is_error: false, .. }))
        .count();
    assert_eq!(observations, 1);
}

#[tokio::test]
async fn test_search_agent_two_hop_answer() {
    let provider = Arc::new(ScriptedProvider::new([
        SEARCH_WINNER,
        SEARCH_CAPITAL,
        "Thought: Paris is the capital.\nFinal Answer: Paris",
    ]));
    let search = Arc::new(ScriptedSearch::new([
        ToolResult::Success(vec![snippet("France won the 2018 World Cup.")]),
        ToolResult::Success(vec![snippet("Paris is the capital of France.")]),
    ]));
    let router = router(provider.clone(), search.clone());

    let result = router
        .run(
            StrategyId::SearchAgent,
            &query("What is the capital of the country that won the 2018 World Cup?"),
            &RunConfig::default(),
        )
        .await
        .unwrap();

    assert_eq!(result.status, StrategyStatus::Completed);
    assert_eq!(result.answer, "Paris");
    assert_eq!(result.transcript.turn_count(), 2);
    assert_eq!(
        search.queries(),
        vec!["2018 World Cup winner", "capital of France"]
    );
    assert_eq!(provider.calls(), 3);
    assert!(matches!(
        result.transcript.steps().last(),
        Some(Step::FinalAnswer { text }) if text == "Paris"
    ));

    // The second request saw the first observation.
    let second = &provider.requests()[1];
    assert!(
        second
            .messages
            .iter()
            .any(|m| m.content.contains("France won the 2018 World Cup."))
    );
    assert_eq!(second.stop, vec!["Observation:"]);
}

#[tokio::test]
async fn test_search_agent_aborts_after_repeated_tool_failures() {
    let provider = Arc::new(ScriptedProvider::new([SEARCH_WINNER]));
    let search = Arc::new(ScriptedSearch::failing());
    let router = router(provider, search.clone());

    let config = RunConfig::default().with_max_tool_failures(3);
    let result = router
        .run(StrategyId::SearchAgent, &query("who won?"), &config)
        .await
        .unwrap();

    assert_eq!(
        result.status,
        StrategyStatus::Failed(AbortReason::ToolUnavailable)
    );
    assert_eq!(search.calls(), 4);
    assert!(result.answer.is_empty());
    let errors = result
        .transcript
        .steps()
        .iter()
        .filter(|s| matches!(s, Step::Observation { is_error: true, .. }))
        .count();
    assert_eq!(errors, 4);
}

#[tokio::test]
async fn test_search_agent_recovers_after_one_failure() {
    let provider = Arc::new(ScriptedProvider::new([
        SEARCH_WINNER,
        SEARCH_WINNER,
        "Final Answer: France",
    ]));
    let search = Arc::new(ScriptedSearch::new([
        ToolResult::Failure(SearchFailure::RateLimited),
        ToolResult::Success(vec![snippet("France won.")]),
    ]));
    let router = router(provider.clone(), search);

    let result = router
        .run(StrategyId::SearchAgent, &query("who won?"), &RunConfig::default())
        .await
        .unwrap();

    assert_eq!(result.status, StrategyStatus::Completed);
    assert_eq!(result.answer, "France");
    let second = &provider.requests()[1];
    assert!(
        second
            .messages
            .iter()
            .any(|m| m.content.contains("Search failed"))
    );
}

#[tokio::test]
async fn test_search_agent_budget_exhausted_uses_last_thought() {
    let provider = Arc::new(ScriptedProvider::new([SEARCH_WINNER]));
    let search = Arc::new(ScriptedSearch::always(vec![snippet("Not helpful.")]));
    let router = router(provider.clone(), search.clone());

    let config = RunConfig::default().with_max_turns(1);
    let result = router
        .run(StrategyId::SearchAgent, &query("who won?"), &config)
        .await
        .unwrap();

    assert_eq!(result.status, StrategyStatus::BudgetExhausted);
    assert_eq!(result.transcript.turn_count(), 1);
    assert_eq!(search.calls(), 1);
    assert_eq!(provider.calls(), 2);
    assert_eq!(result.answer, "I need the 2018 winner.");
}

#[tokio::test]
async fn test_search_agent_budget_zero_without_thought() {
    let provider = Arc::new(ScriptedProvider::new([
        "Action: search\nAction Input: anything",
    ]));
    let search = Arc::new(ScriptedSearch::always(Vec::new()));
    let router = router(provider, search.clone());

    let config = RunConfig::default().with_max_turns(0);
    let result = router
        .run(StrategyId::SearchAgent, &query("who won?"), &config)
        .await
        .unwrap();

    assert_eq!(result.status, StrategyStatus::BudgetExhausted);
    assert_eq!(result.answer, UNABLE_TO_DETERMINE);
    assert_eq!(search.calls(), 0);
    assert_eq!(result.transcript.turn_count(), 0);
}

#[tokio::test]
async fn test_search_agent_budget_summary_call() {
    let provider = Arc::new(ScriptedProvider::new([
        SEARCH_WINNER,
        SEARCH_WINNER,
        "Final Answer: Probably France",
    ]));
    let search = Arc::new(ScriptedSearch::always(vec![snippet("France won.")]));
    let router = router(provider.clone(), search);

    let config = RunConfig::default()
        .with_max_turns(1)
        .with_final_answer_on_budget(true);
    let result = router
        .run(StrategyId::SearchAgent, &query("who won?"), &config)
        .await
        .unwrap();

    assert_eq!(result.status, StrategyStatus::BudgetExhausted);
    assert_eq!(result.answer, "Probably France");
    assert_eq!(provider.calls(), 3);
    assert!(matches!(
        result.transcript.steps().last(),
        Some(Step::FinalAnswer { .. })
    ));
}

#[tokio::test]
async fn test_search_agent_unparsable_output() {
    let provider = Arc::new(ScriptedProvider::new(["I think it is something."]));
    let search = Arc::new(ScriptedSearch::always(Vec::new()));
    let router = router(provider.clone(), search.clone());

    let config = RunConfig::default().with_max_malformed(2);
    let result = router
        .run(StrategyId::SearchAgent, &query("who won?"), &config)
        .await
        .unwrap();

    assert_eq!(
        result.status,
        StrategyStatus::Failed(AbortReason::UnparsableOutput)
    );
    assert_eq!(provider.calls(), 2);
    assert_eq!(search.calls(), 0);
    // One corrective observation sits between the two attempts.
    let errors = result
        .transcript
        .steps()
        .iter()
        .filter(|s| matches!(s, Step::Observation { is_error: true, .. }))
        .count();
    assert_eq!(errors, 1);
}

#[tokio::test]
async fn test_search_agent_generation_error() {
    let provider = Arc::new(ScriptedProvider::with_results([Err(
        GenerationError::Timeout { seconds: 60 },
    )]));
    let search = Arc::new(ScriptedSearch::always(Vec::new()));
    let router = router(provider, search);

    let result = router
        .run(StrategyId::SearchAgent, &query("who won?"), &RunConfig::default())
        .await
        .unwrap();

    assert!(matches!(
        result.status,
        StrategyStatus::Failed(AbortReason::GenerationError { .. })
    ));
    assert!(result.answer.is_empty());
    assert!(result.transcript.steps().is_empty());
}

#[tokio::test]
async fn test_simple_search_answers_from_snippets() {
    let provider = Arc::new(ScriptedProvider::new(["Paris"]));
    let search = Arc::new(ScriptedSearch::always(vec![snippet("Paris is the capital of France.")]));
    let router = router(provider.clone(), search.clone());

    let result = router
        .run(StrategyId::SimpleSearch, &query("capital of France"), &RunConfig::default())
        .await
        .unwrap();

    assert_eq!(result.status, StrategyStatus::Completed);
    assert_eq!(result.answer, "Paris");
    assert_eq!(search.queries(), vec!["capital of France"]);
    assert_eq!(provider.calls(), 1);

    let request = &provider.requests()[0];
    let prompt = &request.messages.last().unwrap().content;
    assert!(prompt.contains("Paris is the capital of France."));
    assert!(prompt.contains("capital of France"));
    assert!(request.stop.is_empty());
}

#[tokio::test]
async fn test_simple_search_degrades_on_search_failure() {
    let provider = Arc::new(ScriptedProvider::new(["I believe it is Paris."]));
    let search = Arc::new(ScriptedSearch::failing());
    let router = router(provider.clone(), search);

    let result = router
        .run(StrategyId::SimpleSearch, &query("capital of France"), &RunConfig::default())
        .await
        .unwrap();

    assert_eq!(result.status, StrategyStatus::Completed);
    assert_eq!(result.answer, "I believe it is Paris.");
    let prompt = provider.requests()[0].messages.last().unwrap().content.clone();
    assert!(prompt.contains(NO_SEARCH_RESULTS));
}

#[tokio::test]
async fn test_simple_search_generation_failure() {
    let provider = Arc::new(ScriptedProvider::with_results([Err(
        GenerationError::Unavailable {
            message: "503".to_string(),
        },
    )]));
    let search = Arc::new(ScriptedSearch::always(vec![snippet("x")]));
    let router = router(provider, search);

    let result = router
        .run(StrategyId::SimpleSearch, &query("capital of France"), &RunConfig::default())
        .await
        .unwrap();

    assert!(matches!(
        result.status,
        StrategyStatus::Failed(AbortReason::GenerationError { .. })
    ));
    assert!(result.answer.is_empty());
}

#[tokio::test]
async fn test_rewrite_uses_rewritten_query() {
    let provider = Arc::new(ScriptedProvider::new([
        "Rephrased Question: 2018 FIFA World Cup champion capital city",
        "Final Answer: Paris",
    ]));
    let search = Arc::new(ScriptedSearch::always(vec![snippet("France; Paris.")]));
    let router = router(provider.clone(), search.clone());

    let result = router
        .run(
            StrategyId::RewriteReactSearch,
            &query("capital of the country that won the 2018 World Cup?"),
            &RunConfig::default(),
        )
        .await
        .unwrap();

    assert_eq!(result.status, StrategyStatus::Completed);
    assert_eq!(result.answer, "Paris");
    assert_eq!(
        search.queries(),
        vec!["2018 FIFA World Cup champion capital city"]
    );
    assert_eq!(result.transcript.turn_count(), 1);
    // The rewrite call carries no stop sequence; the loop call does.
    let requests = provider.requests();
    assert!(requests[0].stop.is_empty());
    assert_eq!(requests[1].stop, vec!["Observation:"]);
}

#[tokio::test]
async fn test_rewrite_falls_back_to_original_query() {
    let provider = Arc::new(ScriptedProvider::new(["", "Final Answer: Paris"]));
    let search = Arc::new(ScriptedSearch::always(vec![snippet("Paris.")]));
    let router = router(provider, search.clone());

    let result = router
        .run(
            StrategyId::RewriteReactSearch,
            &query("capital of France"),
            &RunConfig::default(),
        )
        .await
        .unwrap();

    assert_eq!(result.status, StrategyStatus::Completed);
    assert_eq!(search.queries(), vec!["capital of France"]);
}

#[tokio::test]
async fn test_rewrite_survives_generation_error() {
    let provider = Arc::new(ScriptedProvider::with_results([
        Err(GenerationError::Timeout { seconds: 5 }),
        Ok("Final Answer: Paris".to_string()),
    ]));
    let search = Arc::new(ScriptedSearch::always(vec![snippet("Paris.")]));
    let router = router(provider, search.clone());

    let result = router
        .run(
            StrategyId::RewriteReactSearch,
            &query("capital of France"),
            &RunConfig::default(),
        )
        .await
        .unwrap();

    assert_eq!(result.status, StrategyStatus::Completed);
    assert_eq!(result.answer, "Paris");
    assert_eq!(search.queries(), vec!["capital of France"]);
}

#[tokio::test]
async fn test_cancellation_during_search() {
    let provider = Arc::new(ScriptedProvider::new([SEARCH_WINNER]));
    let router = router(provider, Arc::new(PendingSearch));

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        trigger.cancel();
    });

    let result = router
        .run_with_cancel(
            StrategyId::SearchAgent,
            &query("who won?"),
            &RunConfig::default(),
            &cancel,
        )
        .await
        .unwrap();

    assert_eq!(result.status, StrategyStatus::Failed(AbortReason::Cancelled));
    assert!(matches!(
        result.transcript.steps().last(),
        Some(Step::Observation { is_error: true, .. })
    ));
    assert_eq!(result.transcript.turn_count(), 1);
}

#[tokio::test]
async fn test_cancelled_before_start() {
    let provider = Arc::new(ScriptedProvider::new(["Final Answer: Paris"]));
    let router = router(provider.clone(), Arc::new(ScriptedSearch::always(Vec::new())));

    let cancel = CancellationToken::new();
    cancel.cancel();
    for strategy in StrategyId::ALL {
        let result = router
            .run_with_cancel(strategy, &query("q"), &RunConfig::default(), &cancel)
            .await
            .unwrap();
        assert_eq!(
            result.status,
            StrategyStatus::Failed(AbortReason::Cancelled),
            "{strategy}"
        );
    }
    assert_eq!(provider.calls(), 0);
}

#[tokio::test]
async fn test_invalid_run_config_is_rejected() {
    let provider = Arc::new(ScriptedProvider::new(["Final Answer: x"]));
    let router = router(provider, Arc::new(ScriptedSearch::always(Vec::new())));

    let config = RunConfig::default().with_max_snippet_chars(0);
    let result = router
        .run(StrategyId::SearchAgent, &query("q"), &config)
        .await;
    assert!(matches!(result, Err(AgentError::InvalidConfig { .. })));
}

#[tokio::test]
async fn test_history_is_sent_before_task() {
    let provider = Arc::new(ScriptedProvider::new(["Final Answer: Paris"]));
    let router = router(provider.clone(), Arc::new(ScriptedSearch::always(Vec::new())));

    let query = query("and its capital?").with_history(vec![
        user_message("who won the 2018 World Cup?"),
        assistant_message("France"),
    ]);
    let result = router
        .run(StrategyId::SearchAgent, &query, &RunConfig::default())
        .await
        .unwrap();
    assert_eq!(result.status, StrategyStatus::Completed);

    let messages = &provider.requests()[0].messages;
    let history_at = messages
        .iter()
        .position(|m| m.content == "France")
        .unwrap();
    let task_at = messages
        .iter()
        .position(|m| m.content.contains("and its capital?"))
        .unwrap();
    assert!(history_at < task_at);
}

#[tokio::test]
async fn test_concurrent_runs_share_router() {
    let provider = Arc::new(ScriptedProvider::new(["Final Answer: Paris"]));
    let router = router(provider.clone(), Arc::new(ScriptedSearch::always(Vec::new())));

    let a = router.with_model("model-a");
    let b = router.with_model("model-b");
    let q = query("capital of France");
    let config = RunConfig::default();
    let (ra, rb) = tokio::join!(
        a.run(StrategyId::SearchAgent, &q, &config),
        b.run(StrategyId::SearchAgent, &q, &config),
    );
    let (ra, rb) = (ra.unwrap(), rb.unwrap());

    assert_eq!(ra.model, "model-a");
    assert_eq!(rb.model, "model-b");
    assert_eq!(ra.answer, "Paris");
    assert_eq!(rb.answer, "Paris");
    assert_eq!(ra.transcript.steps().len(), 1);
    assert_eq!(rb.transcript.steps().len(), 1);
}

#[tokio::test]
async fn test_search_agent_budget_wins_over_tool_failures() {
    let provider = Arc::new(ScriptedProvider::new([SEARCH_WINNER]));
    let search = Arc::new(ScriptedSearch::failing());
    let router = router(provider.clone(), search.clone());

    // The fourth failure crosses the threshold on the last allowed turn.
    let config = RunConfig::default()
        .with_max_turns(4)
        .with_max_tool_failures(3);
    let result = router
        .run(StrategyId::SearchAgent, &query("who won?"), &config)
        .await
        .unwrap();

    assert_eq!(result.status, StrategyStatus::BudgetExhausted);
    assert_eq!(result.transcript.turn_count(), 4);
    assert_eq!(result.answer, "I need the 2018 winner.");
    assert_eq!(search.calls(), 4);
    assert_eq!(error_observations(&result), 4);
}

#[tokio::test]
async fn test_search_agent_malformed_count_resets_after_tool_call() {
    let provider = Arc::new(ScriptedProvider::new([
        "I am not sure.",
        SEARCH_WINNER,
        "still thinking",
        "Final Answer: Paris",
    ]));
    let search = Arc::new(ScriptedSearch::always(vec![snippet(
        "France won the 2018 World Cup.",
    )]));
    let router = router(provider.clone(), search.clone());

    let config = RunConfig::default().with_max_malformed(2);
    let result = router
        .run(StrategyId::SearchAgent, &query("who won?"), &config)
        .await
        .unwrap();

    assert_eq!(result.status, StrategyStatus::Completed);
    assert_eq!(result.answer, "Paris");
    assert_eq!(provider.calls(), 4);
    assert_eq!(search.calls(), 1);
    assert_eq!(error_observations(&result), 2);
}

#[tokio::test]
async fn test_search_agent_retries_truncated_reply() {
    let provider = Arc::new(ScriptedProvider::with_responses([
        Ok(response("Final Answer: Par", StopReason::Length)),
        Ok(response("Final Answer: Paris", StopReason::Stop)),
    ]));
    let search = Arc::new(ScriptedSearch::always(Vec::new()));
    let router = router(provider.clone(), search.clone());

    let result = router
        .run(StrategyId::SearchAgent, &query("capital of France"), &RunConfig::default())
        .await
        .unwrap();

    assert_eq!(result.status, StrategyStatus::Completed);
    assert_eq!(result.answer, "Paris");
    assert_eq!(provider.calls(), 2);
    assert_eq!(search.calls(), 0);
    assert_eq!(error_observations(&result), 1);
}

#[tokio::test]
async fn test_simple_search_sends_rendered_transcript() {
    let provider = Arc::new(ScriptedProvider::new(["Paris"]));
    let search = Arc::new(ScriptedSearch::always(vec![snippet("Paris is the capital of France.")]));
    let router = router(provider.clone(), search);

    let query = query("and its capital?").with_history(vec![
        system_message("You are a pirate."),
        user_message("who won the 2018 World Cup?"),
        assistant_message("France"),
    ]);
    let result = router
        .run(StrategyId::SimpleSearch, &query, &RunConfig::default())
        .await
        .unwrap();
    assert_eq!(result.status, StrategyStatus::Completed);

    let sent = &provider.requests()[0].messages;
    assert_eq!(sent[0].content, ANSWER_SYSTEM_PROMPT);
    assert_eq!(sent.iter().filter(|m| m.role == Role::System).count(), 1);
    assert!(!sent.iter().any(|m| m.content == "You are a pirate."));

    // Everything but the answer prompt is the transcript as recorded.
    let rendered = result.transcript.render();
    let (prompt, before) = sent.split_last().unwrap();
    assert_eq!(before, &rendered[..before.len()]);
    assert!(prompt.content.contains("Paris is the capital of France."));
}

#[tokio::test]
async fn test_rewrite_drops_system_history() {
    let provider = Arc::new(ScriptedProvider::new([
        "Rephrased Question: capital of France",
        "Final Answer: Paris",
    ]));
    let router = router(provider.clone(), Arc::new(ScriptedSearch::always(Vec::new())));

    let query = query("and its capital?").with_history(vec![
        system_message("You are a pirate."),
        user_message("who won the 2018 World Cup?"),
    ]);
    let result = router
        .run(StrategyId::RewriteReactSearch, &query, &RunConfig::default())
        .await
        .unwrap();
    assert_eq!(result.status, StrategyStatus::Completed);

    for request in provider.requests() {
        assert!(!request.messages.iter().any(|m| m.content == "You are a pirate."));
    }
    let rewrite = &provider.requests()[0].messages;
    assert!(rewrite.iter().all(|m| m.role != Role::System));
    assert_eq!(rewrite[0].content, "who won the 2018 World Cup?");
}
