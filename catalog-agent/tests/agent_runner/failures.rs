//! Failure paths: runaway tool loops, backend errors, storage trouble, empty catalog.

use std::sync::Arc;

use catalog_agent::{
    AgentError, AgentRunner, InMemoryCatalog, LlmError, LlmResponse, LookupResult, MockEmbedder,
    MockLlm, RetryPolicy, ToolCall, UserFacingError, WorkflowConfig,
};

use crate::common::{furniture_catalog, lookup_call, runner_with, ReadOnlySaver};

/// **Scenario**: A backend that always asks for tools stops at exactly the recursion limit.
#[tokio::test]
async fn endless_tool_requests_hit_recursion_limit() {
    let llm = Arc::new(MockLlm::repeating(lookup_call("", "oak")));
    let (runner, _) =
        runner_with(llm.clone(), WorkflowConfig::default().with_recursion_limit(4)).await;
    let err = runner.handle("t1", "loop forever").await.unwrap_err();
    assert!(matches!(err, AgentError::RecursionLimitExceeded { limit: 4 }), "{}", err);
    assert_eq!(llm.call_count(), 4);
    assert_eq!(UserFacingError::from(&err), UserFacingError::AgentFailure);
}

/// **Scenario**: Default limit of 15 is respected too.
#[tokio::test]
async fn default_recursion_limit_is_fifteen() {
    let llm = Arc::new(MockLlm::repeating(lookup_call("", "oak")));
    let (runner, _) = runner_with(llm.clone(), WorkflowConfig::default()).await;
    assert!(runner.handle("t1", "loop").await.is_err());
    assert_eq!(llm.call_count(), 15);
}

/// **Scenario**: Persistent throttling surfaces as the rate-limit message.
#[tokio::test(start_paused = true)]
async fn exhausted_rate_limit_maps_to_rate_limited() {
    let llm = Arc::new(MockLlm::with_results(vec![
        Err(LlmError::RateLimited("429".into())),
        Err(LlmError::RateLimited("429".into())),
        Err(LlmError::RateLimited("429".into())),
    ]));
    let config = WorkflowConfig::default().with_retry(RetryPolicy::new(3).with_delays(10, 40));
    let (runner, _) = runner_with(llm.clone(), config).await;
    assert_eq!(
        runner.respond("t1", "hi").await.unwrap_err(),
        UserFacingError::RateLimited
    );
    assert_eq!(llm.call_count(), 3);
}

/// **Scenario**: Bad credentials map to the authentication message, without retries.
#[tokio::test]
async fn unauthenticated_maps_to_authentication_failed() {
    let llm = Arc::new(MockLlm::with_results(vec![Err(LlmError::Unauthenticated(
        "invalid api key".into(),
    ))]));
    let (runner, _) = runner_with(llm.clone(), WorkflowConfig::default()).await;
    let err = runner.respond("t1", "hi").await.unwrap_err();
    assert_eq!(err, UserFacingError::AuthenticationFailed);
    assert!(!err.to_string().contains("invalid api key"));
    assert_eq!(llm.call_count(), 1);
}

/// **Scenario**: Saves fail on every step, yet the caller still gets the answer and the
/// failures are reported.
#[tokio::test]
async fn failed_saves_still_return_answer() {
    let embedder = Arc::new(MockEmbedder::default());
    let catalog = furniture_catalog(&embedder).await;
    let llm = Arc::new(MockLlm::new(vec![
        lookup_call("call_1", "oak table"),
        LlmResponse::text("We have the Oak Table."),
    ]));
    let runner = AgentRunner::with_catalog(
        llm,
        catalog,
        embedder,
        Some(Arc::new(ReadOnlySaver)),
        WorkflowConfig::default(),
    );
    let reply = runner.handle("t1", "oak table?").await.unwrap();
    assert_eq!(reply.text, "We have the Oak Table.");
    // Input checkpoint plus three workflow steps.
    assert_eq!(reply.persistence_errors.len(), 4);
}

/// **Scenario**: An empty catalog yields the error envelope as tool content, without any
/// embedding call, and the backend still answers.
#[tokio::test]
async fn empty_catalog_reports_error_envelope() {
    let embedder = Arc::new(MockEmbedder::default());
    let llm = Arc::new(MockLlm::new(vec![
        lookup_call("call_1", "oak table"),
        LlmResponse::text("Sorry, nothing is in stock."),
    ]));
    let runner = AgentRunner::with_catalog(
        llm,
        Arc::new(InMemoryCatalog::new()),
        embedder.clone(),
        None,
        WorkflowConfig::default(),
    );
    let reply = runner.handle("t1", "oak table?").await.unwrap();
    assert_eq!(reply.text, "Sorry, nothing is in stock.");
    assert_eq!(embedder.call_count(), 0);

    let envelope = LookupResult::from_text(reply.state.messages()[2].content()).unwrap();
    assert!(envelope.is_error());
    assert_eq!(envelope.count(), 0);
}

/// **Scenario**: A lookup call without a query is answered with the "Invalid arguments"
/// envelope; the run and the next call on the thread both succeed.
#[tokio::test]
async fn lookup_without_query_does_not_break_thread() {
    let llm = Arc::new(
        MockLlm::new(vec![LlmResponse::tool_calls(vec![ToolCall::new(
            "call_1",
            "lookup_inventory",
            "{}",
        )])])
        .then_repeat(LlmResponse::text("hello")),
    );
    let (runner, _) = runner_with(llm.clone(), WorkflowConfig::default()).await;

    let first = runner.handle("t1", "anything in stock?").await.unwrap();
    assert_eq!(first.text, "hello");
    let envelope = LookupResult::from_text(first.state.messages()[2].content()).unwrap();
    assert!(envelope.is_error());
    assert!(first.state.messages()[2].content().contains("Invalid arguments"));

    let second = runner.handle("t1", "and now?").await.unwrap();
    assert_eq!(second.text, "hello");
    assert_eq!(llm.call_count(), 3);
}

/// **Scenario**: An unknown tool fails the current call, but the next call on the thread
/// closes the stuck round with an error result and reaches the backend again.
#[tokio::test]
async fn unknown_tool_does_not_brick_thread() {
    let llm = Arc::new(
        MockLlm::new(vec![LlmResponse::tool_calls(vec![ToolCall::new(
            "call_1",
            "teleport",
            "{}",
        )])])
        .then_repeat(LlmResponse::text("back on track")),
    );
    let (runner, _) = runner_with(llm.clone(), WorkflowConfig::default()).await;

    let err = runner.handle("t1", "beam me up").await.unwrap_err();
    assert!(matches!(err, AgentError::UnknownTool(ref n) if n == "teleport"));

    let reply = runner.handle("t1", "hello?").await.unwrap();
    assert_eq!(reply.text, "back on track");
    assert!(reply.state.messages()[2].content().contains("unknown tool: teleport"));
    assert_eq!(reply.state.messages()[3].content(), "hello?");
    assert_eq!(llm.call_count(), 2);
}
