//! Calls on one thread build on the stored conversation.

use std::sync::Arc;

use catalog_agent::{LlmResponse, Message, MockLlm, WorkflowConfig};

use crate::common::{lookup_call, runner_with};

/// **Scenario**: The resumed run's final state starts with the stored state followed by the
/// new user message, and adds at least an assistant reply after it.
#[tokio::test]
async fn resumed_state_extends_saved_prefix() {
    let llm = Arc::new(MockLlm::new(vec![
        LlmResponse::text("Hi! How can I help?"),
        lookup_call("call_1", "pine chair"),
        LlmResponse::text("The Pine Chair costs $89."),
    ]));
    let (runner, _) = runner_with(llm, WorkflowConfig::default()).await;

    runner.handle("t1", "hello").await.unwrap();
    let saved = runner.state_at("t1", None).await.unwrap().unwrap();
    assert_eq!(saved.len(), 2);

    let reply = runner.handle("t1", "how much is the pine chair?").await.unwrap();
    let messages = reply.state.messages();
    assert_eq!(&messages[..saved.len()], saved.messages());
    assert_eq!(
        messages[saved.len()],
        Message::user("how much is the pine chair?")
    );
    assert!(reply.state.len() >= saved.len() + 2);
    // One tool round: assistant with call, tool result, final assistant.
    assert_eq!(reply.state.len(), saved.len() + 4);
    assert_eq!(reply.text, "The Pine Chair costs $89.");
}

/// **Scenario**: Different threads do not see each other's history.
#[tokio::test]
async fn threads_are_isolated() {
    let llm = Arc::new(MockLlm::answering("ok"));
    let (runner, _) = runner_with(llm.clone(), WorkflowConfig::default()).await;
    runner.handle("a", "first").await.unwrap();
    runner.handle("a", "second").await.unwrap();
    let reply = runner.handle("b", "other").await.unwrap();
    assert_eq!(reply.state.len(), 2);
    assert_eq!(llm.requests()[2].messages, vec![Message::user("other")]);
}

/// **Scenario**: History lists every checkpoint newest first, ending with the reply.
#[tokio::test]
async fn history_lists_checkpoints_newest_first() {
    let llm = Arc::new(MockLlm::new(vec![
        lookup_call("call_1", "oak"),
        LlmResponse::text("found it"),
    ]));
    let (runner, _) = runner_with(llm, WorkflowConfig::default()).await;
    runner.handle("t1", "oak?").await.unwrap();
    let history = runner.history("t1", None).await.unwrap();
    let steps: Vec<u64> = history.iter().map(|h| h.metadata.step).collect();
    assert_eq!(steps, vec![3, 2, 1, 0]);
    assert_eq!(runner.history("t1", Some(2)).await.unwrap().len(), 2);
}
