//! The oak table conversation through the real lookup tool and in-memory catalog.

use std::sync::Arc;

use catalog_agent::{LlmResponse, LookupResult, Message, MockLlm, SearchType, WorkflowConfig};

use crate::common::{lookup_call, runner_with};

/// **Scenario**: Backend asks for a lookup, the tool finds "Oak Table" semantically, the
/// backend answers; the reply is that answer after exactly 2 generation entries.
#[tokio::test]
async fn oak_table_found_in_two_generations() {
    let llm = Arc::new(MockLlm::new(vec![
        lookup_call("call_1", "oak table"),
        LlmResponse::text("Yes, we have the Oak Table for $499."),
    ]));
    let (runner, _) = runner_with(llm.clone(), WorkflowConfig::default()).await;

    let reply = runner
        .handle("thread-oak", "Do you have an oak table?")
        .await
        .unwrap();

    assert_eq!(reply.text, "Yes, we have the Oak Table for $499.");
    assert_eq!(reply.generation_steps, 2);
    assert_eq!(llm.call_count(), 2);
    assert!(reply.persistence_errors.is_empty());

    let messages = reply.state.messages();
    assert_eq!(messages.len(), 4);
    let Message::Tool { call_id, content, .. } = &messages[2] else {
        panic!("expected tool result, got {:?}", messages[2]);
    };
    assert_eq!(call_id, "call_1");
    let LookupResult::Found(found) = LookupResult::from_text(content).unwrap() else {
        panic!("expected results: {}", content);
    };
    assert_eq!(found.search_type, SearchType::Semantic);
    assert_eq!(found.count, found.results.len());
    assert_eq!(found.results[0].item.name, "Oak Table");

    // The second request showed the backend the tool result.
    let second = &llm.requests()[1];
    assert_eq!(second.messages.len(), 3);
    assert_eq!(second.tool_names, vec!["lookup_inventory".to_string()]);
}

/// **Scenario**: The final state is what the thread stores.
#[tokio::test]
async fn final_state_is_checkpointed() {
    let llm = Arc::new(MockLlm::new(vec![
        lookup_call("call_1", "oak table"),
        LlmResponse::text("Oak Table is in stock."),
    ]));
    let (runner, _) = runner_with(llm, WorkflowConfig::default()).await;
    let reply = runner.handle("t", "oak table?").await.unwrap();
    let stored = runner.state_at("t", None).await.unwrap().unwrap();
    assert_eq!(stored, reply.state);
}
