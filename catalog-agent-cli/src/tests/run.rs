//! Integration-style tests for [`run_with_backends`](crate::run_with_backends),
//! [`history_with_backends`](crate::history_with_backends) and
//! [`load_catalog_file`](crate::load_catalog_file).
//!
//! Scenarios: a catalog file is loaded and searched; the thread id is reused or assigned;
//! agent failures come back as user-facing errors; history needs a thread id.

use std::io::Write;
use std::sync::Arc;

use catalog_agent::{
    CatalogStore, ConversationState, InMemoryCatalog, LlmError, LlmResponse, MemorySaver,
    MockEmbedder, MockLlm, ToolCall, UserFacingError,
};

use crate::config::RunConfig;
use crate::{history_with_backends, load_catalog_file, run_with_backends, Backends};

fn test_config() -> RunConfig {
    RunConfig {
        api_base: "http://localhost".into(),
        api_key: "test".into(),
        model: "mock".into(),
        temperature: 0.0,
        tool_choice: None,
        embedding_api_key: None,
        embedding_api_base: None,
        embedding_model: None,
        db_path: "unused.db".into(),
        catalog_db_path: "unused-catalog.db".into(),
        recursion_limit: 15,
        thread_id: None,
        catalog_json: None,
        verbose: false,
    }
}

fn backends(llm: Arc<MockLlm>) -> (Backends, Arc<InMemoryCatalog>) {
    let catalog = Arc::new(InMemoryCatalog::new());
    let backends = Backends {
        llm,
        embedder: Arc::new(MockEmbedder::default()),
        catalog: catalog.clone(),
        checkpointer: Some(Arc::new(MemorySaver::<ConversationState>::new())),
    };
    (backends, catalog)
}

fn catalog_file() -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"[
            {{"id": "1", "name": "Oak Table", "description": "Solid oak", "categories": ["tables"], "price": 499.0, "quantity": 3}},
            {{"id": "2", "name": "Pine Chair", "categories": ["chairs"]}}
        ]"#
    )
    .unwrap();
    file
}

/// **Scenario**: load_catalog_file embeds and stores every item in the file.
///
/// Given: a JSON file with two items without vectors  
/// When: load_catalog_file runs  
/// Then: it reports 2, the catalog holds 2 items and the embedder ran twice
#[tokio::test]
async fn load_catalog_file_embeds_and_upserts() {
    let file = catalog_file();
    let embedder = MockEmbedder::default();
    let catalog = InMemoryCatalog::new();
    let n = load_catalog_file(file.path(), &embedder, &catalog).await.unwrap();
    assert_eq!(n, 2);
    assert_eq!(catalog.count().await.unwrap(), 2);
    assert_eq!(embedder.call_count(), 2);
}

/// **Scenario**: A malformed file is an error naming the file.
#[tokio::test]
async fn load_catalog_file_rejects_invalid_json() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "not json").unwrap();
    let err = load_catalog_file(file.path(), &MockEmbedder::default(), &InMemoryCatalog::new())
        .await
        .unwrap_err();
    assert!(err.to_string().contains("invalid catalog file"), "{}", err);
}

/// **Scenario**: With --catalog-json and a thread id, the reply comes from that thread after
/// a lookup over the loaded items.
///
/// Given: a catalog file and a mock backend that looks up "oak table" then answers  
/// When: run_with_backends runs on thread "t-cli"  
/// Then: the output carries "t-cli", the answer, and the tool result names the Oak Table
#[tokio::test]
async fn run_with_backends_loads_catalog_and_answers() {
    let file = catalog_file();
    let llm = Arc::new(MockLlm::new(vec![
        LlmResponse::tool_calls(vec![ToolCall::new(
            "call_1",
            "lookup_inventory",
            r#"{"query":"oak table"}"#,
        )]),
        LlmResponse::text("We have the Oak Table."),
    ]));
    let (backends, catalog) = backends(llm);
    let mut config = test_config();
    config.thread_id = Some("t-cli".into());
    config.catalog_json = Some(file.path().to_path_buf());

    let out = run_with_backends(&config, backends, "Do you have an oak table?")
        .await
        .unwrap();

    assert_eq!(out.thread_id, "t-cli");
    let reply = out.reply.unwrap();
    assert_eq!(reply.text, "We have the Oak Table.");
    assert!(reply.state.messages()[2].content().contains("Oak Table"));
    assert_eq!(catalog.count().await.unwrap(), 2);
}

/// **Scenario**: Without a thread id a fresh time-derived one is assigned.
#[tokio::test]
async fn run_without_thread_id_assigns_one() {
    let (backends, _) = backends(Arc::new(MockLlm::answering("hi")));
    let out = run_with_backends(&test_config(), backends, "hello").await.unwrap();
    assert!(out.thread_id.starts_with("thread-"), "{}", out.thread_id);
    assert_eq!(out.reply.unwrap().text, "hi");
}

/// **Scenario**: A backend auth failure is reported as the authentication category.
#[tokio::test]
async fn agent_failure_becomes_user_facing_error() {
    let llm = Arc::new(MockLlm::with_results(vec![Err(LlmError::Unauthenticated(
        "401".into(),
    ))]));
    let (backends, _) = backends(llm);
    let out = run_with_backends(&test_config(), backends, "hello").await.unwrap();
    assert_eq!(out.reply.unwrap_err(), UserFacingError::AuthenticationFailed);
}

/// **Scenario**: History lists the thread's checkpoints after a run, and needs a thread id.
#[tokio::test]
async fn history_lists_checkpoints_for_thread() {
    let (backends, _) = backends(Arc::new(MockLlm::answering("ok")));
    let mut config = test_config();

    let err = history_with_backends(&config, backends.clone()).await.unwrap_err();
    assert!(err.to_string().contains("thread id"), "{}", err);

    config.thread_id = Some("t-h".into());
    run_with_backends(&config, backends.clone(), "hello").await.unwrap();
    let lines = history_with_backends(&config, backends).await.unwrap();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].contains("step=1 source=update"), "{}", lines[0]);
    assert!(lines[1].contains("step=0 source=input"), "{}", lines[1]);
}
