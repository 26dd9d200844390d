//! Shared fixtures for the agent_runner integration tests.

use std::sync::Arc;

use async_trait::async_trait;
use catalog_agent::{
    index_items, AgentRunner, CatalogItem, Checkpoint, CheckpointError, CheckpointListItem,
    CheckpointMetadata, Checkpointer, ConversationState, InMemoryCatalog, LlmResponse,
    MemorySaver, MockEmbedder, MockLlm, RunnableConfig, ToolCall, WorkflowConfig,
};

/// Catalog with an embedded "Oak Table" and "Pine Chair".
pub async fn furniture_catalog(embedder: &MockEmbedder) -> Arc<InMemoryCatalog> {
    let items = vec![
        CatalogItem::new("1", "Oak Table")
            .with_description("Solid oak dining table")
            .with_categories(["furniture", "tables"])
            .with_price(499.0)
            .with_quantity(3),
        CatalogItem::new("2", "Pine Chair")
            .with_description("Pine wood chair")
            .with_categories(["furniture", "chairs"])
            .with_price(89.0)
            .with_quantity(12),
    ];
    let indexed = index_items(embedder, items).await.unwrap();
    Arc::new(InMemoryCatalog::with_items(indexed))
}

/// Backend reply requesting one inventory lookup.
pub fn lookup_call(id: &str, query: &str) -> LlmResponse {
    LlmResponse::tool_calls(vec![ToolCall::new(
        id,
        "lookup_inventory",
        serde_json::json!({ "query": query }).to_string(),
    )])
}

/// Runner over the furniture catalog with a MemorySaver.
pub async fn runner_with(
    llm: Arc<MockLlm>,
    config: WorkflowConfig,
) -> (AgentRunner, Arc<MemorySaver<ConversationState>>) {
    let embedder = Arc::new(MockEmbedder::default());
    let catalog = furniture_catalog(&embedder).await;
    let saver = Arc::new(MemorySaver::new());
    let runner = AgentRunner::with_catalog(llm, catalog, embedder, Some(saver.clone()), config);
    (runner, saver)
}

/// Checkpointer whose reads work (always empty) and whose writes fail.
pub struct ReadOnlySaver;

#[async_trait]
impl Checkpointer<ConversationState> for ReadOnlySaver {
    async fn put(
        &self,
        _: &RunnableConfig,
        _: &Checkpoint<ConversationState>,
    ) -> Result<String, CheckpointError> {
        Err(CheckpointError::Storage("database is locked".into()))
    }

    async fn get_tuple(
        &self,
        _: &RunnableConfig,
    ) -> Result<Option<(Checkpoint<ConversationState>, CheckpointMetadata)>, CheckpointError> {
        Ok(None)
    }

    async fn list(
        &self,
        _: &RunnableConfig,
        _: Option<usize>,
        _: Option<&str>,
        _: Option<&str>,
    ) -> Result<Vec<CheckpointListItem>, CheckpointError> {
        Ok(Vec::new())
    }
}
