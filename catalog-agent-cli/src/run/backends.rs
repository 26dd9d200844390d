//! Backends a run needs: generation, embeddings, catalog, checkpoints.
//!
//! [`Backends::from_config`] wires the real ones: `ChatOpenAI` and `OpenAIEmbedder` (feature
//! `openai`), `SqliteCatalog` and `SqliteSaver` (feature `sqlite`), otherwise the in-memory
//! catalog and `MemorySaver`. Tests build [`Backends`] directly from mocks.

use std::sync::Arc;

use catalog_agent::{
    AgentRunner, CatalogStore, Checkpointer, ConversationState, Embedder, LlmClient,
};

use crate::config::RunConfig;

use super::Error;

/// Handles to everything the agent runner talks to.
#[derive(Clone)]
pub struct Backends {
    pub llm: Arc<dyn LlmClient>,
    pub embedder: Arc<dyn Embedder>,
    pub catalog: Arc<dyn CatalogStore>,
    pub checkpointer: Option<Arc<dyn Checkpointer<ConversationState>>>,
}

impl Backends {
    /// Real backends from `config`.
    #[cfg(feature = "openai")]
    pub fn from_config(config: &RunConfig) -> Result<Self, Error> {
        use async_openai::config::OpenAIConfig;
        use catalog_agent::{ChatOpenAI, OpenAIEmbedder};

        let chat_config = OpenAIConfig::new()
            .with_api_base(&config.api_base)
            .with_api_key(config.api_key.clone());
        let mut llm = ChatOpenAI::with_config(chat_config, config.model.clone())
            .with_temperature(config.temperature);
        if let Some(tc) = config.tool_choice {
            llm = llm.with_tool_choice(tc);
        }

        let embedding_config = OpenAIConfig::new()
            .with_api_base(config.embedding_api_base())
            .with_api_key(config.embedding_api_key().to_string());
        let embedder = OpenAIEmbedder::with_config(embedding_config, config.embedding_model());

        let (catalog, checkpointer) = stores(config)?;
        Ok(Self {
            llm: Arc::new(llm),
            embedder: Arc::new(embedder),
            catalog,
            checkpointer: Some(checkpointer),
        })
    }

    /// Without the `openai` feature there is no real generation backend to wire.
    #[cfg(not(feature = "openai"))]
    pub fn from_config(_config: &RunConfig) -> Result<Self, Error> {
        Err("catalog-agent-cli was built without the `openai` feature".into())
    }

    /// Runner over these backends with the lookup tool registered.
    pub fn into_runner(self, config: &RunConfig) -> AgentRunner {
        AgentRunner::with_catalog(
            self.llm,
            self.catalog,
            self.embedder,
            self.checkpointer,
            config.workflow_config(),
        )
    }
}

#[cfg(feature = "openai")]
type Stores = (
    Arc<dyn CatalogStore>,
    Arc<dyn Checkpointer<ConversationState>>,
);

#[cfg(all(feature = "openai", feature = "sqlite"))]
fn stores(config: &RunConfig) -> Result<Stores, Error> {
    use catalog_agent::{JsonSerializer, SqliteCatalog, SqliteSaver};

    let catalog = SqliteCatalog::new(&config.catalog_db_path)?;
    let saver = SqliteSaver::<ConversationState>::new(&config.db_path, Arc::new(JsonSerializer))?;
    Ok((Arc::new(catalog), Arc::new(saver)))
}

#[cfg(all(feature = "openai", not(feature = "sqlite")))]
fn stores(_config: &RunConfig) -> Result<Stores, Error> {
    use catalog_agent::{InMemoryCatalog, MemorySaver};

    tracing::warn!("Built without `sqlite`; catalog and threads live only for this process");
    Ok((
        Arc::new(InMemoryCatalog::new()),
        Arc::new(MemorySaver::<ConversationState>::new()),
    ))
}
