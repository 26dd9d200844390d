//! Run config: backend endpoints, model, storage paths, limits. Filled from env / .env.
//!
//! Interacts with [`RunOptions`](super::RunOptions), [`run_with_config`](crate::run_with_config)
//! and catalog_agent's `WorkflowConfig`, `ToolChoiceMode`.

use std::path::PathBuf;

use catalog_agent::{ToolChoiceMode, WorkflowConfig};

use super::RunOptions;

/// Error type used for config loading and CLI runs.
pub type Error = Box<dyn std::error::Error + Send + Sync>;

/// Default embedding model; its vectors have 1536 dimensions.
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";

/// Run config for one CLI invocation.
#[derive(Clone, Debug)]
pub struct RunConfig {
    /// OpenAI API base URL, e.g. `https://api.openai.com/v1`.
    pub api_base: String,
    /// OpenAI API key.
    pub api_key: String,
    /// Model name, e.g. `gpt-4o-mini`.
    pub model: String,
    /// Sampling temperature 0–2. Default 0.0 so tool decisions are repeatable.
    pub temperature: f32,
    /// Tool choice mode: auto (model chooses), none (no tools), required (must use tools).
    pub tool_choice: Option<ToolChoiceMode>,
    /// Embeddings API key. If not set, uses OPENAI_API_KEY.
    pub embedding_api_key: Option<String>,
    /// Embeddings API base URL. If not set, uses OPENAI_API_BASE.
    pub embedding_api_base: Option<String>,
    /// Embeddings model name.
    pub embedding_model: Option<String>,
    /// SQLite path for conversation checkpoints.
    pub db_path: String,
    /// SQLite path for the item catalog.
    pub catalog_db_path: String,
    /// Maximum generation entries per message.
    pub recursion_limit: u32,
    /// Thread to continue; `None` starts a new one.
    pub thread_id: Option<String>,
    /// Catalog JSON to load before running.
    pub catalog_json: Option<PathBuf>,
    /// When true, debug logs go to stderr.
    pub verbose: bool,
}

impl RunConfig {
    /// Fill config from env vars (and .env). Call `dotenv::dotenv().ok()` first, or use
    /// [`run`](crate::run) which does.
    ///
    /// `OPENAI_API_KEY` required; `OPENAI_API_BASE`, `OPENAI_MODEL`, `OPENAI_TEMPERATURE` have
    /// defaults. `OPENAI_TOOL_CHOICE` (auto|none|required) optional.
    /// Embeddings: `EMBEDDING_API_KEY`, `EMBEDDING_API_BASE`, `EMBEDDING_MODEL` optional.
    /// Storage: `DB_PATH` (default `threads.db`), `CATALOG_DB_PATH` (default `catalog.db`).
    /// `RECURSION_LIMIT` optional (default 15).
    pub fn from_env() -> Result<Self, Error> {
        let api_key = std::env::var("OPENAI_API_KEY").map_err(|_| {
            std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "OPENAI_API_KEY is not set; please configure it in .env",
            )
        })?;
        let api_base = std::env::var("OPENAI_API_BASE")
            .unwrap_or_else(|_| "https://api.openai.com/v1".to_string());
        let model = std::env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string());
        let temperature = match std::env::var("OPENAI_TEMPERATURE") {
            Ok(s) => s
                .parse()
                .map_err(|_| format!("OPENAI_TEMPERATURE is not a number: {}", s))?,
            Err(_) => 0.0,
        };
        let tool_choice = match std::env::var("OPENAI_TOOL_CHOICE") {
            Ok(s) => Some(s.parse::<ToolChoiceMode>()?),
            Err(_) => None,
        };
        let recursion_limit = match std::env::var("RECURSION_LIMIT") {
            Ok(s) => s
                .parse()
                .map_err(|_| format!("RECURSION_LIMIT is not a positive integer: {}", s))?,
            Err(_) => WorkflowConfig::default().recursion_limit,
        };
        Ok(Self {
            api_base,
            api_key,
            model,
            temperature,
            tool_choice,
            embedding_api_key: std::env::var("EMBEDDING_API_KEY").ok(),
            embedding_api_base: std::env::var("EMBEDDING_API_BASE").ok(),
            embedding_model: std::env::var("EMBEDDING_MODEL").ok(),
            db_path: std::env::var("DB_PATH").unwrap_or_else(|_| "threads.db".to_string()),
            catalog_db_path: std::env::var("CATALOG_DB_PATH")
                .unwrap_or_else(|_| "catalog.db".to_string()),
            recursion_limit,
            thread_id: None,
            catalog_json: None,
            verbose: false,
        })
    }

    /// Apply optional overrides from `RunOptions`; only set fields override.
    pub fn apply_options(&mut self, options: &RunOptions) {
        if let Some(t) = &options.thread_id {
            self.thread_id = Some(t.clone());
        }
        if let Some(p) = &options.catalog_json {
            self.catalog_json = Some(p.clone());
        }
        if let Some(p) = &options.db_path {
            self.db_path = p.clone();
        }
        if let Some(p) = &options.catalog_db_path {
            self.catalog_db_path = p.clone();
        }
        if let Some(t) = options.temperature {
            self.temperature = t;
        }
        self.verbose = options.verbose;
    }

    /// Get the effective embedding API key (falls back to OPENAI_API_KEY if not set).
    pub fn embedding_api_key(&self) -> &str {
        self.embedding_api_key.as_deref().unwrap_or(&self.api_key)
    }

    /// Get the effective embedding API base URL (falls back to OPENAI_API_BASE if not set).
    pub fn embedding_api_base(&self) -> &str {
        self.embedding_api_base.as_deref().unwrap_or(&self.api_base)
    }

    pub fn embedding_model(&self) -> &str {
        self.embedding_model
            .as_deref()
            .unwrap_or(DEFAULT_EMBEDDING_MODEL)
    }

    /// Library config for the agent runner.
    pub fn workflow_config(&self) -> WorkflowConfig {
        WorkflowConfig::default().with_recursion_limit(self.recursion_limit)
    }
}
