//! # Catalog Agent
//!
//! A resumable tool-calling agent over an item catalog. Each user message runs a small state
//! machine: the generation backend either answers or asks for catalog lookups; lookups run and
//! their results go back to the backend, until it answers without tool calls. Conversation
//! state is checkpointed per thread so the next message resumes where the last one ended.
//!
//! ## Design Principles
//!
//! - **Append-only state**: [`ConversationState`] only grows; nodes return the messages to
//!   append and the workflow concatenates them.
//! - **Explicit phases**: [`Phase`] plus the pure transition [`next_phase`] replace edge
//!   routing; [`Workflow`] is the interpreter loop, bounded by a recursion limit.
//! - **Errors as content for tools**: the lookup tool turns search failures into a result
//!   envelope the model reads; workflow failures map onto three [`UserFacingError`]s.
//! - **Best-effort persistence**: failed checkpoint saves are reported with the reply, never
//!   instead of it.
//!
//! ## Main Modules
//!
//! - [`react`]: [`AgentRunner`] entry point, [`GenerateStep`], [`ToolExecutionStep`].
//! - [`graph`]: [`Workflow`], [`Phase`], [`Node`], [`RunContext`].
//! - [`tools`]: [`Tool`], [`ToolRegistry`], [`HybridLookupTool`] and its [`LookupResult`].
//! - [`catalog`]: [`CatalogStore`] with in-memory and SQLite backends.
//! - [`llm`] / [`embedding`]: backend traits, mocks, and OpenAI clients (feature `openai`).
//! - [`memory`]: [`Checkpointer`] with [`MemorySaver`] and `SqliteSaver` (feature `sqlite`).
//! - [`retry`]: exponential backoff for rate-limited calls.
//!
//! ## Features
//!
//! - `sqlite` (default): persistent checkpointer and catalog.
//! - `in-memory-vector` (default): `InMemoryCatalog`.
//! - `openai`: `ChatOpenAI` and `OpenAIEmbedder` via `async-openai`.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use catalog_agent::{
//!     AgentRunner, ConversationState, InMemoryCatalog, MemorySaver, MockEmbedder, MockLlm,
//!     WorkflowConfig,
//! };
//!
//! # #[tokio::main]
//! # async fn main() {
//! let catalog = Arc::new(InMemoryCatalog::new());
//! let embedder = Arc::new(MockEmbedder::new(64));
//! let runner = AgentRunner::with_catalog(
//!     Arc::new(MockLlm::answering("Hello!")),
//!     catalog,
//!     embedder,
//!     Some(Arc::new(MemorySaver::<ConversationState>::new())),
//!     WorkflowConfig::default(),
//! );
//! let reply = runner.handle("thread-1", "hi").await.unwrap();
//! println!("{}", reply.text);
//! # }
//! ```

pub mod catalog;
pub mod config;
pub mod embedding;
pub mod error;
pub mod graph;
pub mod llm;
pub mod memory;
pub mod message;
pub mod react;
pub mod retry;
pub mod state;
pub mod stream;
pub mod tools;

pub use catalog::{index_items, CatalogError, CatalogHit, CatalogItem, CatalogStore, TextField};
#[cfg(feature = "in-memory-vector")]
pub use catalog::InMemoryCatalog;
#[cfg(feature = "sqlite")]
pub use catalog::SqliteCatalog;
pub use config::WorkflowConfig;
pub use embedding::{Embedder, EmbedderError, MockEmbedder};
#[cfg(feature = "openai")]
pub use embedding::OpenAIEmbedder;
pub use error::{AgentError, UserFacingError};
pub use graph::{next_phase, Node, Phase, RunContext, RunOutcome, Workflow};
pub use llm::{LlmClient, LlmError, LlmResponse, MockLlm, ToolChoiceMode};
#[cfg(feature = "openai")]
pub use llm::ChatOpenAI;
pub use memory::{
    Checkpoint, CheckpointError, CheckpointListItem, CheckpointMetadata, CheckpointSource,
    Checkpointer, JsonSerializer, MemorySaver, RunnableConfig,
};
#[cfg(feature = "sqlite")]
pub use memory::SqliteSaver;
pub use message::{Message, ToolCall};
pub use react::{
    AgentReply, AgentRunner, GenerateStep, HandleToolErrors, ToolExecutionStep, SYSTEM_PROMPT,
};
pub use retry::{retry, RetryError, RetryPolicy};
pub use state::{ConversationState, StateUpdate};
pub use stream::StreamEvent;
pub use tools::{
    HybridLookupTool, LookupResult, SearchType, Tool, ToolCallContent, ToolError, ToolRegistry,
    ToolSpec,
};
