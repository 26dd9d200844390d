//! # Memory: per-thread checkpointing
//!
//! A checkpointer stores snapshots of a thread's [`ConversationState`](crate::state::ConversationState)
//! so the next call on the same thread resumes the conversation instead of starting fresh.
//! Keys are `(thread_id, checkpoint_ns, checkpoint_id)`.
//!
//! ## Config
//!
//! [`RunnableConfig`] is passed to `Workflow::invoke`. When using a checkpointer:
//! - `thread_id`: Required. Identifies the conversation/thread.
//! - `checkpoint_id`: Optional. Load a specific checkpoint instead of the latest.
//! - `checkpoint_ns`: Optional namespace.
//!
//! ## Checkpointer Implementations
//!
//! | Type             | Persistence | Use case                    | Feature  |
//! |------------------|-------------|-----------------------------|----------|
//! | [`MemorySaver`]  | In-memory   | Dev, tests                  | (none)   |
//! | [`SqliteSaver`]  | SQLite file | Single-node, CLI            | `sqlite` |
//!
//! [`JsonSerializer`] is required for `SqliteSaver` (state must be `Serialize + DeserializeOwned`).
//!
//! Persistence is best effort: the workflow reports save failures with its outcome but still
//! returns the answer it computed.

mod checkpoint;
mod checkpointer;
mod config;
mod memory_saver;
mod serializer;

#[cfg(feature = "sqlite")]
mod sqlite_saver;

pub use checkpoint::{Checkpoint, CheckpointListItem, CheckpointMetadata, CheckpointSource};
pub use checkpointer::{CheckpointError, Checkpointer};
pub use config::RunnableConfig;
pub use memory_saver::MemorySaver;
pub use serializer::{JsonSerializer, Serializer};

#[cfg(feature = "sqlite")]
pub use sqlite_saver::SqliteSaver;
