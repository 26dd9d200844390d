//! Node trait: one workflow step that reads the conversation and returns messages to append.

use async_trait::async_trait;

use crate::error::AgentError;
use crate::state::{ConversationState, StateUpdate};

/// One step of the workflow.
///
/// A node never mutates the state; it returns the messages to append and the workflow
/// applies them. Implementations: `GenerateStep` (id `generate`) and `ToolExecutionStep`
/// (id `tools`).
#[async_trait]
pub trait Node: Send + Sync {
    /// Node id used in logs, stream events and errors.
    fn id(&self) -> &str;

    async fn run(&self, state: &ConversationState) -> Result<StateUpdate, AgentError>;
}
