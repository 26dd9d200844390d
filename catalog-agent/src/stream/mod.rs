//! Streaming events emitted while a workflow runs.
//!
//! Produced by `Workflow::stream` and `AgentRunner::handle_streaming`.

use crate::graph::Phase;
use crate::message::Message;
use crate::state::ConversationState;

/// Streamed event emitted while running the workflow.
#[derive(Clone, Debug, PartialEq)]
pub enum StreamEvent {
    /// The run entered a phase (emitted before the phase's node runs).
    PhaseEntered(Phase),
    /// Messages a node appended, with the node id.
    Updates { node: String, appended: Vec<Message> },
    /// Full state snapshot after a node's update was applied.
    Values(ConversationState),
    /// A checkpoint could not be saved; the run continues.
    CheckpointFailed(String),
}

impl StreamEvent {
    /// Short label for progress output.
    pub fn label(&self) -> String {
        match self {
            Self::PhaseEntered(p) => format!("phase {}", p),
            Self::Updates { node, appended } => format!("{} +{}", node, appended.len()),
            Self::Values(s) => format!("state {} messages", s.len()),
            Self::CheckpointFailed(e) => format!("checkpoint failed: {}", e),
        }
    }
}
