//! Conversation state: the append-only message sequence owned by one workflow run.
//!
//! Nodes never mutate the state directly; they return a [`StateUpdate`] (new messages) and
//! the workflow concatenates it onto the state. Concatenation is the only merge operation, so
//! two updates from different nodes combine in order and nothing is replaced or removed.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::message::{Message, ToolCall};

/// Partial update produced by one node: messages to append, in order.
pub type StateUpdate = Vec<Message>;

/// Ordered, append-only sequence of messages for one thread.
///
/// Persisted per thread id by a [`Checkpointer`](crate::memory::Checkpointer) and passed
/// through [`Workflow::invoke`](crate::graph::Workflow::invoke).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConversationState {
    messages: Vec<Message>,
}

impl ConversationState {
    /// Creates an empty conversation.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a conversation from an existing history (e.g. loaded from storage).
    pub fn from_messages(messages: Vec<Message>) -> Self {
        Self { messages }
    }

    /// All messages, oldest first.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Appends one message.
    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Merges a node update by concatenation.
    pub fn apply(&mut self, update: StateUpdate) {
        self.messages.extend(update);
    }

    /// Tool calls of the latest assistant message that have no tool result yet, in call order.
    ///
    /// Non-empty only when a run stopped between generation and tool execution.
    pub fn pending_tool_calls(&self) -> Vec<ToolCall> {
        let Some(pos) = self
            .messages
            .iter()
            .rposition(|m| matches!(m, Message::Assistant { .. }))
        else {
            return Vec::new();
        };
        let answered: HashSet<&str> = self.messages[pos + 1..]
            .iter()
            .filter_map(|m| match m {
                Message::Tool { call_id, .. } => Some(call_id.as_str()),
                _ => None,
            })
            .collect();
        self.messages[pos]
            .tool_calls()
            .iter()
            .filter(|tc| !answered.contains(tc.id.as_str()))
            .cloned()
            .collect()
    }

    /// Content of the last message, or `None` for an empty conversation.
    pub fn last_text(&self) -> Option<&str> {
        self.messages.last().map(Message::content)
    }
}
