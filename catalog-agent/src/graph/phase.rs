//! Workflow phases and the transition function between them.

use std::fmt;

use crate::message::Message;
use crate::state::ConversationState;

/// Where a run is. `AwaitingGeneration` is initial, `Done` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    AwaitingGeneration,
    AwaitingToolExecution,
    Done,
}

impl Phase {
    /// Phase to start from for `state`.
    ///
    /// A fresh user message or a finished tool round needs generation; an assistant message
    /// whose tool calls are unanswered needs tool execution; a final assistant message is done.
    pub fn resume_from(state: &ConversationState) -> Phase {
        match state.last() {
            None | Some(Message::User { .. }) => Phase::AwaitingGeneration,
            Some(_) if !state.pending_tool_calls().is_empty() => Phase::AwaitingToolExecution,
            Some(Message::Tool { .. }) => Phase::AwaitingGeneration,
            Some(Message::Assistant { .. }) => Phase::Done,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Phase::Done)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::AwaitingGeneration => "awaiting_generation",
            Phase::AwaitingToolExecution => "awaiting_tool_execution",
            Phase::Done => "done",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Phase after generation produced `message`: tool execution when it carries tool calls,
/// otherwise done.
pub fn next_phase(message: &Message) -> Phase {
    if message.has_tool_calls() {
        Phase::AwaitingToolExecution
    } else {
        Phase::Done
    }
}
