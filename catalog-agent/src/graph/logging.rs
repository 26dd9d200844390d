//! Logging utilities for workflow execution.
//!
//! Structured `tracing` events for runs, node execution and checkpointing.

use tracing::{debug, error, info, warn};

use super::Phase;
use crate::error::AgentError;
use crate::memory::CheckpointError;

/// Log workflow run start.
pub fn log_run_start(thread_id: Option<&str>, phase: Phase, messages: usize) {
    info!(thread_id, %phase, messages, "Starting workflow run");
}

/// Log node execution start.
pub fn log_node_start(node_id: &str, step: u64) {
    debug!(node_id, step, "Starting node execution");
}

/// Log node execution completion.
pub fn log_node_complete(node_id: &str, appended: usize, next: Phase) {
    debug!(node_id, appended, %next, "Node execution complete");
}

/// Log a checkpoint that could not be saved. The run continues.
pub fn log_checkpoint_failed(step: u64, error: &CheckpointError) {
    warn!(step, %error, "Checkpoint save failed; continuing without it");
}

/// Log workflow run completion.
pub fn log_run_complete(generation_steps: u32, messages: usize) {
    info!(generation_steps, messages, "Workflow run complete");
}

/// Log workflow run error.
pub fn log_run_error(error: &AgentError) {
    error!(%error, "Workflow run failed");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logging_functions() {
        log_run_start(Some("t1"), Phase::AwaitingGeneration, 1);
        log_node_start("generate", 0);
        log_node_complete("generate", 1, Phase::Done);
        log_checkpoint_failed(3, &CheckpointError::Storage("disk full".into()));
        log_run_complete(2, 5);
        log_run_error(&AgentError::RecursionLimitExceeded { limit: 15 });
    }
}
