//! Checkpoint and metadata types.
//!
//! A checkpoint is one snapshot of a thread's conversation state plus where it came from.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};

/// Metadata for a single checkpoint (source, step, created_at).
///
/// `step` counts workflow steps for the thread and keeps growing across runs, so the newest
/// checkpoint always has the highest step.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckpointMetadata {
    pub source: CheckpointSource,
    pub step: u64,
    pub created_at: Option<DateTime<Utc>>,
}

/// Source of the checkpoint.
///
/// `Input`: the caller's message was merged in. `Loop`: a workflow step finished.
/// `Update`: the run reached its final state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckpointSource {
    Input,
    Loop,
    Update,
}

impl CheckpointSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Input => "input",
            Self::Loop => "loop",
            Self::Update => "update",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "input" => Some(Self::Input),
            "loop" => Some(Self::Loop),
            "update" => Some(Self::Update),
            _ => None,
        }
    }
}

/// One checkpoint: state snapshot plus id/ts.
///
/// Stored by a Checkpointer keyed by (thread_id, checkpoint_ns, checkpoint_id).
///
/// **Interaction**: Produced by the workflow and the entry point; consumed by
/// `Checkpointer::put`, returned by `get_tuple`.
#[derive(Debug, Clone)]
pub struct Checkpoint<S> {
    pub id: String,
    pub ts: String,
    pub state: S,
    pub metadata: CheckpointMetadata,
}

/// Item returned by Checkpointer::list for history.
#[derive(Debug, Clone)]
pub struct CheckpointListItem {
    pub checkpoint_id: String,
    pub metadata: CheckpointMetadata,
}

static CHECKPOINT_SEQ: AtomicU64 = AtomicU64::new(0);

impl<S> Checkpoint<S> {
    /// Creates a checkpoint from current state. Id is `{millis}-{step}-{seq}`, unique within
    /// the process even for checkpoints taken in the same millisecond.
    pub fn from_state(state: S, source: CheckpointSource, step: u64) -> Self {
        let now = Utc::now();
        let ts = now.timestamp_millis().to_string();
        let seq = CHECKPOINT_SEQ.fetch_add(1, Ordering::Relaxed);
        Self {
            id: format!("{}-{}-{}", ts, step, seq),
            ts,
            state,
            metadata: CheckpointMetadata {
                source,
                step,
                created_at: Some(now),
            },
        }
    }
}
