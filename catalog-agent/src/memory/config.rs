//! Run config: thread_id, checkpoint_id, checkpoint_ns.
//!
//! Identifies which thread (and optionally which snapshot) a run reads and writes.

/// Config for a single run. Identifies the thread and optional checkpoint.
///
/// When using a checkpointer, a run must provide at least `thread_id`.
///
/// **Interaction**: Passed to `Workflow::invoke` and `Checkpointer::put` / `get_tuple` / `list`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunnableConfig {
    /// Unique id for this conversation/thread. Required when using a checkpointer.
    pub thread_id: Option<String>,
    /// If set, load state from this checkpoint instead of the latest.
    pub checkpoint_id: Option<String>,
    /// Optional namespace for checkpoints. Default is empty.
    pub checkpoint_ns: String,
}

impl RunnableConfig {
    /// Config addressing the latest checkpoint of `thread_id`.
    pub fn for_thread(thread_id: impl Into<String>) -> Self {
        Self {
            thread_id: Some(thread_id.into()),
            ..Self::default()
        }
    }

    /// Same thread, pinned to `checkpoint_id`.
    pub fn at_checkpoint(mut self, checkpoint_id: impl Into<String>) -> Self {
        self.checkpoint_id = Some(checkpoint_id.into());
        self
    }

    /// Same thread, latest checkpoint.
    pub fn latest(&self) -> Self {
        Self {
            checkpoint_id: None,
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// **Scenario**: RunnableConfig::default() has all optionals None and checkpoint_ns empty.
    #[test]
    fn runnable_config_default_all_optionals_none_or_empty() {
        let c = RunnableConfig::default();
        assert!(c.thread_id.is_none());
        assert!(c.checkpoint_id.is_none());
        assert!(c.checkpoint_ns.is_empty());
    }

    #[test]
    fn for_thread_and_pinning() {
        let c = RunnableConfig::for_thread("t1").at_checkpoint("cp1");
        assert_eq!(c.thread_id.as_deref(), Some("t1"));
        assert_eq!(c.checkpoint_id.as_deref(), Some("cp1"));
        assert!(c.latest().checkpoint_id.is_none());
        assert_eq!(c.latest().thread_id.as_deref(), Some("t1"));
    }
}
