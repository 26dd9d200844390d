//! In-memory checkpointer (MemorySaver).

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::memory::checkpoint::{Checkpoint, CheckpointListItem, CheckpointMetadata};
use crate::memory::checkpointer::{require_thread_id, CheckpointError, Checkpointer};
use crate::memory::config::RunnableConfig;

/// Key: (thread_id, checkpoint_ns). Value: checkpoints in insertion order.
type ThreadKey = (String, String);

/// In-memory checkpointer. Not persistent; for dev and tests.
///
/// **Interaction**: Used as `Arc<dyn Checkpointer<ConversationState>>` by `Workflow` and
/// `AgentRunner`.
pub struct MemorySaver<S> {
    inner: RwLock<HashMap<ThreadKey, Vec<Checkpoint<S>>>>,
}

impl<S> MemorySaver<S> {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(HashMap::new()),
        }
    }
}

impl<S> Default for MemorySaver<S> {
    fn default() -> Self {
        Self::new()
    }
}

fn key(config: &RunnableConfig) -> Result<ThreadKey, CheckpointError> {
    Ok((
        require_thread_id(config)?.to_string(),
        config.checkpoint_ns.clone(),
    ))
}

#[async_trait]
impl<S> Checkpointer<S> for MemorySaver<S>
where
    S: Clone + Send + Sync + 'static,
{
    async fn put(
        &self,
        config: &RunnableConfig,
        checkpoint: &Checkpoint<S>,
    ) -> Result<String, CheckpointError> {
        let key = key(config)?;
        let mut guard = self.inner.write().await;
        let list = guard.entry(key).or_default();
        list.retain(|c| c.id != checkpoint.id);
        list.push(checkpoint.clone());
        Ok(checkpoint.id.clone())
    }

    async fn get_tuple(
        &self,
        config: &RunnableConfig,
    ) -> Result<Option<(Checkpoint<S>, CheckpointMetadata)>, CheckpointError> {
        let key = key(config)?;
        let guard = self.inner.read().await;
        let Some(list) = guard.get(&key) else {
            return Ok(None);
        };
        let found = match &config.checkpoint_id {
            Some(id) => list.iter().find(|c| &c.id == id),
            None => list.last(),
        };
        Ok(found.map(|c| (c.clone(), c.metadata.clone())))
    }

    async fn list(
        &self,
        config: &RunnableConfig,
        limit: Option<usize>,
        before: Option<&str>,
        after: Option<&str>,
    ) -> Result<Vec<CheckpointListItem>, CheckpointError> {
        let key = key(config)?;
        let guard = self.inner.read().await;
        let Some(list) = guard.get(&key) else {
            return Ok(Vec::new());
        };
        let position = |id: &str| list.iter().position(|c| c.id == id);
        let mut lo = 0usize;
        let mut hi = list.len();
        if let Some(id) = before {
            hi = hi.min(position(id).unwrap_or(0));
        }
        if let Some(id) = after {
            lo = lo.max(position(id).map(|p| p + 1).unwrap_or(list.len()));
        }
        if lo >= hi {
            return Ok(Vec::new());
        }
        Ok(list[lo..hi]
            .iter()
            .rev()
            .take(limit.unwrap_or(usize::MAX))
            .map(|c| CheckpointListItem {
                checkpoint_id: c.id.clone(),
                metadata: c.metadata.clone(),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::CheckpointSource;

    async fn saver_with(n: u64) -> (MemorySaver<String>, Vec<String>) {
        let saver = MemorySaver::new();
        let config = RunnableConfig::for_thread("t1");
        let mut ids = Vec::new();
        for step in 0..n {
            let cp = Checkpoint::from_state(format!("s{}", step), CheckpointSource::Loop, step);
            ids.push(saver.put(&config, &cp).await.unwrap());
        }
        (saver, ids)
    }

    /// **Scenario**: get_tuple returns the latest checkpoint, or the pinned one.
    #[tokio::test]
    async fn get_tuple_latest_and_pinned() {
        let (saver, ids) = saver_with(3).await;
        let config = RunnableConfig::for_thread("t1");
        let (latest, meta) = saver.get_tuple(&config).await.unwrap().unwrap();
        assert_eq!(latest.state, "s2");
        assert_eq!(meta.step, 2);
        let pinned = config.at_checkpoint(ids[0].clone());
        let (old, _) = saver.get_tuple(&pinned).await.unwrap().unwrap();
        assert_eq!(old.state, "s0");
    }

    /// **Scenario**: Threads are isolated and a missing thread id is rejected.
    #[tokio::test]
    async fn threads_are_isolated() {
        let (saver, _) = saver_with(1).await;
        let other = RunnableConfig::for_thread("t2");
        assert!(saver.get_tuple(&other).await.unwrap().is_none());
        let err = saver.get_tuple(&RunnableConfig::default()).await.unwrap_err();
        assert_eq!(err, CheckpointError::ThreadIdRequired);
    }

    /// **Scenario**: list is newest first and honours limit, before and after.
    #[tokio::test]
    async fn list_newest_first_with_bounds() {
        let (saver, ids) = saver_with(4).await;
        let config = RunnableConfig::for_thread("t1");
        let all = saver.list(&config, None, None, None).await.unwrap();
        let got: Vec<_> = all.iter().map(|i| i.checkpoint_id.clone()).collect();
        assert_eq!(got, ids.iter().rev().cloned().collect::<Vec<_>>());

        let limited = saver.list(&config, Some(2), None, None).await.unwrap();
        assert_eq!(limited[0].checkpoint_id, ids[3]);
        assert_eq!(limited.len(), 2);

        let before = saver.list(&config, None, Some(&ids[2]), None).await.unwrap();
        assert_eq!(before.len(), 2);
        assert_eq!(before[0].checkpoint_id, ids[1]);

        let after = saver.list(&config, None, None, Some(&ids[1])).await.unwrap();
        assert_eq!(after.len(), 2);
        assert_eq!(after[1].checkpoint_id, ids[2]);
    }
}
