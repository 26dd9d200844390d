//! SQLite-backed checkpointer (SqliteSaver). Persistent across process restarts.

use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::memory::checkpoint::{
    Checkpoint, CheckpointListItem, CheckpointMetadata, CheckpointSource,
};
use crate::memory::checkpointer::{require_thread_id, CheckpointError, Checkpointer};
use crate::memory::config::RunnableConfig;
use crate::memory::serializer::Serializer;

fn storage(e: impl std::fmt::Display) -> CheckpointError {
    CheckpointError::Storage(e.to_string())
}

/// SQLite-backed checkpointer. Key: (thread_id, checkpoint_ns, checkpoint_id); state bytes
/// come from the injected `Serializer` (usually `JsonSerializer`).
///
/// Uses spawn_blocking for async. Insertion order (`seq`) decides which checkpoint is latest.
///
/// **Interaction**: Used as `Arc<dyn Checkpointer<ConversationState>>` by the CLI.
pub struct SqliteSaver<S> {
    db_path: PathBuf,
    serializer: Arc<dyn Serializer<S>>,
    _state: PhantomData<fn() -> S>,
}

/// Row as read from the table, before state deserialization.
struct RawCheckpoint {
    id: String,
    ts: String,
    source: String,
    step: i64,
    created_at: Option<String>,
    state: Vec<u8>,
}

impl RawCheckpoint {
    fn metadata(&self) -> Result<CheckpointMetadata, CheckpointError> {
        let source = CheckpointSource::parse(&self.source).ok_or_else(|| {
            CheckpointError::Serialization(format!("unknown checkpoint source: {}", self.source))
        })?;
        let created_at = self
            .created_at
            .as_deref()
            .map(DateTime::parse_from_rfc3339)
            .transpose()
            .map_err(|e| CheckpointError::Serialization(e.to_string()))?
            .map(|d| d.with_timezone(&Utc));
        Ok(CheckpointMetadata {
            source,
            step: self.step.max(0) as u64,
            created_at,
        })
    }
}

impl<S> SqliteSaver<S>
where
    S: Clone + Send + Sync + 'static,
{
    /// Opens (or creates) the database and ensures the table exists.
    pub fn new(
        path: impl AsRef<Path>,
        serializer: Arc<dyn Serializer<S>>,
    ) -> Result<Self, CheckpointError> {
        let db_path = path.as_ref().to_path_buf();
        let conn = Connection::open(&db_path).map_err(storage)?;
        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS checkpoints (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                thread_id TEXT NOT NULL,
                checkpoint_ns TEXT NOT NULL,
                checkpoint_id TEXT NOT NULL,
                ts TEXT NOT NULL,
                source TEXT NOT NULL,
                step INTEGER NOT NULL,
                created_at TEXT,
                state BLOB NOT NULL,
                UNIQUE (thread_id, checkpoint_ns, checkpoint_id)
            )
            "#,
            [],
        )
        .map_err(storage)?;
        Ok(Self {
            db_path,
            serializer,
            _state: PhantomData,
        })
    }
}

#[async_trait]
impl<S> Checkpointer<S> for SqliteSaver<S>
where
    S: Clone + Send + Sync + 'static,
{
    async fn put(
        &self,
        config: &RunnableConfig,
        checkpoint: &Checkpoint<S>,
    ) -> Result<String, CheckpointError> {
        let thread_id = require_thread_id(config)?.to_string();
        let ns = config.checkpoint_ns.clone();
        let state = self.serializer.serialize(&checkpoint.state)?;
        let id = checkpoint.id.clone();
        let ts = checkpoint.ts.clone();
        let source = checkpoint.metadata.source.as_str();
        let step = checkpoint.metadata.step as i64;
        let created_at = checkpoint.metadata.created_at.map(|d| d.to_rfc3339());
        let db_path = self.db_path.clone();

        tokio::task::spawn_blocking(move || {
            let conn = Connection::open(&db_path).map_err(storage)?;
            conn.execute(
                r#"
                INSERT OR REPLACE INTO checkpoints
                    (thread_id, checkpoint_ns, checkpoint_id, ts, source, step, created_at, state)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                "#,
                params![thread_id, ns, id, ts, source, step, created_at, state],
            )
            .map_err(storage)?;
            Ok::<String, CheckpointError>(id)
        })
        .await
        .map_err(storage)?
    }

    async fn get_tuple(
        &self,
        config: &RunnableConfig,
    ) -> Result<Option<(Checkpoint<S>, CheckpointMetadata)>, CheckpointError> {
        let thread_id = require_thread_id(config)?.to_string();
        let ns = config.checkpoint_ns.clone();
        let checkpoint_id = config.checkpoint_id.clone();
        let db_path = self.db_path.clone();

        let raw = tokio::task::spawn_blocking(move || {
            let conn = Connection::open(&db_path).map_err(storage)?;
            let map_row = |row: &rusqlite::Row<'_>| {
                Ok(RawCheckpoint {
                    id: row.get(0)?,
                    ts: row.get(1)?,
                    source: row.get(2)?,
                    step: row.get(3)?,
                    created_at: row.get(4)?,
                    state: row.get(5)?,
                })
            };
            let select = "SELECT checkpoint_id, ts, source, step, created_at, state FROM checkpoints";
            let raw = match checkpoint_id {
                Some(id) => conn
                    .query_row(
                        &format!(
                            "{} WHERE thread_id = ?1 AND checkpoint_ns = ?2 AND checkpoint_id = ?3",
                            select
                        ),
                        params![thread_id, ns, id],
                        map_row,
                    )
                    .optional(),
                None => conn
                    .query_row(
                        &format!(
                            "{} WHERE thread_id = ?1 AND checkpoint_ns = ?2 ORDER BY seq DESC LIMIT 1",
                            select
                        ),
                        params![thread_id, ns],
                        map_row,
                    )
                    .optional(),
            }
            .map_err(storage)?;
            Ok::<Option<RawCheckpoint>, CheckpointError>(raw)
        })
        .await
        .map_err(storage)??;

        let Some(raw) = raw else {
            return Ok(None);
        };
        let metadata = raw.metadata()?;
        let state = self.serializer.deserialize(&raw.state)?;
        let checkpoint = Checkpoint {
            id: raw.id,
            ts: raw.ts,
            state,
            metadata: metadata.clone(),
        };
        Ok(Some((checkpoint, metadata)))
    }

    async fn list(
        &self,
        config: &RunnableConfig,
        limit: Option<usize>,
        before: Option<&str>,
        after: Option<&str>,
    ) -> Result<Vec<CheckpointListItem>, CheckpointError> {
        let thread_id = require_thread_id(config)?.to_string();
        let ns = config.checkpoint_ns.clone();
        let before = before.map(String::from);
        let after = after.map(String::from);
        let limit = limit.map(|n| n.min(i64::MAX as usize) as i64).unwrap_or(-1);
        let db_path = self.db_path.clone();

        let raws = tokio::task::spawn_blocking(move || {
            let conn = Connection::open(&db_path).map_err(storage)?;
            let bound = "(SELECT seq FROM checkpoints WHERE thread_id = ?1 AND checkpoint_ns = ?2 AND checkpoint_id = ?";
            let mut sql = String::from(
                "SELECT checkpoint_id, ts, source, step, created_at FROM checkpoints WHERE thread_id = ?1 AND checkpoint_ns = ?2",
            );
            if before.is_some() {
                sql.push_str(&format!(" AND seq < {}3)", bound));
            }
            if after.is_some() {
                sql.push_str(&format!(" AND seq > {}4)", bound));
            }
            sql.push_str(" ORDER BY seq DESC LIMIT ?5");
            let mut stmt = conn.prepare(&sql).map_err(storage)?;
            let rows = stmt
                .query_map(
                    params![
                        thread_id,
                        ns,
                        before.unwrap_or_default(),
                        after.unwrap_or_default(),
                        limit
                    ],
                    |row| {
                        Ok(RawCheckpoint {
                            id: row.get(0)?,
                            ts: row.get(1)?,
                            source: row.get(2)?,
                            step: row.get(3)?,
                            created_at: row.get(4)?,
                            state: Vec::new(),
                        })
                    },
                )
                .map_err(storage)?;
            let raws = rows.collect::<Result<Vec<_>, _>>().map_err(storage)?;
            Ok::<Vec<RawCheckpoint>, CheckpointError>(raws)
        })
        .await
        .map_err(storage)??;

        raws.into_iter()
            .map(|raw| {
                Ok(CheckpointListItem {
                    metadata: raw.metadata()?,
                    checkpoint_id: raw.id,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::JsonSerializer;
    use crate::message::Message;
    use crate::state::ConversationState;

    fn saver(path: &Path) -> SqliteSaver<ConversationState> {
        SqliteSaver::new(path, Arc::new(JsonSerializer)).unwrap()
    }

    fn state(n: usize) -> ConversationState {
        ConversationState::from_messages((0..n).map(|i| Message::user(format!("m{}", i))).collect())
    }

    /// **Scenario**: Checkpoints survive reopening the database; latest wins.
    #[tokio::test]
    async fn sqlite_saver_persists_latest() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("threads.db");
        let config = RunnableConfig::for_thread("t1");
        {
            let s = saver(&path);
            for step in 0..3u64 {
                let cp = Checkpoint::from_state(state(step as usize + 1), CheckpointSource::Loop, step);
                s.put(&config, &cp).await.unwrap();
            }
        }
        let s = saver(&path);
        let (cp, meta) = s.get_tuple(&config).await.unwrap().unwrap();
        assert_eq!(cp.state.len(), 3);
        assert_eq!(meta.step, 2);
        assert_eq!(meta.source, CheckpointSource::Loop);
        assert!(meta.created_at.is_some());
        assert!(s
            .get_tuple(&RunnableConfig::for_thread("other"))
            .await
            .unwrap()
            .is_none());
    }

    /// **Scenario**: list is newest first, bounded by before/after, and a pinned id loads.
    #[tokio::test]
    async fn sqlite_saver_list_and_pin() {
        let dir = tempfile::tempdir().unwrap();
        let s = saver(&dir.path().join("threads.db"));
        let config = RunnableConfig::for_thread("t1");
        let mut ids = Vec::new();
        for step in 0..4u64 {
            let cp = Checkpoint::from_state(state(1), CheckpointSource::Update, step);
            ids.push(s.put(&config, &cp).await.unwrap());
        }
        let all = s.list(&config, None, None, None).await.unwrap();
        assert_eq!(all.len(), 4);
        assert_eq!(all[0].checkpoint_id, ids[3]);
        assert_eq!(s.list(&config, Some(1), None, None).await.unwrap().len(), 1);
        let before = s.list(&config, None, Some(&ids[2]), None).await.unwrap();
        assert_eq!(before.iter().map(|i| i.checkpoint_id.clone()).collect::<Vec<_>>(), vec![ids[1].clone(), ids[0].clone()]);
        let after = s.list(&config, None, None, Some(&ids[2])).await.unwrap();
        assert_eq!(after.len(), 1);

        let (old, meta) = s
            .get_tuple(&config.clone().at_checkpoint(ids[0].clone()))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(old.id, ids[0]);
        assert_eq!(meta.step, 0);
    }

    /// **Scenario**: Opening a directory as the database fails with a storage error.
    #[test]
    fn sqlite_saver_rejects_directory_path() {
        let dir = tempfile::tempdir().unwrap();
        let result = SqliteSaver::<ConversationState>::new(dir.path(), Arc::new(JsonSerializer));
        assert!(matches!(result, Err(CheckpointError::Storage(_))));
    }

    #[tokio::test]
    async fn sqlite_saver_requires_thread_id() {
        let dir = tempfile::tempdir().unwrap();
        let s = saver(&dir.path().join("threads.db"));
        let cp = Checkpoint::from_state(state(1), CheckpointSource::Input, 0);
        let err = s.put(&RunnableConfig::default(), &cp).await.unwrap_err();
        assert_eq!(err, CheckpointError::ThreadIdRequired);
    }
}
