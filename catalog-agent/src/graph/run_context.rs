//! Per-run options: where to checkpoint, how to cancel, where to stream.

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::memory::RunnableConfig;
use crate::stream::StreamEvent;

/// Options for one workflow run.
///
/// Checkpoints are written only when `config` carries a thread id and the workflow has a
/// checkpointer. `first_step` numbers the first checkpoint of this run, so steps keep growing
/// across runs on the same thread.
#[derive(Clone, Default)]
pub struct RunContext {
    /// Config for the current run (thread_id, checkpoint_ns).
    pub config: Option<RunnableConfig>,
    pub first_step: u64,
    pub cancel: Option<CancellationToken>,
    /// Optional sender for streaming events.
    pub stream_tx: Option<mpsc::Sender<StreamEvent>>,
}

impl RunContext {
    pub fn new(config: Option<RunnableConfig>) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn with_first_step(mut self, step: u64) -> Self {
        self.first_step = step;
        self
    }

    pub fn with_cancel(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn with_stream(mut self, tx: mpsc::Sender<StreamEvent>) -> Self {
        self.stream_tx = Some(tx);
        self
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(|t| t.is_cancelled())
    }

    /// Sends `event` if streaming; a dropped receiver is ignored.
    pub(crate) async fn emit(&self, event: StreamEvent) {
        if let Some(tx) = &self.stream_tx {
            let _ = tx.send(event).await;
        }
    }
}
