//! Entry point: one user message in, one assistant reply out, per thread.
//!
//! [`AgentRunner`] loads the thread's latest checkpoint (or starts fresh), appends the user
//! message, runs the [`Workflow`] to `Done` and returns the last message's text. The workflow
//! checkpoints after every step, so the stored thread already holds the final state when the
//! reply comes back.
//!
//! Persistence is best effort: load and save failures are logged and reported in
//! [`AgentReply::persistence_errors`], never turned into a failed reply. When loading fails the
//! call runs on a fresh conversation and saving is skipped so the stored thread is not
//! overwritten by a history that lost its past.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use tokio_stream::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::tools_node::error_results;
use super::{GenerateStep, ToolExecutionStep};
use crate::catalog::CatalogStore;
use crate::config::WorkflowConfig;
use crate::embedding::Embedder;
use crate::error::{AgentError, UserFacingError};
use crate::graph::{RunContext, RunOutcome, Workflow};
use crate::llm::LlmClient;
use crate::memory::{
    Checkpoint, CheckpointError, CheckpointListItem, CheckpointSource, Checkpointer,
    RunnableConfig,
};
use crate::message::Message;
use crate::state::ConversationState;
use crate::stream::StreamEvent;
use crate::tools::{HybridLookupTool, ToolRegistry};

/// Reply to one [`AgentRunner::handle`] call.
#[derive(Debug, Clone)]
pub struct AgentReply {
    pub thread_id: String,
    /// Content of the final assistant message.
    pub text: String,
    /// Full conversation after the run.
    pub state: ConversationState,
    pub generation_steps: u32,
    /// Load/save failures met during the call; the reply is still valid.
    pub persistence_errors: Vec<CheckpointError>,
}

/// State ready to run plus where its checkpoints go.
struct Prepared {
    state: ConversationState,
    config: Option<RunnableConfig>,
    next_step: u64,
    persistence_errors: Vec<CheckpointError>,
}

static THREAD_SEQ: AtomicU64 = AtomicU64::new(0);

/// Conversational entry point over the generate / tools workflow.
///
/// Calls on different threads may run concurrently. Calls on the same thread must be
/// serialized by the caller; concurrent ones race and the last save wins.
///
/// # Example
///
/// ```ignore
/// let runner = AgentRunner::new(llm, registry, Some(checkpointer), WorkflowConfig::default());
/// let reply = runner.handle("thread-1", "Do you have an oak table?").await?;
/// println!("{}", reply.text);
/// ```
pub struct AgentRunner {
    workflow: Workflow,
    checkpointer: Option<Arc<dyn Checkpointer<ConversationState>>>,
}

impl AgentRunner {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        registry: Arc<ToolRegistry>,
        checkpointer: Option<Arc<dyn Checkpointer<ConversationState>>>,
        config: WorkflowConfig,
    ) -> Self {
        let generate = GenerateStep::new(llm, registry.specs())
            .with_retry(config.retry.clone())
            .with_system_prompt(config.system_prompt.clone());
        let execute = ToolExecutionStep::new(registry);
        let mut workflow = Workflow::new(Arc::new(generate), Arc::new(execute))
            .with_recursion_limit(config.recursion_limit);
        if let Some(cp) = &checkpointer {
            workflow = workflow.with_checkpointer(Arc::clone(cp));
        }
        Self {
            workflow,
            checkpointer,
        }
    }

    /// Runner whose only tool is a [`HybridLookupTool`] over `catalog`, limited to
    /// `config.lookup_limit` results by default.
    pub fn with_catalog(
        llm: Arc<dyn LlmClient>,
        catalog: Arc<dyn CatalogStore>,
        embedder: Arc<dyn Embedder>,
        checkpointer: Option<Arc<dyn Checkpointer<ConversationState>>>,
        config: WorkflowConfig,
    ) -> Self {
        let lookup =
            HybridLookupTool::new(catalog, embedder).with_default_limit(config.lookup_limit);
        let registry = Arc::new(ToolRegistry::new().with_tool(Arc::new(lookup)));
        Self::new(llm, registry, checkpointer, config)
    }

    pub fn workflow(&self) -> &Workflow {
        &self.workflow
    }

    /// Fresh time-derived thread id: `thread-<millis>-<seq>`.
    pub fn new_thread_id() -> String {
        let seq = THREAD_SEQ.fetch_add(1, Ordering::Relaxed);
        format!("thread-{}-{}", Utc::now().timestamp_millis(), seq)
    }

    /// Sends `text` on `thread_id` and runs the workflow to completion.
    pub async fn handle(&self, thread_id: &str, text: &str) -> Result<AgentReply, AgentError> {
        let prepared = self.prepare(thread_id, text).await?;
        let ctx = RunContext::new(prepared.config.clone()).with_first_step(prepared.next_step);
        let outcome = self.workflow.run(prepared.state, ctx).await?;
        Ok(reply(thread_id, prepared.persistence_errors, outcome))
    }

    /// Like [`handle`](Self::handle), aborting when `cancel` fires. A step cut short is not
    /// saved, so the thread resumes from the last completed step.
    pub async fn handle_with_cancel(
        &self,
        thread_id: &str,
        text: &str,
        cancel: CancellationToken,
    ) -> Result<AgentReply, AgentError> {
        let prepared = self.prepare(thread_id, text).await?;
        let ctx = RunContext::new(prepared.config.clone())
            .with_first_step(prepared.next_step)
            .with_cancel(cancel);
        let outcome = self.workflow.run(prepared.state, ctx).await?;
        Ok(reply(thread_id, prepared.persistence_errors, outcome))
    }

    /// Like [`handle`](Self::handle), calling `on_event` for every workflow event.
    pub async fn handle_streaming<F>(
        &self,
        thread_id: &str,
        text: &str,
        mut on_event: F,
    ) -> Result<AgentReply, AgentError>
    where
        F: FnMut(&StreamEvent),
    {
        let prepared = self.prepare(thread_id, text).await?;
        let ctx = RunContext::new(prepared.config.clone()).with_first_step(prepared.next_step);
        let (mut events, handle) = self.workflow.stream(prepared.state, ctx);
        while let Some(event) = events.next().await {
            on_event(&event);
        }
        let outcome = handle
            .await
            .map_err(|e| AgentError::ExecutionFailed(e.to_string()))??;
        Ok(reply(thread_id, prepared.persistence_errors, outcome))
    }

    /// [`handle`](Self::handle) reduced to the reply text or a user-facing failure.
    pub async fn respond(&self, thread_id: &str, text: &str) -> Result<String, UserFacingError> {
        match self.handle(thread_id, text).await {
            Ok(reply) => Ok(reply.text),
            Err(e) => {
                warn!(thread_id, error = %e, "Request failed");
                Err(UserFacingError::from(&e))
            }
        }
    }

    /// Checkpoint history of `thread_id`, newest first. Empty without a checkpointer.
    pub async fn history(
        &self,
        thread_id: &str,
        limit: Option<usize>,
    ) -> Result<Vec<CheckpointListItem>, CheckpointError> {
        match &self.checkpointer {
            Some(cp) => {
                cp.list(&RunnableConfig::for_thread(thread_id), limit, None, None)
                    .await
            }
            None => Ok(Vec::new()),
        }
    }

    /// Stored state of `thread_id`: the latest, or the given checkpoint.
    pub async fn state_at(
        &self,
        thread_id: &str,
        checkpoint_id: Option<&str>,
    ) -> Result<Option<ConversationState>, CheckpointError> {
        let Some(cp) = &self.checkpointer else {
            return Ok(None);
        };
        let mut config = RunnableConfig::for_thread(thread_id);
        if let Some(id) = checkpoint_id {
            config = config.at_checkpoint(id);
        }
        Ok(cp.get_tuple(&config).await?.map(|(c, _)| c.state))
    }

    /// Loads or seeds the thread, finishes an interrupted tool round, appends the user message
    /// and saves it as an `Input` checkpoint.
    async fn prepare(&self, thread_id: &str, text: &str) -> Result<Prepared, AgentError> {
        info!(thread_id, "Handling message");
        let mut persistence_errors = Vec::new();
        let mut state = ConversationState::new();
        let mut next_step = 0u64;
        let mut config = self
            .checkpointer
            .as_ref()
            .map(|_| RunnableConfig::for_thread(thread_id));

        if let (Some(cp), Some(cfg)) = (&self.checkpointer, &config) {
            match cp.get_tuple(cfg).await {
                Ok(Some((checkpoint, metadata))) => {
                    state = checkpoint.state;
                    next_step = metadata.step + 1;
                }
                Ok(None) => {}
                Err(e) => {
                    warn!(thread_id, error = %e, "Could not load thread; starting fresh without saving");
                    persistence_errors.push(e);
                    config = None;
                }
            }
        }

        let pending = state.pending_tool_calls();
        if !pending.is_empty() {
            info!(thread_id, "Finishing interrupted tool round");
            let ctx = RunContext::new(config.clone()).with_first_step(next_step);
            match self.workflow.execute_pending(state.clone(), ctx).await {
                Ok(outcome) => {
                    if let Some(step) = outcome.last_step {
                        next_step = step + 1;
                    }
                    persistence_errors.extend(outcome.persistence_errors);
                    state = outcome.state;
                }
                Err(e) => {
                    // The round would fail the same way on every call; close it with errors.
                    warn!(thread_id, error = %e, "Interrupted tool round failed; answering with errors");
                    state.apply(error_results(pending, &e));
                    self.save(
                        &config,
                        &state,
                        CheckpointSource::Loop,
                        &mut next_step,
                        &mut persistence_errors,
                    )
                    .await;
                }
            }
        }

        state.push(Message::user(text));
        self.save(
            &config,
            &state,
            CheckpointSource::Input,
            &mut next_step,
            &mut persistence_errors,
        )
        .await;

        Ok(Prepared {
            state,
            config,
            next_step,
            persistence_errors,
        })
    }

    /// Saves `state` at `next_step` and advances it; failures are logged and collected.
    async fn save(
        &self,
        config: &Option<RunnableConfig>,
        state: &ConversationState,
        source: CheckpointSource,
        next_step: &mut u64,
        persistence_errors: &mut Vec<CheckpointError>,
    ) {
        let (Some(cp), Some(cfg)) = (&self.checkpointer, config) else {
            return;
        };
        let checkpoint = Checkpoint::from_state(state.clone(), source, *next_step);
        if let Err(e) = cp.put(cfg, &checkpoint).await {
            warn!(step = *next_step, error = %e, "Checkpoint save failed; continuing without it");
            persistence_errors.push(e);
        }
        *next_step += 1;
    }
}

fn reply(
    thread_id: &str,
    mut persistence_errors: Vec<CheckpointError>,
    outcome: RunOutcome,
) -> AgentReply {
    persistence_errors.extend(outcome.persistence_errors);
    let text = outcome.state.last_text().unwrap_or_default().to_string();
    info!(
        thread_id,
        generation_steps = outcome.generation_steps,
        persistence_errors = persistence_errors.len(),
        "Reply ready"
    );
    AgentReply {
        thread_id: thread_id.to_string(),
        text,
        state: outcome.state,
        generation_steps: outcome.generation_steps,
        persistence_errors,
    }
}
