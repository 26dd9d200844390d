//! Workflow interpreter: alternates generation and tool execution until generation produces
//! a message with no tool calls.
//!
//! The loop is driven by [`Phase`]: `AwaitingGeneration` runs the generate node and picks the
//! next phase with [`next_phase`]; `AwaitingToolExecution` runs the tools node and always
//! returns to generation. After every step the new state is checkpointed (when a checkpointer
//! and thread id are present). Save failures are logged and collected in [`RunOutcome`]; they
//! never fail the run.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;

use super::logging::{
    log_checkpoint_failed, log_node_complete, log_node_start, log_run_complete, log_run_error,
    log_run_start,
};
use super::{next_phase, Node, Phase, RunContext};
use crate::error::AgentError;
use crate::memory::{Checkpoint, CheckpointError, CheckpointSource, Checkpointer, RunnableConfig};
use crate::state::{ConversationState, StateUpdate};
use crate::stream::StreamEvent;

/// Default ceiling on generation entries per run.
pub const DEFAULT_RECURSION_LIMIT: u32 = 15;

/// Result of a run that reached `Done`.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub state: ConversationState,
    /// Times the run entered `AwaitingGeneration`.
    pub generation_steps: u32,
    /// Checkpoint saves that failed during the run.
    pub persistence_errors: Vec<CheckpointError>,
    /// Step number of the last checkpoint attempted, if any step ran.
    pub last_step: Option<u64>,
}

/// Mutable bookkeeping for one run.
struct RunTracker {
    generation_steps: u32,
    next_step: u64,
    last_step: Option<u64>,
    persistence_errors: Vec<CheckpointError>,
}

/// The two-node workflow: generate, then execute tools, until done.
///
/// Cheap to clone; nodes and checkpointer are shared.
///
/// **Interaction**: Built by `AgentRunner` from a `GenerateStep` and a `ToolExecutionStep`;
/// tests build it from stub nodes.
#[derive(Clone)]
pub struct Workflow {
    generate: Arc<dyn Node>,
    execute: Arc<dyn Node>,
    checkpointer: Option<Arc<dyn Checkpointer<ConversationState>>>,
    recursion_limit: u32,
}

impl Workflow {
    pub fn new(generate: Arc<dyn Node>, execute: Arc<dyn Node>) -> Self {
        Self {
            generate,
            execute,
            checkpointer: None,
            recursion_limit: DEFAULT_RECURSION_LIMIT,
        }
    }

    pub fn with_checkpointer(
        mut self,
        checkpointer: Arc<dyn Checkpointer<ConversationState>>,
    ) -> Self {
        self.checkpointer = Some(checkpointer);
        self
    }

    /// Sets the generation ceiling; values below 1 are treated as 1.
    pub fn with_recursion_limit(mut self, limit: u32) -> Self {
        self.recursion_limit = limit.max(1);
        self
    }

    pub fn recursion_limit(&self) -> u32 {
        self.recursion_limit
    }

    pub fn checkpointer(&self) -> Option<&Arc<dyn Checkpointer<ConversationState>>> {
        self.checkpointer.as_ref()
    }

    /// Runs from the phase implied by `state` until `Done`.
    pub async fn invoke(
        &self,
        state: ConversationState,
        config: Option<RunnableConfig>,
    ) -> Result<RunOutcome, AgentError> {
        self.run(state, RunContext::new(config)).await
    }

    /// Same as [`invoke`](Self::invoke), aborting between or during steps when `cancel` fires.
    /// A step interrupted by cancellation is neither applied nor checkpointed.
    pub async fn invoke_with_cancel(
        &self,
        state: ConversationState,
        config: Option<RunnableConfig>,
        cancel: CancellationToken,
    ) -> Result<RunOutcome, AgentError> {
        self.run(state, RunContext::new(config).with_cancel(cancel))
            .await
    }

    /// Streams run events through a channel-backed stream. The handle resolves to the run's
    /// outcome once the stream has ended.
    pub fn stream(
        &self,
        state: ConversationState,
        ctx: RunContext,
    ) -> (
        ReceiverStream<StreamEvent>,
        JoinHandle<Result<RunOutcome, AgentError>>,
    ) {
        let (tx, rx) = mpsc::channel(128);
        let workflow = self.clone();
        let handle = tokio::spawn(async move { workflow.run(state, ctx.with_stream(tx)).await });
        (ReceiverStream::new(rx), handle)
    }

    /// Full run with explicit options.
    pub async fn run(
        &self,
        mut state: ConversationState,
        ctx: RunContext,
    ) -> Result<RunOutcome, AgentError> {
        let mut phase = Phase::resume_from(&state);
        let mut tracker = RunTracker {
            generation_steps: 0,
            next_step: ctx.first_step,
            last_step: None,
            persistence_errors: Vec::new(),
        };
        log_run_start(
            ctx.config.as_ref().and_then(|c| c.thread_id.as_deref()),
            phase,
            state.len(),
        );

        loop {
            ctx.emit(StreamEvent::PhaseEntered(phase)).await;
            let node = match phase {
                Phase::Done => break,
                Phase::AwaitingGeneration => {
                    if tracker.generation_steps >= self.recursion_limit {
                        let err = AgentError::RecursionLimitExceeded {
                            limit: self.recursion_limit,
                        };
                        log_run_error(&err);
                        return Err(err);
                    }
                    tracker.generation_steps += 1;
                    &self.generate
                }
                Phase::AwaitingToolExecution => &self.execute,
            };
            phase = self.step(node, phase, &mut state, &ctx, &mut tracker).await?;
        }

        log_run_complete(tracker.generation_steps, state.len());
        Ok(RunOutcome {
            state,
            generation_steps: tracker.generation_steps,
            persistence_errors: tracker.persistence_errors,
            last_step: tracker.last_step,
        })
    }

    /// Executes the unanswered tool calls of the last assistant message as one step, without
    /// generating. Used to finish an interrupted run before new input is added.
    pub async fn execute_pending(
        &self,
        mut state: ConversationState,
        ctx: RunContext,
    ) -> Result<RunOutcome, AgentError> {
        let mut tracker = RunTracker {
            generation_steps: 0,
            next_step: ctx.first_step,
            last_step: None,
            persistence_errors: Vec::new(),
        };
        if Phase::resume_from(&state) == Phase::AwaitingToolExecution {
            self.step(
                &self.execute,
                Phase::AwaitingToolExecution,
                &mut state,
                &ctx,
                &mut tracker,
            )
            .await?;
        }
        Ok(RunOutcome {
            state,
            generation_steps: 0,
            persistence_errors: tracker.persistence_errors,
            last_step: tracker.last_step,
        })
    }

    /// Runs one node, applies its update, checkpoints, and returns the next phase.
    async fn step(
        &self,
        node: &Arc<dyn Node>,
        phase: Phase,
        state: &mut ConversationState,
        ctx: &RunContext,
        tracker: &mut RunTracker,
    ) -> Result<Phase, AgentError> {
        if ctx.is_cancelled() {
            return Err(AgentError::Cancelled);
        }
        let step = tracker.next_step;
        log_node_start(node.id(), step);

        let update = self.run_node(node, state, ctx).await.map_err(|e| {
            log_run_error(&e);
            e
        })?;

        let next = match phase {
            Phase::AwaitingGeneration => {
                let message = update.last().ok_or_else(|| {
                    AgentError::ExecutionFailed(format!("node {} produced no message", node.id()))
                })?;
                next_phase(message)
            }
            _ => Phase::AwaitingGeneration,
        };
        log_node_complete(node.id(), update.len(), next);

        state.apply(update.clone());
        ctx.emit(StreamEvent::Updates {
            node: node.id().to_string(),
            appended: update,
        })
        .await;
        ctx.emit(StreamEvent::Values(state.clone())).await;

        let source = if next.is_terminal() {
            CheckpointSource::Update
        } else {
            CheckpointSource::Loop
        };
        self.save(state, source, step, ctx, tracker).await;
        tracker.next_step = step + 1;
        tracker.last_step = Some(step);
        Ok(next)
    }

    async fn run_node(
        &self,
        node: &Arc<dyn Node>,
        state: &ConversationState,
        ctx: &RunContext,
    ) -> Result<StateUpdate, AgentError> {
        match &ctx.cancel {
            Some(token) => tokio::select! {
                _ = token.cancelled() => Err(AgentError::Cancelled),
                result = node.run(state) => result,
            },
            None => node.run(state).await,
        }
    }

    async fn save(
        &self,
        state: &ConversationState,
        source: CheckpointSource,
        step: u64,
        ctx: &RunContext,
        tracker: &mut RunTracker,
    ) {
        let (Some(checkpointer), Some(config)) = (&self.checkpointer, &ctx.config) else {
            return;
        };
        if config.thread_id.is_none() {
            return;
        }
        let checkpoint = Checkpoint::from_state(state.clone(), source, step);
        if let Err(e) = checkpointer.put(&config.latest(), &checkpoint).await {
            log_checkpoint_failed(step, &e);
            ctx.emit(StreamEvent::CheckpointFailed(e.to_string())).await;
            tracker.persistence_errors.push(e);
        }
    }
}
