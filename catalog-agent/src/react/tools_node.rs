//! Tool-execution node: answer every pending tool call with one tool-result message.
//!
//! Calls run one at a time in the order the backend emitted them, and results are appended in
//! that same order. Tools that report failures inside their own output (the lookup tool's
//! error envelope) are ordinary results here.
//!
//! # Error Handling
//!
//! A `ToolError` from the registry (unknown tool, bad arguments, execution failure) is
//! governed by [`HandleToolErrors`]:
//!
//! - `Never` (default): the run fails; an unknown name fails with `AgentError::UnknownTool`.
//! - `Always(template)`: the error is rendered into the tool-result content.
//! - `Custom(handler)`: the handler produces the tool-result content.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, trace, warn};

use crate::error::AgentError;
use crate::graph::Node;
use crate::message::{Message, ToolCall};
use crate::state::{ConversationState, StateUpdate};
use crate::tools::{ToolError, ToolRegistry};

/// Truncates a string for logging, appending "..." if longer than max_len.
fn truncate_for_log(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        format!("{}...", s.chars().take(max_len).collect::<String>())
    }
}

/// Default error content; `{tool_name}`, `{tool_kwargs}` and `{error}` are filled in.
pub const DEFAULT_TOOL_ERROR_TEMPLATE: &str =
    "Error executing tool '{tool_name}' with kwargs {tool_kwargs} with error:\n {error}\n Please fix the error and try again.";

/// Error handler: takes the error, tool name and parsed arguments, returns result content.
pub type ErrorHandlerFn = Arc<dyn Fn(&ToolError, &str, &Value) -> String + Send + Sync + 'static>;

/// How [`ToolExecutionStep`] treats registry-level tool errors.
#[derive(Clone, Default)]
pub enum HandleToolErrors {
    /// Errors fail the run.
    #[default]
    Never,
    /// Errors become tool-result content; `None` uses [`DEFAULT_TOOL_ERROR_TEMPLATE`].
    Always(Option<String>),
    Custom(ErrorHandlerFn),
}

impl std::fmt::Debug for HandleToolErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Never => write!(f, "HandleToolErrors::Never"),
            Self::Always(msg) => write!(f, "HandleToolErrors::Always({:?})", msg),
            Self::Custom(_) => write!(f, "HandleToolErrors::Custom(<fn>)"),
        }
    }
}

/// Tool-execution step of the workflow.
///
/// **Interaction**: Implements [`Node`]; used as the tools node of `Workflow`. Reads
/// `ConversationState::pending_tool_calls`, dispatches through [`ToolRegistry::call`].
pub struct ToolExecutionStep {
    registry: Arc<ToolRegistry>,
    handle_tool_errors: HandleToolErrors,
}

impl ToolExecutionStep {
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self {
            registry,
            handle_tool_errors: HandleToolErrors::default(),
        }
    }

    pub fn with_handle_tool_errors(mut self, handle_tool_errors: HandleToolErrors) -> Self {
        self.handle_tool_errors = handle_tool_errors;
        self
    }

    /// Content for a handled error, or `None` when the error must propagate.
    fn handle_error(&self, error: &ToolError, tool_name: &str, args: &Value) -> Option<String> {
        match &self.handle_tool_errors {
            HandleToolErrors::Never => None,
            HandleToolErrors::Always(template) => Some(render_error(
                template.as_deref().unwrap_or(DEFAULT_TOOL_ERROR_TEMPLATE),
                tool_name,
                args,
                error,
            )),
            HandleToolErrors::Custom(handler) => Some(handler(error, tool_name, args)),
        }
    }
}

fn render_error(template: &str, tool_name: &str, args: &Value, error: &dyn std::fmt::Display) -> String {
    template
        .replace("{tool_name}", tool_name)
        .replace("{tool_kwargs}", &args.to_string())
        .replace("{error}", &error.to_string())
}

/// Answers every call in `calls` with [`DEFAULT_TOOL_ERROR_TEMPLATE`] content for `error`.
///
/// Used to close a tool round that cannot be executed, so the thread can move on to
/// generation instead of retrying the same calls forever.
pub(crate) fn error_results(calls: Vec<ToolCall>, error: &dyn std::fmt::Display) -> StateUpdate {
    calls
        .into_iter()
        .map(|tc| {
            let content = render_error(
                DEFAULT_TOOL_ERROR_TEMPLATE,
                &tc.name,
                &parse_arguments(&tc.arguments),
                error,
            );
            Message::tool_result(tc.id, tc.name, content)
        })
        .collect()
}

/// Parses backend-supplied arguments; empty or malformed text becomes `{}`.
fn parse_arguments(raw: &str) -> Value {
    if raw.trim().is_empty() {
        return serde_json::json!({});
    }
    serde_json::from_str(raw).unwrap_or_else(|e| {
        warn!(error = %e, "Tool arguments are not valid JSON; using {{}}");
        serde_json::json!({})
    })
}

#[async_trait]
impl Node for ToolExecutionStep {
    fn id(&self) -> &str {
        "tools"
    }

    async fn run(&self, state: &ConversationState) -> Result<StateUpdate, AgentError> {
        let pending = state.pending_tool_calls();
        let mut results = Vec::with_capacity(pending.len());

        for tc in pending {
            let args = parse_arguments(&tc.arguments);
            debug!(tool = %tc.name, call_id = %tc.id, args = %args, "Calling tool");

            let content = match self.registry.call(&tc.name, args.clone()).await {
                Ok(content) => {
                    trace!(
                        tool = %tc.name,
                        result_len = content.text.len(),
                        result_preview = %truncate_for_log(&content.text, 200),
                        "Tool returned"
                    );
                    content.text
                }
                Err(e) => {
                    warn!(tool = %tc.name, error = %e, "Tool call failed");
                    match self.handle_error(&e, &tc.name, &args) {
                        Some(text) => text,
                        None => return Err(AgentError::from(e)),
                    }
                }
            };
            results.push(Message::tool_result(tc.id, tc.name, content));
        }

        Ok(results)
    }
}
