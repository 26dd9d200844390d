//! Generate node: render the directive, call the backend through the retrier, append one
//! assistant message carrying any tool calls the backend chose.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, warn};

use super::{render_system_prompt, SYSTEM_PROMPT};
use crate::error::AgentError;
use crate::graph::Node;
use crate::llm::LlmClient;
use crate::message::Message;
use crate::retry::{retry_notify, RetryPolicy};
use crate::state::{ConversationState, StateUpdate};
use crate::tools::ToolSpec;

/// Generation step of the workflow.
///
/// Sends the rendered system directive plus the full history to the backend. Rate-limited
/// calls are retried with `retry`; exhausting it fails the run with
/// `AgentError::RateLimited`, any other backend failure fails it immediately.
///
/// **Interaction**: Implements [`Node`]; used as the generate node of `Workflow`. Consumes an
/// [`LlmClient`] (e.g. `MockLlm`, `ChatOpenAI`) and the tool specs from `ToolRegistry::specs`.
pub struct GenerateStep {
    llm: Arc<dyn LlmClient>,
    tools: Vec<ToolSpec>,
    retry: RetryPolicy,
    prompt: String,
}

impl GenerateStep {
    pub fn new(llm: Arc<dyn LlmClient>, tools: Vec<ToolSpec>) -> Self {
        Self {
            llm,
            tools,
            retry: RetryPolicy::default(),
            prompt: SYSTEM_PROMPT.to_string(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Replaces the directive template. `{current_time}` is still interpolated.
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = prompt.into();
        self
    }
}

#[async_trait]
impl Node for GenerateStep {
    fn id(&self) -> &str {
        "generate"
    }

    async fn run(&self, state: &ConversationState) -> Result<StateUpdate, AgentError> {
        let system = render_system_prompt(&self.prompt, Utc::now());
        let llm = &self.llm;
        let tools = self.tools.as_slice();
        let messages = state.messages();
        let system = system.as_str();

        let response = retry_notify(
            &self.retry,
            move || async move { llm.invoke(system, messages, tools).await },
            |attempt, delay| {
                warn!(
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    "Generation backend rate limited; retrying"
                );
            },
        )
        .await?;

        // Tool results are matched by id, so every call needs one.
        let turn = state.len();
        let mut tool_calls = response.tool_calls;
        for (i, tc) in tool_calls.iter_mut().enumerate() {
            if tc.id.is_empty() {
                tc.id = format!("call_{}_{}", turn, i);
            }
        }
        debug!(
            tool_calls = tool_calls.len(),
            content_len = response.content.len(),
            "Generation complete"
        );
        Ok(vec![Message::assistant_with_tools(
            response.content,
            tool_calls,
        )])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{LlmError, LlmResponse, MockLlm};
    use crate::message::ToolCall;
    use serde_json::json;

    fn lookup_spec() -> ToolSpec {
        ToolSpec {
            name: "lookup_inventory".into(),
            description: None,
            input_schema: json!({"type": "object"}),
        }
    }

    fn state() -> ConversationState {
        ConversationState::from_messages(vec![Message::user("Do you have an oak table?")])
    }

    /// **Scenario**: Backend reply becomes one assistant message; request carries the rendered
    /// directive, full history and tool names.
    #[tokio::test]
    async fn appends_backend_reply() {
        let llm = Arc::new(MockLlm::answering("Yes."));
        let step = GenerateStep::new(llm.clone(), vec![lookup_spec()]);
        let update = step.run(&state()).await.unwrap();
        assert_eq!(update, vec![Message::assistant("Yes.")]);

        let req = &llm.requests()[0];
        assert!(req.system.contains("Current time:"));
        assert!(!req.system.contains("{current_time}"));
        assert_eq!(req.messages, state().messages());
        assert_eq!(req.tool_names, vec!["lookup_inventory".to_string()]);
    }

    /// **Scenario**: Tool calls without ids get stable generated ids.
    #[tokio::test]
    async fn assigns_missing_call_ids() {
        let llm = Arc::new(MockLlm::new(vec![LlmResponse::tool_calls(vec![
            ToolCall::new("", "lookup_inventory", r#"{"query":"oak"}"#),
            ToolCall::new("given", "lookup_inventory", "{}"),
        ])]));
        let step = GenerateStep::new(llm, vec![lookup_spec()]);
        let update = step.run(&state()).await.unwrap();
        let ids: Vec<_> = update[0].tool_calls().iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["call_1_0", "given"]);
    }

    /// **Scenario**: Two rate-limited failures then success returns the reply after 3 calls.
    #[tokio::test(start_paused = true)]
    async fn retries_rate_limited_backend() {
        let llm = Arc::new(MockLlm::with_results(vec![
            Err(LlmError::RateLimited("429".into())),
            Err(LlmError::RateLimited("429".into())),
            Ok(LlmResponse::text("done")),
        ]));
        let step = GenerateStep::new(llm.clone(), Vec::new());
        let update = step.run(&state()).await.unwrap();
        assert_eq!(update[0].content(), "done");
        assert_eq!(llm.call_count(), 3);
    }

    /// **Scenario**: Persistent throttling fails with RateLimited after max attempts.
    #[tokio::test(start_paused = true)]
    async fn exhausted_retries_fail_rate_limited() {
        let llm = Arc::new(MockLlm::with_results(vec![
            Err(LlmError::RateLimited("429".into())),
            Err(LlmError::RateLimited("429".into())),
            Err(LlmError::RateLimited("429".into())),
        ]));
        let step = GenerateStep::new(llm.clone(), Vec::new());
        let err = step.run(&state()).await.unwrap_err();
        assert!(matches!(err, AgentError::RateLimited { attempts: 3, .. }));
        assert_eq!(llm.call_count(), 3);
    }

    /// **Scenario**: Bad credentials fail at once without retrying.
    #[tokio::test]
    async fn unauthenticated_is_not_retried() {
        let llm = Arc::new(MockLlm::with_results(vec![Err(LlmError::Unauthenticated(
            "bad key".into(),
        ))]));
        let step = GenerateStep::new(llm.clone(), Vec::new());
        let err = step.run(&state()).await.unwrap_err();
        assert!(matches!(err, AgentError::Unauthenticated(_)));
        assert_eq!(llm.call_count(), 1);
    }

    #[tokio::test]
    async fn custom_prompt_is_rendered() {
        let llm = Arc::new(MockLlm::answering("ok"));
        let step = GenerateStep::new(llm.clone(), Vec::new()).with_system_prompt("Time {current_time}");
        step.run(&state()).await.unwrap();
        assert!(llm.requests()[0].system.starts_with("Time 20"));
    }
}
