//! Scripted LLM client for tests and examples.
//!
//! Returns queued responses (or failures) in order and records every request, so tests can
//! assert on call counts and on what the generate step sent.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use super::{LlmClient, LlmError, LlmResponse};
use crate::message::Message;
use crate::tools::ToolSpec;

/// One request as seen by [`MockLlm`].
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub system: String,
    pub messages: Vec<Message>,
    pub tool_names: Vec<String>,
}

/// Mock LLM: pops scripted results in order; when the script is empty, repeats `fallback`
/// if one is set, otherwise fails with `LlmError::Api`.
///
/// **Interaction**: Implements `LlmClient`; used by the generate step in tests and examples.
pub struct MockLlm {
    script: Mutex<VecDeque<Result<LlmResponse, LlmError>>>,
    fallback: Option<LlmResponse>,
    calls: AtomicUsize,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl MockLlm {
    /// Scripted successful responses, returned in order.
    pub fn new(responses: Vec<LlmResponse>) -> Self {
        Self::with_results(responses.into_iter().map(Ok).collect())
    }

    /// Scripted results, including failures, returned in order.
    pub fn with_results(results: Vec<Result<LlmResponse, LlmError>>) -> Self {
        Self {
            script: Mutex::new(results.into()),
            fallback: None,
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Always answers with `content` and no tool calls.
    pub fn answering(content: impl Into<String>) -> Self {
        Self::repeating(LlmResponse::text(content))
    }

    /// Always returns `response`.
    pub fn repeating(response: LlmResponse) -> Self {
        Self::new(Vec::new()).then_repeat(response)
    }

    /// Response to repeat once the script runs out (builder style).
    pub fn then_repeat(mut self, response: LlmResponse) -> Self {
        self.fallback = Some(response);
        self
    }

    /// Number of `invoke` calls so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Requests received so far, oldest first.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[async_trait]
impl LlmClient for MockLlm {
    async fn invoke(
        &self,
        system: &str,
        messages: &[Message],
        tools: &[ToolSpec],
    ) -> Result<LlmResponse, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(RecordedRequest {
                system: system.to_string(),
                messages: messages.to_vec(),
                tool_names: tools.iter().map(|t| t.name.clone()).collect(),
            });
        let next = self
            .script
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front();
        match next {
            Some(result) => result,
            None => self
                .fallback
                .clone()
                .ok_or_else(|| LlmError::Api("mock script exhausted".to_string())),
        }
    }
}
