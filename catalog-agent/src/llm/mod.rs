//! Language-generation backend abstraction used by the generate step.
//!
//! The generate step hands the backend a rendered system directive, the full message
//! history and the available tool specs; the backend returns assistant text plus any tool
//! invocations it decided on. Failures are classified so the retrier knows what to retry.

mod mock;

#[cfg(feature = "openai")]
mod openai;

pub use mock::{MockLlm, RecordedRequest};

#[cfg(feature = "openai")]
pub use openai::ChatOpenAI;

use async_trait::async_trait;
use thiserror::Error;

use crate::message::{Message, ToolCall};
use crate::retry::RetryClassify;
use crate::tools::ToolSpec;

/// Tool choice mode for chat completions: when tools are present, controls whether
/// the model may choose (auto), must not use (none), or must use (required).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ToolChoiceMode {
    /// Model can pick between message or tool calls. Default when tools are present.
    #[default]
    Auto,
    /// Model will not call any tool.
    None,
    /// Model must call one or more tools.
    Required,
}

impl std::str::FromStr for ToolChoiceMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "none" => Ok(Self::None),
            "required" => Ok(Self::Required),
            _ => Err(format!(
                "unknown tool_choice: {} (use auto, none, or required)",
                s
            )),
        }
    }
}

/// Response from one backend call: assistant text and the tool calls it requested.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LlmResponse {
    /// Assistant message content (plain text, may be empty when only tools are requested).
    pub content: String,
    /// Tool calls from this turn; empty means the run is done after this message.
    pub tool_calls: Vec<ToolCall>,
}

impl LlmResponse {
    /// A final answer with no tool calls.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            tool_calls: Vec::new(),
        }
    }

    /// A response that only requests tools.
    pub fn tool_calls(tool_calls: Vec<ToolCall>) -> Self {
        Self {
            content: String::new(),
            tool_calls,
        }
    }
}

/// Backend failure classification.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LlmError {
    /// Upstream throttling (HTTP 429 or equivalent). Retried by the generate step.
    #[error("rate limited: {0}")]
    RateLimited(String),
    /// Bad or missing credentials (HTTP 401 or equivalent). Never retried.
    #[error("unauthenticated: {0}")]
    Unauthenticated(String),
    /// Request could not be built or was rejected as invalid.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    /// Any other API or transport failure.
    #[error("api error: {0}")]
    Api(String),
}

impl RetryClassify for LlmError {
    fn is_rate_limited(&self) -> bool {
        matches!(self, LlmError::RateLimited(_))
    }
}

/// Classifies a backend failure from an HTTP status and/or provider error code.
///
/// Status wins when present; otherwise well-known codes (`rate_limit_exceeded`,
/// `invalid_api_key`, ...) decide.
pub fn classify_failure(status: Option<u16>, code: Option<&str>, message: &str) -> LlmError {
    let code = code.unwrap_or_default().to_ascii_lowercase();
    match status {
        Some(429) => return LlmError::RateLimited(message.to_string()),
        Some(401) | Some(403) => return LlmError::Unauthenticated(message.to_string()),
        Some(400) | Some(404) | Some(422) => return LlmError::InvalidRequest(message.to_string()),
        _ => {}
    }
    if code.contains("rate_limit") || code == "429" {
        LlmError::RateLimited(message.to_string())
    } else if code == "invalid_api_key" || code.contains("unauthorized") || code == "401" {
        LlmError::Unauthenticated(message.to_string())
    } else {
        LlmError::Api(message.to_string())
    }
}

/// Language-generation backend: given a directive, history and tools, returns the next reply.
///
/// Implementations: [`MockLlm`] (scripted, for tests) and `ChatOpenAI` (feature `openai`).
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Invoke one turn. `system` is the rendered directive; `messages` is the full history.
    async fn invoke(
        &self,
        system: &str,
        messages: &[Message],
        tools: &[ToolSpec],
    ) -> Result<LlmResponse, LlmError>;
}
