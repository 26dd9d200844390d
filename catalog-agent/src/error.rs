//! Agent execution error types.
//!
//! [`AgentError`] is what a workflow run fails with. [`UserFacingError`] is the small, stable
//! set of categories the entry point reports to callers; every `AgentError` maps onto exactly
//! one of them.

use thiserror::Error;

use crate::llm::LlmError;
use crate::retry::RetryError;
use crate::tools::ToolError;

/// Agent execution error.
///
/// Returned by `Workflow::invoke` and `AgentRunner::handle` when a run fails. Checkpoint save
/// failures are not errors here; they are reported alongside the outcome.
#[derive(Debug, Error)]
pub enum AgentError {
    /// The backend kept rate-limiting until the retrier gave up.
    #[error("rate limited after {attempts} attempts")]
    RateLimited {
        attempts: u32,
        #[source]
        source: LlmError,
    },
    /// The backend rejected the credentials.
    #[error("authentication failed: {0}")]
    Unauthenticated(String),
    /// The run tried to enter generation more times than allowed.
    #[error("recursion limit of {limit} exceeded")]
    RecursionLimitExceeded { limit: u32 },
    /// The backend asked for a tool that is not registered.
    #[error("unknown tool: {0}")]
    UnknownTool(String),
    #[error(transparent)]
    Tool(ToolError),
    #[error(transparent)]
    Llm(LlmError),
    /// The caller cancelled the run.
    #[error("run cancelled")]
    Cancelled,
    /// Execution failed with a message (e.g. a task panicked).
    #[error("execution failed: {0}")]
    ExecutionFailed(String),
}

impl From<LlmError> for AgentError {
    fn from(e: LlmError) -> Self {
        match e {
            LlmError::Unauthenticated(msg) => AgentError::Unauthenticated(msg),
            LlmError::RateLimited(_) => AgentError::RateLimited {
                attempts: 1,
                source: e,
            },
            other => AgentError::Llm(other),
        }
    }
}

impl From<RetryError<LlmError>> for AgentError {
    fn from(e: RetryError<LlmError>) -> Self {
        match e {
            RetryError::Exhausted { attempts, last } => AgentError::RateLimited {
                attempts,
                source: last,
            },
            RetryError::Fatal(e) => e.into(),
        }
    }
}

impl From<ToolError> for AgentError {
    fn from(e: ToolError) -> Self {
        match e {
            ToolError::UnknownTool(name) => AgentError::UnknownTool(name),
            other => AgentError::Tool(other),
        }
    }
}

/// Failure category reported to end users. Messages are stable; internal details are not
/// exposed through them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum UserFacingError {
    #[error("The assistant is receiving too many requests right now. Please try again in a moment.")]
    RateLimited,
    #[error("The assistant could not authenticate with its language service. Please check the API key configuration.")]
    AuthenticationFailed,
    #[error("The assistant failed to complete your request. Please try again.")]
    AgentFailure,
}

impl From<&AgentError> for UserFacingError {
    fn from(e: &AgentError) -> Self {
        match e {
            AgentError::RateLimited { .. } => UserFacingError::RateLimited,
            AgentError::Unauthenticated(_) => UserFacingError::AuthenticationFailed,
            _ => UserFacingError::AgentFailure,
        }
    }
}

impl From<AgentError> for UserFacingError {
    fn from(e: AgentError) -> Self {
        UserFacingError::from(&e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// **Scenario**: Display format of ExecutionFailed contains "execution failed" and the message.
    #[test]
    fn agent_error_display_execution_failed() {
        let err = AgentError::ExecutionFailed("msg".to_string());
        let s = err.to_string();
        assert!(s.contains("execution failed"), "{}", s);
        assert!(s.contains("msg"), "{}", s);
    }

    /// **Scenario**: Exhausted retries become RateLimited carrying the attempt count.
    #[test]
    fn exhausted_retry_maps_to_rate_limited() {
        let err: AgentError = RetryError::Exhausted {
            attempts: 3,
            last: LlmError::RateLimited("429".into()),
        }
        .into();
        assert!(matches!(err, AgentError::RateLimited { attempts: 3, .. }));
        assert_eq!(UserFacingError::from(&err), UserFacingError::RateLimited);
    }

    /// **Scenario**: Fatal auth failure maps to AuthenticationFailed; everything else to AgentFailure.
    #[test]
    fn user_facing_categories() {
        let auth: AgentError = RetryError::Fatal(LlmError::Unauthenticated("bad key".into())).into();
        assert_eq!(UserFacingError::from(&auth), UserFacingError::AuthenticationFailed);

        let others = [
            AgentError::RecursionLimitExceeded { limit: 15 },
            AgentError::UnknownTool("nope".into()),
            AgentError::Llm(LlmError::Api("500".into())),
            AgentError::Cancelled,
        ];
        for e in &others {
            assert_eq!(UserFacingError::from(e), UserFacingError::AgentFailure, "{:?}", e);
        }
    }

    /// **Scenario**: User-facing messages do not leak internal details.
    #[test]
    fn user_facing_messages_are_stable() {
        let err = AgentError::Llm(LlmError::Api("secret internal trace".into()));
        let msg = UserFacingError::from(err).to_string();
        assert!(!msg.contains("secret"));
        assert!(msg.contains("failed"));
    }

    #[test]
    fn unknown_tool_error_maps_to_unknown_tool() {
        let err: AgentError = ToolError::UnknownTool("x".into()).into();
        assert!(matches!(err, AgentError::UnknownTool(ref n) if n == "x"));
    }
}
