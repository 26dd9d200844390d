//! Library-level run configuration shared by the entry point and its nodes.

use crate::graph::DEFAULT_RECURSION_LIMIT;
use crate::react::SYSTEM_PROMPT;
use crate::retry::RetryPolicy;
use crate::tools::DEFAULT_LOOKUP_LIMIT;

/// Knobs for one [`AgentRunner`](crate::react::AgentRunner).
///
/// Defaults: recursion limit 15, retry 3 attempts with 500 ms base and 8 s cap, lookup limit 10,
/// the built-in catalog directive.
#[derive(Debug, Clone)]
pub struct WorkflowConfig {
    /// Maximum generation entries per run.
    pub recursion_limit: u32,
    /// Backoff policy for rate-limited backend calls.
    pub retry: RetryPolicy,
    /// Default result limit of the lookup tool.
    pub lookup_limit: usize,
    /// Directive template; `{current_time}` is interpolated per request.
    pub system_prompt: String,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            recursion_limit: DEFAULT_RECURSION_LIMIT,
            retry: RetryPolicy::default(),
            lookup_limit: DEFAULT_LOOKUP_LIMIT,
            system_prompt: SYSTEM_PROMPT.to_string(),
        }
    }
}

impl WorkflowConfig {
    pub fn with_recursion_limit(mut self, limit: u32) -> Self {
        self.recursion_limit = limit;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_lookup_limit(mut self, limit: usize) -> Self {
        self.lookup_limit = limit;
        self
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }
}
