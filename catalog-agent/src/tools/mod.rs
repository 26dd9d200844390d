//! Tools the generation backend can invoke.
//!
//! - [`Tool`]: one named capability with a JSON-schema spec and an async `call`.
//! - [`ToolRegistry`]: name to tool lookup used by the tool-execution step.
//! - [`HybridLookupTool`]: catalog search (semantic first, keyword fallback).

mod lookup;
mod registry;

pub use lookup::{
    HybridLookupTool, ItemRecord, LookupFailure, LookupResult, LookupSuccess, SearchType,
    DEFAULT_LOOKUP_LIMIT, MAX_LOOKUP_LIMIT, TOOL_LOOKUP_INVENTORY,
};
pub use registry::ToolRegistry;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

/// Tool specification as advertised to the generation backend.
///
/// **Interaction**: Returned by `Tool::spec()` and `ToolRegistry::specs()`; consumed by the
/// generate step when building a backend request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolSpec {
    /// Tool name, used in tool calls.
    pub name: String,
    /// Human-readable description for the model.
    pub description: Option<String>,
    /// JSON Schema for arguments.
    pub input_schema: Value,
}

/// Result of a single tool call.
///
/// **Interaction**: Returned by `Tool::call()`; the tool-execution step wraps the text in a
/// `Message::Tool`.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCallContent {
    /// Result text (the lookup tool returns its JSON envelope here).
    pub text: String,
}

/// Errors from calling tools.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("tool not found: {0}")]
    UnknownTool(String),
    #[error("invalid arguments: {0}")]
    InvalidInput(String),
    #[error("tool execution failed: {0}")]
    Execution(String),
}

/// A named capability the model may invoke with JSON arguments.
///
/// Implementations: [`HybridLookupTool`]. Register with [`ToolRegistry::register`].
#[async_trait]
pub trait Tool: Send + Sync {
    /// Tool name, used for registration and calls.
    fn name(&self) -> &str;

    /// Spec advertised to the model.
    fn spec(&self) -> ToolSpec;

    /// Runs the tool with already-parsed arguments.
    async fn call(&self, arguments: Value) -> Result<ToolCallContent, ToolError>;
}
