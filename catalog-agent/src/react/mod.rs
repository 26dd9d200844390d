//! ReAct loop nodes and the entry point that drives them.
//!
//! - [`GenerateStep`]: renders the directive, calls the backend through the retrier, appends
//!   one assistant message.
//! - [`ToolExecutionStep`]: answers every pending tool call with one tool-result message.
//! - [`AgentRunner`]: loads or seeds a thread, runs the workflow, saves, returns the reply.

mod generate_node;
mod runner;
mod tools_node;

pub use generate_node::GenerateStep;
pub use runner::{AgentReply, AgentRunner};
pub use tools_node::{
    ErrorHandlerFn, HandleToolErrors, ToolExecutionStep, DEFAULT_TOOL_ERROR_TEMPLATE,
};

use chrono::{DateTime, Utc};

/// Default system directive for the catalog assistant.
///
/// `{current_time}` is replaced on every generation request; see [`render_system_prompt`].
pub const SYSTEM_PROMPT: &str = r#"You are a helpful shopping assistant for a furniture and home goods store.

RULES:
1. For ANY question about products, availability, prices or stock, call the lookup_inventory tool first. Never answer catalog questions from memory.
2. Search with the words the customer used (e.g. "oak table"). If nothing comes back, try a broader query once before saying the item is unavailable.
3. Only mention items returned by the tool. Include name, price and quantity when the tool provides them.
4. If the tool reports an error, tell the customer the catalog is unavailable right now.
5. For greetings or questions unrelated to the catalog, answer directly without tools.

Current time: {current_time}"#;

/// Replaces `{current_time}` in `template` with `now` (RFC 3339, seconds precision).
pub fn render_system_prompt(template: &str, now: DateTime<Utc>) -> String {
    template.replace(
        "{current_time}",
        &now.to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn render_system_prompt_inserts_timestamp() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap();
        let rendered = render_system_prompt(SYSTEM_PROMPT, now);
        assert!(rendered.contains("Current time: 2024-05-01T12:30:00Z"), "{}", rendered);
        assert!(!rendered.contains("{current_time}"));
        assert!(rendered.contains("lookup_inventory"));
    }

    #[test]
    fn render_system_prompt_leaves_plain_templates_alone() {
        assert_eq!(render_system_prompt("be brief", Utc::now()), "be brief");
    }
}
