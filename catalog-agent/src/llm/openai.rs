//! OpenAI Chat Completions client implementing `LlmClient` (ChatOpenAI).
//!
//! Requires `OPENAI_API_KEY` (or explicit config). Tool specs passed to `invoke` are sent as
//! function tools; tool calls in the reply become [`ToolCall`]s. Assistant messages with tool
//! calls and tool results are sent back in the OpenAI shape so multi-round tool use works.
//!
//! **Interaction**: Implements `LlmClient`; used by the generate step like `MockLlm`.
//! Depends on `async_openai` (feature `openai`).

use async_trait::async_trait;

use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::chat::{
        ChatCompletionMessageToolCall, ChatCompletionMessageToolCalls,
        ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
        ChatCompletionRequestSystemMessage, ChatCompletionRequestToolMessageArgs,
        ChatCompletionRequestUserMessage, ChatCompletionTool, ChatCompletionToolChoiceOption,
        ChatCompletionTools, CreateChatCompletionRequestArgs, FunctionCall, FunctionObject,
        ToolChoiceOptions,
    },
    Client,
};
use tracing::debug;

use super::{classify_failure, LlmClient, LlmError, LlmResponse, ToolChoiceMode};
use crate::message::{Message, ToolCall};
use crate::tools::ToolSpec;

/// Temperature sent when none is set: tool decisions stay repeatable for a fixed history.
pub const DEFAULT_TEMPERATURE: f32 = 0.0;

/// OpenAI Chat Completions client.
///
/// Uses `OPENAI_API_KEY` from the environment by default; or provide config via
/// `ChatOpenAI::with_config` (custom key or base URL for compatible endpoints).
pub struct ChatOpenAI {
    client: Client<OpenAIConfig>,
    model: String,
    temperature: Option<f32>,
    tool_choice: Option<ToolChoiceMode>,
}

impl ChatOpenAI {
    /// Build client with default config (API key from `OPENAI_API_KEY` env).
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            model: model.into(),
            temperature: Some(DEFAULT_TEMPERATURE),
            tool_choice: None,
        }
    }

    /// Build client with custom config (e.g. custom API key or base URL).
    pub fn with_config(config: OpenAIConfig, model: impl Into<String>) -> Self {
        Self {
            client: Client::with_config(config),
            model: model.into(),
            temperature: Some(DEFAULT_TEMPERATURE),
            tool_choice: None,
        }
    }

    /// Set temperature (0 to 2). Lower values are more deterministic.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set tool choice mode (auto, none, required). Overrides API default when tools are present.
    pub fn with_tool_choice(mut self, mode: ToolChoiceMode) -> Self {
        self.tool_choice = Some(mode);
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn temperature(&self) -> Option<f32> {
        self.temperature
    }

    /// Directive first, then history in order.
    fn messages_to_request(
        system: &str,
        messages: &[Message],
    ) -> Result<Vec<ChatCompletionRequestMessage>, LlmError> {
        let mut out = Vec::with_capacity(messages.len() + 1);
        out.push(ChatCompletionRequestMessage::System(
            ChatCompletionRequestSystemMessage::from(system),
        ));
        for m in messages {
            let converted = match m {
                Message::User { content } => ChatCompletionRequestMessage::User(
                    ChatCompletionRequestUserMessage::from(content.as_str()),
                ),
                Message::Assistant {
                    content,
                    tool_calls,
                } => {
                    let mut args = ChatCompletionRequestAssistantMessageArgs::default();
                    if !content.is_empty() {
                        args.content(content.clone());
                    }
                    if !tool_calls.is_empty() {
                        args.tool_calls(
                            tool_calls
                                .iter()
                                .map(|tc| {
                                    ChatCompletionMessageToolCalls::Function(
                                        ChatCompletionMessageToolCall {
                                            id: tc.id.clone(),
                                            function: FunctionCall {
                                                name: tc.name.clone(),
                                                arguments: tc.arguments.clone(),
                                            },
                                        },
                                    )
                                })
                                .collect::<Vec<_>>(),
                        );
                    }
                    ChatCompletionRequestMessage::Assistant(args.build().map_err(build_error)?)
                }
                Message::Tool {
                    call_id, content, ..
                } => ChatCompletionRequestMessage::Tool(
                    ChatCompletionRequestToolMessageArgs::default()
                        .content(content.clone())
                        .tool_call_id(call_id.clone())
                        .build()
                        .map_err(build_error)?,
                ),
            };
            out.push(converted);
        }
        Ok(out)
    }
}

fn build_error(e: OpenAIError) -> LlmError {
    LlmError::InvalidRequest(format!("OpenAI request build failed: {}", e))
}

/// Maps an `async_openai` failure onto [`LlmError`].
pub(crate) fn classify_openai_error(err: OpenAIError) -> LlmError {
    match err {
        OpenAIError::ApiError(api) => {
            let code = api.code.as_deref().or(api.r#type.as_deref());
            classify_failure(None, code, &api.message)
        }
        OpenAIError::Reqwest(e) => {
            let status = e.status().map(|s| s.as_u16());
            classify_failure(status, None, &e.to_string())
        }
        OpenAIError::InvalidArgument(msg) => LlmError::InvalidRequest(msg),
        other => LlmError::Api(other.to_string()),
    }
}

#[async_trait]
impl LlmClient for ChatOpenAI {
    async fn invoke(
        &self,
        system: &str,
        messages: &[Message],
        tools: &[ToolSpec],
    ) -> Result<LlmResponse, LlmError> {
        let mut args = CreateChatCompletionRequestArgs::default();
        args.model(self.model.clone());
        args.messages(Self::messages_to_request(system, messages)?);

        if !tools.is_empty() {
            let chat_tools: Vec<ChatCompletionTools> = tools
                .iter()
                .map(|t| {
                    ChatCompletionTools::Function(ChatCompletionTool {
                        function: FunctionObject {
                            name: t.name.clone(),
                            description: t.description.clone(),
                            parameters: Some(t.input_schema.clone()),
                            ..Default::default()
                        },
                    })
                })
                .collect();
            args.tools(chat_tools);

            if let Some(mode) = self.tool_choice {
                let opt = match mode {
                    ToolChoiceMode::Auto => ToolChoiceOptions::Auto,
                    ToolChoiceMode::None => ToolChoiceOptions::None,
                    ToolChoiceMode::Required => ToolChoiceOptions::Required,
                };
                args.tool_choice(ChatCompletionToolChoiceOption::Mode(opt));
            }
        }

        if let Some(t) = self.temperature {
            args.temperature(t);
        }

        let request = args.build().map_err(build_error)?;

        debug!(model = %self.model, messages = messages.len(), tools = tools.len(), "OpenAI chat request");
        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(classify_openai_error)?;

        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::Api("OpenAI returned no choices".to_string()))?;

        let msg = choice.message;
        let content = msg.content.unwrap_or_default();
        let tool_calls: Vec<ToolCall> = msg
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .filter_map(|tc| match tc {
                ChatCompletionMessageToolCalls::Function(f) => Some(ToolCall::new(
                    f.id,
                    f.function.name,
                    f.function.arguments,
                )),
                _ => None,
            })
            .collect();

        Ok(LlmResponse {
            content,
            tool_calls,
        })
    }
}

#[cfg(all(test, feature = "openai"))]
mod tests {
    use super::*;
    use async_openai::error::ApiError;

    /// **Scenario**: ChatOpenAI::with_config uses custom config and model.
    #[test]
    fn chat_openai_with_config_creates_client() {
        let config = OpenAIConfig::new().with_api_key("test-key");
        let llm = ChatOpenAI::with_config(config, "gpt-4o-mini")
            .with_temperature(0.0)
            .with_tool_choice(ToolChoiceMode::Auto);
        assert_eq!(llm.model(), "gpt-4o-mini");
    }

    /// **Scenario**: Both constructors default to temperature 0; with_temperature overrides it.
    #[test]
    fn temperature_defaults_to_zero() {
        let llm = ChatOpenAI::with_config(OpenAIConfig::new().with_api_key("k"), "gpt-4o-mini");
        assert_eq!(llm.temperature(), Some(0.0));
        assert_eq!(ChatOpenAI::new("gpt-4o-mini").temperature(), Some(0.0));
        assert_eq!(llm.with_temperature(0.7).temperature(), Some(0.7));
    }

    /// **Scenario**: Directive comes first; assistant tool calls and tool results convert.
    #[test]
    fn messages_to_request_keeps_tool_round() {
        let history = vec![
            Message::user("oak table?"),
            Message::assistant_with_tools(
                "",
                vec![ToolCall::new("call_1", "lookup_inventory", r#"{"query":"oak"}"#)],
            ),
            Message::tool_result("call_1", "lookup_inventory", "{}"),
        ];
        let out = ChatOpenAI::messages_to_request("be brief", &history).unwrap();
        assert_eq!(out.len(), 4);
        assert!(matches!(out[0], ChatCompletionRequestMessage::System(_)));
        assert!(matches!(out[2], ChatCompletionRequestMessage::Assistant(_)));
        assert!(matches!(out[3], ChatCompletionRequestMessage::Tool(_)));
    }

    /// **Scenario**: Provider error codes map to rate-limit and auth classes.
    #[test]
    fn classify_openai_api_errors() {
        let rate = OpenAIError::ApiError(ApiError {
            message: "Rate limit reached".into(),
            r#type: Some("requests".into()),
            param: None,
            code: Some("rate_limit_exceeded".into()),
        });
        assert!(matches!(classify_openai_error(rate), LlmError::RateLimited(_)));
        let auth = OpenAIError::ApiError(ApiError {
            message: "Incorrect API key provided".into(),
            r#type: Some("invalid_request_error".into()),
            param: None,
            code: Some("invalid_api_key".into()),
        });
        assert!(matches!(classify_openai_error(auth), LlmError::Unauthenticated(_)));
    }
}
