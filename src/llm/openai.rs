//! OpenAI chat-completions implementation of [`ChatModel`].

use super::{
    ChatModel, CompletionRequest, ContentBlock, Message, ModelResponse, Role, StopReason,
    ToolChoice,
};
use crate::config::Settings;
use crate::error::{CoursemateError, Result};
use crate::openai::{create_client, create_client_with_timeout};
use crate::tools::ToolDefinition;
use async_openai::types::{
    ChatCompletionMessageToolCall, ChatCompletionRequestAssistantMessageArgs,
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestToolMessageArgs, ChatCompletionRequestUserMessageArgs,
    ChatCompletionTool, ChatCompletionToolChoiceOption, ChatCompletionToolType,
    CreateChatCompletionRequestArgs, FinishReason, FunctionCall, FunctionObject,
};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, instrument};

/// Chat model backed by the OpenAI API.
pub struct OpenAiChatModel {
    client: async_openai::Client<async_openai::config::OpenAIConfig>,
}

impl OpenAiChatModel {
    /// Create a model client with the default request timeout.
    pub fn new() -> Result<Self> {
        Ok(Self {
            client: create_client()?,
        })
    }

    /// Create a model client with a custom request timeout.
    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: create_client_with_timeout(timeout)?,
        })
    }

    /// Create a model client using the configured request timeout.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Self::with_timeout(settings.request_timeout())
    }
}

#[async_trait]
impl ChatModel for OpenAiChatModel {
    #[instrument(skip_all, fields(model = %request.params.model, messages = request.messages.len()))]
    async fn complete(&self, request: &CompletionRequest) -> Result<ModelResponse> {
        let messages = to_openai_messages(&request.system, &request.messages)?;

        let mut builder = CreateChatCompletionRequestArgs::default();
        builder
            .model(&request.params.model)
            .messages(messages)
            .temperature(request.params.temperature)
            .max_completion_tokens(request.params.max_tokens);

        if let Some(tools) = &request.tools {
            builder.tools(tools.iter().map(to_openai_tool).collect::<Vec<_>>());
        }
        if let Some(ToolChoice::Auto) = request.tool_choice {
            builder.tool_choice(ChatCompletionToolChoiceOption::Auto);
        }

        let api_request = builder
            .build()
            .map_err(|e| CoursemateError::Llm(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(api_request)
            .await
            .map_err(|e| CoursemateError::OpenAI(format!("Chat completion failed: {}", e)))?;

        let Some(choice) = response.choices.into_iter().next() else {
            debug!("Chat completion returned no choices");
            return Ok(ModelResponse {
                stop_reason: StopReason::EndTurn,
                content: Vec::new(),
            });
        };

        Ok(response_from_choice(
            choice.finish_reason,
            choice.message.content,
            choice.message.tool_calls,
        ))
    }
}

/// Flatten block-structured messages into the OpenAI message list.
///
/// Each tool result becomes its own `tool` message, in block order, so it
/// directly follows the assistant message that requested it.
fn to_openai_messages(
    system: &str,
    messages: &[Message],
) -> Result<Vec<ChatCompletionRequestMessage>> {
    let mut out: Vec<ChatCompletionRequestMessage> = vec![
        ChatCompletionRequestSystemMessageArgs::default()
            .content(system.to_string())
            .build()
            .map_err(|e| CoursemateError::Llm(e.to_string()))?
            .into(),
    ];

    for message in messages {
        match message.role {
            Role::User => {
                for block in &message.content {
                    match block {
                        ContentBlock::Text { text } => out.push(
                            ChatCompletionRequestUserMessageArgs::default()
                                .content(text.clone())
                                .build()
                                .map_err(|e| CoursemateError::Llm(e.to_string()))?
                                .into(),
                        ),
                        ContentBlock::ToolResult {
                            tool_use_id,
                            content,
                        } => out.push(
                            ChatCompletionRequestToolMessageArgs::default()
                                .tool_call_id(tool_use_id.clone())
                                .content(content.clone())
                                .build()
                                .map_err(|e| CoursemateError::Llm(e.to_string()))?
                                .into(),
                        ),
                        ContentBlock::ToolUse { .. } => {
                            return Err(CoursemateError::InvalidInput(
                                "tool_use block in a user message".to_string(),
                            ))
                        }
                    }
                }
            }
            Role::Assistant => {
                let text = message
                    .content
                    .iter()
                    .filter_map(|block| match block {
                        ContentBlock::Text { text } => Some(text.as_str()),
                        _ => None,
                    })
                    .collect::<Vec<_>>()
                    .join("\n");

                let tool_calls: Vec<ChatCompletionMessageToolCall> = message
                    .content
                    .iter()
                    .filter_map(|block| match block {
                        ContentBlock::ToolUse { id, name, input } => {
                            Some(ChatCompletionMessageToolCall {
                                id: id.clone(),
                                r#type: ChatCompletionToolType::Function,
                                function: FunctionCall {
                                    name: name.clone(),
                                    arguments: input.to_string(),
                                },
                            })
                        }
                        _ => None,
                    })
                    .collect();

                let mut builder = ChatCompletionRequestAssistantMessageArgs::default();
                if !text.is_empty() || tool_calls.is_empty() {
                    builder.content(text);
                }
                if !tool_calls.is_empty() {
                    builder.tool_calls(tool_calls);
                }
                out.push(
                    builder
                        .build()
                        .map_err(|e| CoursemateError::Llm(e.to_string()))?
                        .into(),
                );
            }
        }
    }

    Ok(out)
}

fn to_openai_tool(definition: &ToolDefinition) -> ChatCompletionTool {
    ChatCompletionTool {
        r#type: ChatCompletionToolType::Function,
        function: FunctionObject {
            name: definition.name.clone(),
            description: Some(definition.description.clone()),
            parameters: Some(definition.input_schema.clone()),
            strict: None,
        },
    }
}

/// Convert one OpenAI choice into a block-structured response.
fn response_from_choice(
    finish_reason: Option<FinishReason>,
    content: Option<String>,
    tool_calls: Option<Vec<ChatCompletionMessageToolCall>>,
) -> ModelResponse {
    let mut blocks = Vec::new();

    if let Some(text) = content.filter(|t| !t.is_empty()) {
        blocks.push(ContentBlock::Text { text });
    }

    let tool_calls = tool_calls.unwrap_or_default();
    let has_tool_calls = !tool_calls.is_empty();

    for call in tool_calls {
        // Malformed arguments pass through as a string; the tool rejects them
        // and the model sees that as a normal tool result.
        let input = serde_json::from_str(&call.function.arguments)
            .unwrap_or(serde_json::Value::String(call.function.arguments));
        blocks.push(ContentBlock::ToolUse {
            id: call.id,
            name: call.function.name,
            input,
        });
    }

    let stop_reason = match finish_reason {
        _ if has_tool_calls => StopReason::ToolUse,
        Some(FinishReason::ToolCalls) => StopReason::ToolUse,
        Some(FinishReason::Stop) | None => StopReason::EndTurn,
        Some(FinishReason::Length) => StopReason::MaxTokens,
        Some(FinishReason::ContentFilter) => StopReason::Other("content_filter".to_string()),
        Some(FinishReason::FunctionCall) => StopReason::Other("function_call".to_string()),
    };

    ModelResponse {
        stop_reason,
        content: blocks,
    }
}
