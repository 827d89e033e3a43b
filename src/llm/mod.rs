//! Generative model boundary.
//!
//! Provider-neutral message and response types plus the [`ChatModel`] trait
//! the agent loop drives. Content is a list of typed blocks so tool requests
//! and tool results travel in the exact order the model produced them.

mod openai;

pub use openai::OpenAiChatModel;

use crate::error::Result;
use crate::tools::ToolDefinition;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Author of a conversation message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// A typed block of message content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    /// Plain text.
    Text { text: String },
    /// A request from the model to run a named tool.
    ToolUse {
        id: String,
        name: String,
        input: serde_json::Value,
    },
    /// The output of a tool, answering the tool use with the same id.
    ToolResult {
        tool_use_id: String,
        content: String,
    },
}

impl ContentBlock {
    /// Create a text block.
    pub fn text(text: impl Into<String>) -> Self {
        ContentBlock::Text { text: text.into() }
    }
}

/// A role-tagged conversation message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: Vec<ContentBlock>,
}

impl Message {
    /// A user message holding a single text block.
    pub fn user_text(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: vec![ContentBlock::text(text)],
        }
    }
}

/// Why the model stopped generating.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// The model wants one or more tools run before it can finish.
    ToolUse,
    /// The model finished its answer.
    EndTurn,
    /// The token budget ran out.
    MaxTokens,
    /// Any other provider-defined terminal reason.
    Other(String),
}

impl std::fmt::Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StopReason::ToolUse => write!(f, "tool_use"),
            StopReason::EndTurn => write!(f, "end_turn"),
            StopReason::MaxTokens => write!(f, "max_tokens"),
            StopReason::Other(reason) => write!(f, "{}", reason),
        }
    }
}

/// A model response.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelResponse {
    pub stop_reason: StopReason,
    pub content: Vec<ContentBlock>,
}

impl ModelResponse {
    /// True when the model stopped to request tools.
    pub fn is_tool_use(&self) -> bool {
        self.stop_reason == StopReason::ToolUse
    }

    /// Text of the first text block, if any.
    pub fn first_text(&self) -> Option<&str> {
        self.content.iter().find_map(|block| match block {
            ContentBlock::Text { text } => Some(text.as_str()),
            _ => None,
        })
    }
}

/// Fixed generation parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelParams {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// How the model may use the advertised tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolChoice {
    /// The model decides whether to call a tool.
    Auto,
}

/// Everything sent to the model in one call.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub system: String,
    pub messages: Vec<Message>,
    pub params: ModelParams,
    /// Tool definitions, or `None` when the model must answer in text.
    pub tools: Option<Vec<ToolDefinition>>,
    pub tool_choice: Option<ToolChoice>,
}

/// A chat-completion service supporting structured tool invocation.
///
/// Transport, auth and rate-limit failures are returned as errors; callers do
/// not retry.
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> Result<ModelResponse>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_stop_reason_display() {
        assert_eq!(StopReason::ToolUse.to_string(), "tool_use");
        assert_eq!(StopReason::EndTurn.to_string(), "end_turn");
        assert_eq!(
            StopReason::Other("content_filter".to_string()).to_string(),
            "content_filter"
        );
    }

    #[test]
    fn test_first_text_skips_tool_blocks() {
        let response = ModelResponse {
            stop_reason: StopReason::EndTurn,
            content: vec![
                ContentBlock::ToolUse {
                    id: "t1".to_string(),
                    name: "search_course_content".to_string(),
                    input: json!({}),
                },
                ContentBlock::text("first"),
                ContentBlock::text("second"),
            ],
        };
        assert_eq!(response.first_text(), Some("first"));
        assert!(!response.is_tool_use());
    }

    #[test]
    fn test_content_block_wire_shape() {
        let block = ContentBlock::ToolResult {
            tool_use_id: "t1".to_string(),
            content: "ok".to_string(),
        };
        assert_eq!(
            serde_json::to_value(&block).unwrap(),
            json!({"type": "tool_result", "tool_use_id": "t1", "content": "ok"})
        );
    }
}
