use serde::{Deserialize, Serialize};

use super::message::Role;
use super::tool::ToolCall;

/// Reason the model stopped generating
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    Stop,
    Length,
    ToolCalls,
    /// The stream was terminated by a gateway-side failure
    Error,
}

/// Token usage statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

impl Usage {
    pub const fn new(prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens.saturating_add(completion_tokens),
        }
    }
}

/// Assistant message inside a response choice
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoiceMessage {
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
}

/// A single completion choice
///
/// `tool_calls` appears both on the choice and on its message so that
/// clients reading either location see the call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Choice {
    pub index: u32,
    pub message: ChoiceMessage,
    pub finish_reason: FinishReason,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
}

impl Choice {
    pub fn new(content: String, finish_reason: FinishReason, tool_calls: Option<Vec<ToolCall>>) -> Self {
        Self {
            index: 0,
            message: ChoiceMessage {
                role: Role::Assistant,
                content,
                tool_calls: tool_calls.clone(),
            },
            finish_reason,
            tool_calls,
        }
    }
}

/// Non-streaming chat completion response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionResponse {
    pub id: String,
    /// Always `"chat.completion"`
    pub object: String,
    pub created: u64,
    /// Alias the caller asked for
    pub model: String,
    pub choices: Vec<Choice>,
    pub usage: Usage,
}

impl CompletionResponse {
    pub fn new(model: impl Into<String>, choice: Choice, usage: Usage) -> Self {
        Self {
            id: super::completion_id(),
            object: "chat.completion".to_owned(),
            created: super::unix_now(),
            model: model.into(),
            choices: vec![choice],
            usage,
        }
    }
}
