use serde::{Deserialize, Serialize};

use super::message::Role;
use super::response::{Choice, CompletionResponse, FinishReason, Usage};
use super::tool::ToolCall;

/// One `chat.completion.chunk` SSE payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamChunk {
    pub id: String,
    /// Always `"chat.completion.chunk"`
    pub object: String,
    pub created: u64,
    pub model: String,
    /// Only set on the trailing usage chunk, which has no choices
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
    pub choices: Vec<ChunkChoice>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkChoice {
    pub index: u32,
    pub delta: ChunkDelta,
    /// Serialized as `null` on every chunk but the terminal one
    pub finish_reason: Option<FinishReason>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkDelta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
}

impl StreamChunk {
    fn with_delta(id: &str, created: u64, model: &str, delta: ChunkDelta, finish_reason: Option<FinishReason>) -> Self {
        Self {
            id: id.to_owned(),
            object: "chat.completion.chunk".to_owned(),
            created,
            model: model.to_owned(),
            usage: None,
            choices: vec![ChunkChoice {
                index: 0,
                delta,
                finish_reason,
            }],
        }
    }

    /// Opening chunk carrying only the assistant role
    pub fn role(id: &str, created: u64, model: &str) -> Self {
        let delta = ChunkDelta {
            role: Some(Role::Assistant),
            ..ChunkDelta::default()
        };
        Self::with_delta(id, created, model, delta, None)
    }

    pub fn content(id: &str, created: u64, model: &str, text: impl Into<String>) -> Self {
        let delta = ChunkDelta {
            content: Some(text.into()),
            ..ChunkDelta::default()
        };
        Self::with_delta(id, created, model, delta, None)
    }

    pub fn tool_calls(id: &str, created: u64, model: &str, mut calls: Vec<ToolCall>) -> Self {
        for (index, call) in (0..).zip(calls.iter_mut()) {
            call.index = Some(index);
        }

        let delta = ChunkDelta {
            tool_calls: Some(calls),
            ..ChunkDelta::default()
        };
        Self::with_delta(id, created, model, delta, None)
    }

    /// Terminal chunk with an empty delta
    pub fn finish(id: &str, created: u64, model: &str, reason: FinishReason) -> Self {
        Self::with_delta(id, created, model, ChunkDelta::default(), Some(reason))
    }

    /// Usage report sent after the terminal chunk when the caller asked for it
    pub fn usage(id: &str, created: u64, model: &str, usage: Usage) -> Self {
        Self {
            id: id.to_owned(),
            object: "chat.completion.chunk".to_owned(),
            created,
            model: model.to_owned(),
            usage: Some(usage),
            choices: Vec::new(),
        }
    }

    pub fn finish_reason(&self) -> Option<FinishReason> {
        self.choices.first().and_then(|c| c.finish_reason)
    }
}

/// Folds a chunk sequence into the equivalent non-streaming response
#[derive(Debug, Default)]
pub struct StreamFolder {
    id: Option<String>,
    created: u64,
    model: String,
    content: String,
    tool_calls: Vec<ToolCall>,
    finish_reason: Option<FinishReason>,
    usage: Option<Usage>,
}

impl StreamFolder {
    pub fn push(&mut self, chunk: &StreamChunk) {
        if self.id.is_none() {
            self.id = Some(chunk.id.clone());
            self.created = chunk.created;
            self.model.clone_from(&chunk.model);
        }

        if let Some(usage) = chunk.usage {
            self.usage = Some(usage);
        }

        for choice in &chunk.choices {
            if let Some(text) = &choice.delta.content {
                self.content.push_str(text);
            }
            if let Some(calls) = &choice.delta.tool_calls {
                self.tool_calls.extend(calls.iter().cloned().map(|mut call| {
                    call.index = None;
                    call
                }));
            }
            if let Some(reason) = choice.finish_reason {
                self.finish_reason = Some(reason);
            }
        }
    }

    /// Build the response, preferring streamed usage over `fallback`
    pub fn finish(self, fallback: Usage) -> CompletionResponse {
        let usage = self.usage.unwrap_or(fallback);
        let tool_calls = (!self.tool_calls.is_empty()).then_some(self.tool_calls);
        let choice = Choice::new(self.content, self.finish_reason.unwrap_or(FinishReason::Stop), tool_calls);

        CompletionResponse {
            id: self.id.unwrap_or_else(super::completion_id),
            object: "chat.completion".to_owned(),
            created: self.created,
            model: self.model,
            choices: vec![choice],
            usage,
        }
    }
}
