use serde::{Deserialize, Serialize};

use super::message::ChatMessage;
use super::tool::ToolSpec;

const DEFAULT_MAX_TOKENS: u32 = 1000;
const DEFAULT_TEMPERATURE: f64 = 0.7;
const DEFAULT_TOP_P: f64 = 1.0;

/// Stop sequences, as a single string or a list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StopSequences {
    One(String),
    Many(Vec<String>),
}

impl StopSequences {
    pub fn to_vec(&self) -> Vec<String> {
        match self {
            Self::One(stop) => vec![stop.clone()],
            Self::Many(stops) => stops.clone(),
        }
    }
}

/// Streaming options, honoured only when `stream` is set
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamOptions {
    /// Send a final chunk with token usage before `[DONE]`
    #[serde(default)]
    pub include_usage: bool,
}

/// Chat completion request as sent by the caller
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRequest {
    /// Model alias, e.g. `llama`
    pub model: String,
    pub messages: Vec<ChatMessage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    #[serde(default)]
    pub stream: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream_options: Option<StreamOptions>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop: Option<StopSequences>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<ToolSpec>>,
}

/// Generation parameters with defaults applied
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationParams {
    pub max_tokens: u32,
    pub temperature: f64,
    pub top_p: f64,
    /// Caller-supplied stop sequences only
    pub stop: Vec<String>,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
            top_p: DEFAULT_TOP_P,
            stop: Vec::new(),
        }
    }
}

impl CompletionRequest {
    /// Minimal request with default parameters
    pub fn new(model: impl Into<String>, messages: Vec<ChatMessage>) -> Self {
        Self {
            model: model.into(),
            messages,
            max_tokens: None,
            temperature: None,
            top_p: None,
            stream: false,
            stream_options: None,
            stop: None,
            tools: None,
        }
    }

    pub fn params(&self) -> GenerationParams {
        GenerationParams {
            max_tokens: self.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            temperature: self.temperature.unwrap_or(DEFAULT_TEMPERATURE),
            top_p: self.top_p.unwrap_or(DEFAULT_TOP_P),
            stop: self.stop.as_ref().map(StopSequences::to_vec).unwrap_or_default(),
        }
    }

    pub fn include_usage(&self) -> bool {
        self.stream_options.is_some_and(|o| o.include_usage)
    }

    /// Declared tools, empty when none were sent
    pub fn tools(&self) -> &[ToolSpec] {
        self.tools.as_deref().unwrap_or_default()
    }

    pub fn has_tools(&self) -> bool {
        !self.tools().is_empty()
    }

    /// All message content joined by spaces, used for usage estimation
    pub fn prompt_text(&self) -> String {
        self.messages
            .iter()
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_when_fields_are_absent() {
        let request: CompletionRequest =
            serde_json::from_str(r#"{"model":"llama","messages":[{"role":"user","content":"hi"}]}"#).unwrap();

        assert!(!request.stream);
        assert!(!request.has_tools());
        assert_eq!(request.params(), GenerationParams::default());
    }

    #[test]
    fn stop_accepts_string_or_list() {
        let one: CompletionRequest =
            serde_json::from_str(r#"{"model":"nova","messages":[],"stop":"END"}"#).unwrap();
        let many: CompletionRequest =
            serde_json::from_str(r#"{"model":"nova","messages":[],"stop":["A","B"]}"#).unwrap();

        assert_eq!(one.params().stop, vec!["END"]);
        assert_eq!(many.params().stop, vec!["A", "B"]);
    }

    #[test]
    fn usage_is_only_included_on_request() {
        let plain: CompletionRequest = serde_json::from_str(r#"{"model":"nova","messages":[]}"#).unwrap();
        let opted: CompletionRequest = serde_json::from_str(
            r#"{"model":"nova","messages":[],"stream":true,"stream_options":{"include_usage":true}}"#,
        )
        .unwrap();

        assert!(!plain.include_usage());
        assert!(opted.include_usage());
    }

    #[test]
    fn empty_tool_list_counts_as_no_tools() {
        let request: CompletionRequest = serde_json::from_str(r#"{"model":"nova","messages":[],"tools":[]}"#).unwrap();
        assert!(!request.has_tools());
    }
}
