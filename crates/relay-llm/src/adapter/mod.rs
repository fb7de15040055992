//! Per-model-family request formatting and response parsing

mod llama;
mod nova;
mod prompt;

pub use llama::LlamaAdapter;
pub use nova::NovaAdapter;
pub use prompt::tool_instruction;

use serde_json::Value;

use crate::marker::TOOL_END;
use crate::types::{ChatMessage, FinishReason, GenerationParams, ToolSpec};

/// Generation result extracted from a complete backend response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedOutput {
    pub text: String,
    /// Either `Stop` or `Length`
    pub finish_reason: FinishReason,
    /// Zero when the backend did not report it
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

/// What one backend stream event contributes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamFragment {
    pub text: Option<String>,
    pub finish: Option<FinishReason>,
    /// `(prompt_tokens, completion_tokens)` when the event carries counts
    pub usage: Option<(u32, u32)>,
}

/// Wire-shape strategy for one model family
///
/// Implementations only differ in payload layout; tool instruction
/// synthesis and stop-sequence handling are shared.
pub trait ModelAdapter: Send + Sync {
    /// Family name used in logs
    fn family(&self) -> &'static str;

    /// Build the backend-native request body
    fn format_request(&self, messages: &[ChatMessage], params: &GenerationParams, tools: &[ToolSpec]) -> Value;

    /// Extract text, finish reason and token counts from a complete response
    fn parse_response(&self, body: &Value) -> ParsedOutput;

    /// Extract the contribution of one streaming event
    fn parse_stream_event(&self, event: &Value) -> StreamFragment;
}

impl std::fmt::Debug for dyn ModelAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.family())
    }
}

/// Stop sequences sent to the backend
///
/// The closing tool marker comes first whenever tools are declared.
pub(crate) fn stop_sequences(params: &GenerationParams, tools: &[ToolSpec]) -> Vec<String> {
    let mut stops = Vec::with_capacity(params.stop.len() + 1);

    if !tools.is_empty() {
        stops.push(TOOL_END.to_owned());
    }
    stops.extend(params.stop.iter().filter(|s| s.as_str() != TOOL_END || tools.is_empty()).cloned());

    stops
}

/// Token count field that may be absent, null or negative
pub(crate) fn token_count(value: Option<&Value>) -> u32 {
    value
        .and_then(Value::as_u64)
        .map_or(0, |n| u32::try_from(n).unwrap_or(u32::MAX))
}

/// `amazon-bedrock-invocationMetrics` block appended to the last stream event
pub(crate) fn invocation_metrics(event: &Value) -> Option<(u32, u32)> {
    let metrics = event.get("amazon-bedrock-invocationMetrics")?;

    Some((
        token_count(metrics.get("inputTokenCount")),
        token_count(metrics.get("outputTokenCount")),
    ))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::types::GenerationParams;

    fn tool() -> ToolSpec {
        ToolSpec::function("server.get_status", "Report status", json!({"type": "object", "properties": {}}))
    }

    fn params_with_stop(stop: &[&str]) -> GenerationParams {
        GenerationParams {
            stop: stop.iter().map(|s| (*s).to_owned()).collect(),
            ..GenerationParams::default()
        }
    }

    #[test]
    fn closing_marker_leads_when_tools_are_present() {
        let stops = stop_sequences(&params_with_stop(&["END"]), &[tool()]);
        assert_eq!(stops, vec!["TOOL_END", "END"]);
    }

    #[test]
    fn closing_marker_is_absent_without_tools() {
        assert!(stop_sequences(&GenerationParams::default(), &[]).is_empty());
        assert_eq!(stop_sequences(&params_with_stop(&["END"]), &[]), vec!["END"]);
    }

    #[test]
    fn closing_marker_is_not_duplicated() {
        let stops = stop_sequences(&params_with_stop(&["TOOL_END"]), &[tool()]);
        assert_eq!(stops, vec!["TOOL_END"]);
    }

    #[test]
    fn adapters_include_closing_marker_iff_tools_present() {
        let adapters: [&dyn ModelAdapter; 2] = [&LlamaAdapter, &NovaAdapter];
        let messages = [ChatMessage::user("hi")];
        let params = GenerationParams::default();

        for adapter in adapters {
            let with_tools = adapter.format_request(&messages, &params, &[tool()]).to_string();
            let without_tools = adapter.format_request(&messages, &params, &[]).to_string();

            assert!(with_tools.contains("\"TOOL_END\""), "{} with tools", adapter.family());
            assert!(!without_tools.contains("TOOL_END"), "{} without tools", adapter.family());
        }
    }

    #[test]
    fn token_counts_tolerate_missing_and_null() {
        assert_eq!(token_count(None), 0);
        assert_eq!(token_count(Some(&Value::Null)), 0);
        assert_eq!(token_count(Some(&json!(-3))), 0);
        assert_eq!(token_count(Some(&json!(12))), 12);
    }
}
