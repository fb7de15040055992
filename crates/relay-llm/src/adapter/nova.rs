use serde_json::{Value, json};

use super::{ModelAdapter, ParsedOutput, StreamFragment, invocation_metrics, stop_sequences, token_count, tool_instruction};
use crate::types::{ChatMessage, FinishReason, GenerationParams, Role, ToolSpec};

/// Amazon Nova models: structured message blocks plus `inferenceConfig`
#[derive(Debug, Clone, Copy, Default)]
pub struct NovaAdapter;

fn text_block(text: &str) -> Value {
    json!({ "text": text })
}

fn finish_reason(stop_reason: Option<&str>) -> FinishReason {
    match stop_reason {
        Some("max_tokens" | "length") => FinishReason::Length,
        _ => FinishReason::Stop,
    }
}

impl ModelAdapter for NovaAdapter {
    fn family(&self) -> &'static str {
        "nova"
    }

    fn format_request(&self, messages: &[ChatMessage], params: &GenerationParams, tools: &[ToolSpec]) -> Value {
        let system: Vec<Value> = if tools.is_empty() {
            messages
                .iter()
                .filter(|m| m.role == Role::System)
                .map(|m| text_block(&m.content))
                .collect()
        } else {
            vec![text_block(&tool_instruction(tools))]
        };

        let turns: Vec<Value> = messages
            .iter()
            .filter(|m| m.role != Role::System)
            .map(|m| json!({ "role": m.role.as_str(), "content": [text_block(&m.content)] }))
            .collect();

        let mut inference = json!({
            "max_new_tokens": params.max_tokens,
            "temperature": params.temperature,
            "top_p": params.top_p,
        });

        let stops = stop_sequences(params, tools);
        if !stops.is_empty() {
            inference["stopSequences"] = json!(stops);
        }

        let mut payload = json!({
            "messages": turns,
            "inferenceConfig": inference,
        });

        if !system.is_empty() {
            payload["system"] = Value::Array(system);
        }

        payload
    }

    fn parse_response(&self, body: &Value) -> ParsedOutput {
        let output = body.get("output");

        let text = output
            .and_then(|o| o.pointer("/message/content/0/text"))
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_owned();

        let usage = body.get("usage");

        ParsedOutput {
            text,
            finish_reason: finish_reason(
                output
                    .and_then(|o| o.get("stopReason"))
                    .or_else(|| body.get("stopReason"))
                    .and_then(Value::as_str),
            ),
            prompt_tokens: token_count(usage.and_then(|u| u.get("inputTokens"))),
            completion_tokens: token_count(usage.and_then(|u| u.get("outputTokens"))),
        }
    }

    fn parse_stream_event(&self, event: &Value) -> StreamFragment {
        let text = event
            .pointer("/contentBlockDelta/delta/text")
            .and_then(Value::as_str)
            .filter(|t| !t.is_empty())
            .map(str::to_owned);

        let finish = event
            .get("messageStop")
            .map(|stop| finish_reason(stop.get("stopReason").and_then(Value::as_str)));

        let usage = event
            .pointer("/metadata/usage")
            .map(|u| (token_count(u.get("inputTokens")), token_count(u.get("outputTokens"))))
            .or_else(|| invocation_metrics(event));

        StreamFragment { text, finish, usage }
    }
}
