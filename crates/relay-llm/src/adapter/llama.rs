use serde_json::{Value, json};

use super::{ModelAdapter, ParsedOutput, StreamFragment, invocation_metrics, stop_sequences, token_count, tool_instruction};
use crate::types::{ChatMessage, FinishReason, GenerationParams, Role, ToolSpec};

const BEGIN_OF_TEXT: &str = "<|begin_of_text|>";
const END_OF_TURN: &str = "<|eot_id|>";

/// Llama 3 instruct models: one prompt string with header-tagged turns
#[derive(Debug, Clone, Copy, Default)]
pub struct LlamaAdapter;

impl LlamaAdapter {
    fn render_prompt(messages: &[ChatMessage], instruction: Option<&str>) -> String {
        let mut prompt = String::from(BEGIN_OF_TEXT);

        if let Some(instruction) = instruction {
            push_turn(&mut prompt, Role::System, instruction);
        }

        for message in messages {
            // the tool instruction replaces caller system turns
            if message.role == Role::System && instruction.is_some() {
                continue;
            }
            push_turn(&mut prompt, message.role, &message.content);
        }

        push_header(&mut prompt, Role::Assistant);
        prompt
    }
}

fn push_header(prompt: &mut String, role: Role) {
    prompt.push_str("<|start_header_id|>");
    prompt.push_str(role.as_str());
    prompt.push_str("<|end_header_id|>\n\n");
}

fn push_turn(prompt: &mut String, role: Role, content: &str) {
    push_header(prompt, role);
    prompt.push_str(content);
    prompt.push_str(END_OF_TURN);
}

fn finish_reason(stop_reason: Option<&str>) -> FinishReason {
    match stop_reason {
        Some("length" | "max_tokens") => FinishReason::Length,
        _ => FinishReason::Stop,
    }
}

impl ModelAdapter for LlamaAdapter {
    fn family(&self) -> &'static str {
        "llama"
    }

    fn format_request(&self, messages: &[ChatMessage], params: &GenerationParams, tools: &[ToolSpec]) -> Value {
        let instruction = (!tools.is_empty()).then(|| tool_instruction(tools));

        let mut payload = json!({
            "prompt": Self::render_prompt(messages, instruction.as_deref()),
            "max_gen_len": params.max_tokens,
            "temperature": params.temperature,
            "top_p": params.top_p,
        });

        let stops = stop_sequences(params, tools);
        if !stops.is_empty() {
            payload["stop_sequences"] = json!(stops);
        }

        payload
    }

    fn parse_response(&self, body: &Value) -> ParsedOutput {
        ParsedOutput {
            text: body.get("generation").and_then(Value::as_str).unwrap_or_default().to_owned(),
            finish_reason: finish_reason(body.get("stop_reason").and_then(Value::as_str)),
            prompt_tokens: token_count(body.get("prompt_token_count")),
            completion_tokens: token_count(body.get("generation_token_count")),
        }
    }

    fn parse_stream_event(&self, event: &Value) -> StreamFragment {
        StreamFragment {
            text: event
                .get("generation")
                .and_then(Value::as_str)
                .filter(|t| !t.is_empty())
                .map(str::to_owned),
            finish: event
                .get("stop_reason")
                .and_then(Value::as_str)
                .map(|reason| finish_reason(Some(reason))),
            usage: invocation_metrics(event),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn prompt_uses_llama_header_tokens() {
        let messages = [ChatMessage::system("be brief"), ChatMessage::user("hi")];
        let payload = LlamaAdapter.format_request(&messages, &GenerationParams::default(), &[]);

        assert_eq!(
            payload["prompt"],
            "<|begin_of_text|><|start_header_id|>system<|end_header_id|>\n\nbe brief<|eot_id|>\
             <|start_header_id|>user<|end_header_id|>\n\nhi<|eot_id|>\
             <|start_header_id|>assistant<|end_header_id|>\n\n"
        );
        assert_eq!(payload["max_gen_len"], 1000);
        assert_eq!(payload["temperature"], 0.7);
        assert_eq!(payload["top_p"], 1.0);
        assert!(payload.get("stop_sequences").is_none());
    }

    #[test]
    fn tool_instruction_replaces_caller_system_turn() {
        let messages = [ChatMessage::system("be brief"), ChatMessage::user("hi")];
        let tools = [ToolSpec::function("server.get_status", "Report status", json!({}))];

        let payload = LlamaAdapter.format_request(&messages, &GenerationParams::default(), &tools);
        let prompt = payload["prompt"].as_str().unwrap();

        assert!(!prompt.contains("be brief"));
        assert!(prompt.contains("- server.get_status: Report status"));
        assert_eq!(payload["stop_sequences"], json!(["TOOL_END"]));
    }

    #[test]
    fn response_fields_are_extracted() {
        let parsed = LlamaAdapter.parse_response(&json!({
            "generation": "Hello",
            "stop_reason": "length",
            "prompt_token_count": 11,
            "generation_token_count": 4
        }));

        assert_eq!(parsed.text, "Hello");
        assert_eq!(parsed.finish_reason, FinishReason::Length);
        assert_eq!((parsed.prompt_tokens, parsed.completion_tokens), (11, 4));
    }

    #[test]
    fn unknown_stop_reasons_map_to_stop() {
        for reason in [json!("stop"), json!("end_of_turn"), json!("content_filtered"), Value::Null] {
            let parsed = LlamaAdapter.parse_response(&json!({"generation": "", "stop_reason": reason}));
            assert_eq!(parsed.finish_reason, FinishReason::Stop);
        }
    }

    #[test]
    fn stream_events_yield_text_then_finish() {
        let first = LlamaAdapter.parse_stream_event(&json!({"generation": "Hel", "stop_reason": null}));
        assert_eq!(first.text.as_deref(), Some("Hel"));
        assert!(first.finish.is_none());

        let last = LlamaAdapter.parse_stream_event(&json!({
            "generation": "",
            "stop_reason": "stop",
            "amazon-bedrock-invocationMetrics": {"inputTokenCount": 9, "outputTokenCount": 2}
        }));
        assert!(last.text.is_none());
        assert_eq!(last.finish, Some(FinishReason::Stop));
        assert_eq!(last.usage, Some((9, 2)));
    }

    #[test]
    fn own_payload_shape_round_trips_to_a_finish_reason() {
        let payload = LlamaAdapter.format_request(&[ChatMessage::user("hi")], &GenerationParams::default(), &[]);
        let echoed = json!({"generation": payload["prompt"], "stop_reason": "end_of_turn"});

        let parsed = LlamaAdapter.parse_response(&echoed);
        assert!(matches!(parsed.finish_reason, FinishReason::Stop | FinishReason::Length));
    }
}
