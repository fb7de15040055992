use std::fmt::Write;

use indoc::formatdoc;

use crate::marker::{TOOL_END, TOOL_START};
use crate::types::ToolSpec;

/// System instruction describing the declared tools and the marker syntax
pub fn tool_instruction(tools: &[ToolSpec]) -> String {
    let listing = tools.iter().map(describe_tool).collect::<Vec<_>>().join("\n");

    formatdoc! {r#"
        You are a helpful assistant with access to tools. When you need to use a tool, format your response as:

        {TOOL_START}
        {{
          "name": "tool_name",
          "arguments": {{
            "param1": "value1",
            "param2": "value2"
          }}
        }}
        {TOOL_END}

        Available tools:
        {listing}

        Important: After {TOOL_START}, provide ONLY the JSON tool call, then {TOOL_END}. The client will execute the tool and provide results in a TOOL_USED_START...TOOL_USED_END block. You can then continue your response normally."#
    }
}

fn describe_tool(tool: &ToolSpec) -> String {
    let function = &tool.function;
    let mut line = match function.description.as_deref().filter(|d| !d.is_empty()) {
        Some(description) => format!("- {}: {description}", function.name),
        None => format!("- {}", function.name),
    };

    let properties = function
        .parameters
        .as_ref()
        .and_then(|p| p.get("properties"))
        .and_then(serde_json::Value::as_object)
        .filter(|props| !props.is_empty());

    if let Some(properties) = properties {
        let params = properties
            .iter()
            .map(|(name, schema)| {
                let kind = schema.get("type").and_then(serde_json::Value::as_str).unwrap_or("any");
                format!("{name} ({kind})")
            })
            .collect::<Vec<_>>()
            .join(", ");
        let _ = write!(line, "\n  Parameters: {params}");
    }

    line
}
