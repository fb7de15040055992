use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::ToolError;

/// Execution envelope returned for every tool call
///
/// Serialises flat: `{"success": true, ...payload}` or
/// `{"success": false, "error": "..."}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(flatten)]
    pub payload: Map<String, Value>,
}

impl ToolOutcome {
    pub const fn ok(payload: Map<String, Value>) -> Self {
        Self {
            success: true,
            error: None,
            payload,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(message.into()),
            payload: Map::new(),
        }
    }

    /// The envelope as a JSON object, e.g. for a follow-up tool message
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or_else(|_| serde_json::json!({"success": self.success}))
    }
}

impl From<Result<Map<String, Value>, ToolError>> for ToolOutcome {
    fn from(result: Result<Map<String, Value>, ToolError>) -> Self {
        match result {
            Ok(payload) => Self::ok(payload),
            Err(e) => Self::failure(e.to_string()),
        }
    }
}
