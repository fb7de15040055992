//! `OpenAI`-compatible wire types
//!
//! These are both the public HTTP shapes and the internal representation;
//! the adapters translate them to and from backend-native payloads.

pub mod message;
pub mod request;
pub mod response;
pub mod stream;
pub mod tool;

pub use message::{ChatMessage, Role};
pub use request::{CompletionRequest, GenerationParams, StopSequences, StreamOptions};
pub use response::{Choice, ChoiceMessage, CompletionResponse, FinishReason, Usage};
pub use stream::{ChunkChoice, ChunkDelta, StreamChunk, StreamFolder};
pub use tool::{FunctionCall, FunctionSpec, ToolCall, ToolSpec};

/// Seconds since the Unix epoch
pub(crate) fn unix_now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Fresh `chatcmpl-` response identifier
pub(crate) fn completion_id() -> String {
    let hex = uuid::Uuid::new_v4().simple().to_string();
    format!("chatcmpl-{}", &hex[..29])
}
