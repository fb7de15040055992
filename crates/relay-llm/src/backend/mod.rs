//! Model invocation boundary

mod bedrock;

pub use bedrock::BedrockBackend;

use std::pin::Pin;

use async_trait::async_trait;
use futures_util::Stream;
use serde_json::Value;

use crate::error::LlmError;

/// Backend-native events of one streaming invocation
pub type BackendEventStream = Pin<Box<dyn Stream<Item = Result<Value, LlmError>> + Send>>;

/// Transport to the hosted models
///
/// Payloads are opaque JSON built by a [`ModelAdapter`]. Dropping a
/// returned future or stream cancels the underlying call.
///
/// [`ModelAdapter`]: crate::adapter::ModelAdapter
#[async_trait]
pub trait ModelBackend: Send + Sync {
    /// Single-shot invocation returning the complete response body
    async fn invoke(&self, model_id: &str, payload: &Value) -> Result<Value, LlmError>;

    /// Streaming invocation returning decoded events in arrival order
    async fn invoke_stream(&self, model_id: &str, payload: &Value) -> Result<BackendEventStream, LlmError>;
}
