//! Scripted in-process model backend

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use relay_llm::LlmError;
use relay_llm::backend::{BackendEventStream, ModelBackend};
use serde_json::{Value, json};

/// One scripted backend reply
pub enum Reply {
    /// Complete response body for `invoke`
    Body(Value),
    /// Event sequence for `invoke_stream`; `Err` entries fail mid-stream
    Events(Vec<Result<Value, String>>),
    /// Connection-level failure
    Fail(String),
    /// Never answer within any reasonable timeout
    Hang,
}

/// Backend answering from a queue of [`Reply`] values
#[derive(Default)]
pub struct ScriptedBackend {
    replies: Mutex<VecDeque<Reply>>,
    requests: Mutex<Vec<(String, Value)>>,
}

impl ScriptedBackend {
    pub fn new(replies: impl IntoIterator<Item = Reply>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().collect()),
            requests: Mutex::default(),
        }
    }

    /// `(model_id, payload)` of every invocation so far
    pub fn requests(&self) -> Vec<(String, Value)> {
        self.requests.lock().unwrap().clone()
    }

    fn next(&self, model_id: &str, payload: &Value) -> Reply {
        self.requests
            .lock()
            .unwrap()
            .push((model_id.to_owned(), payload.clone()));
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Reply::Fail("no scripted reply left".to_owned()))
    }
}

#[async_trait]
impl ModelBackend for ScriptedBackend {
    async fn invoke(&self, model_id: &str, payload: &Value) -> Result<Value, LlmError> {
        match self.next(model_id, payload) {
            Reply::Body(body) => Ok(body),
            Reply::Events(_) => Err(LlmError::Backend("scripted events for a single-shot call".to_owned())),
            Reply::Fail(message) => Err(LlmError::Backend(message)),
            Reply::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Err(LlmError::Backend("hung".to_owned()))
            }
        }
    }

    async fn invoke_stream(&self, model_id: &str, payload: &Value) -> Result<BackendEventStream, LlmError> {
        match self.next(model_id, payload) {
            Reply::Events(events) => Ok(futures_util::stream::iter(events)
                .map(|event| event.map_err(LlmError::Backend))
                .boxed()),
            Reply::Body(_) => Err(LlmError::Backend("scripted body for a streaming call".to_owned())),
            Reply::Fail(message) => Err(LlmError::Backend(message)),
            Reply::Hang => Ok(futures_util::stream::pending().boxed()),
        }
    }
}

/// Complete Llama response body
pub fn llama_body(generation: &str, stop_reason: &str) -> Value {
    json!({
        "generation": generation,
        "prompt_token_count": 12,
        "generation_token_count": 7,
        "stop_reason": stop_reason,
    })
}

/// Llama stream events for `fragments`, closed by a stop event
pub fn llama_events(fragments: &[&str]) -> Vec<Result<Value, String>> {
    let mut events: Vec<Result<Value, String>> = fragments
        .iter()
        .map(|f| Ok(json!({"generation": f, "stop_reason": null})))
        .collect();
    events.push(Ok(json!({"generation": "", "stop_reason": "stop"})));
    events
}
