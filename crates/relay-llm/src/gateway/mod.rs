//! Completion orchestration
//!
//! The [`Gateway`] resolves an alias, formats the backend payload, calls the
//! backend under a timeout and cancellation token, and turns the result into
//! `OpenAI`-shaped responses or chunk streams. Tool calls found in the output
//! are reported to the caller, never executed here.

mod stream;

pub use stream::{CompletionStream, StreamItem};

use std::sync::Arc;
use std::time::Duration;

use relay_config::LlmConfig;
use tokio_util::sync::CancellationToken;

use crate::backend::{BedrockBackend, ModelBackend};
use crate::catalog::ModelCatalog;
use crate::error::LlmError;
use crate::marker::{self, MarkerScan};
use crate::routing::ToolRouting;
use crate::types::{Choice, CompletionRequest, CompletionResponse, FinishReason, ToolCall};
use crate::usage::resolve_usage;

/// Shared, read-only completion service
#[derive(Clone)]
pub struct Gateway {
    inner: Arc<GatewayInner>,
}

struct GatewayInner {
    catalog: ModelCatalog,
    backend: Arc<dyn ModelBackend>,
    routing: ToolRouting,
    timeout: Duration,
}

/// Tool-check outcome for one complete generation
struct Checked {
    content: String,
    finish_reason: FinishReason,
    tool_calls: Option<Vec<ToolCall>>,
}

impl Gateway {
    pub fn new(catalog: ModelCatalog, backend: Arc<dyn ModelBackend>, routing: ToolRouting, timeout: Duration) -> Self {
        Self {
            inner: Arc::new(GatewayInner {
                catalog,
                backend,
                routing,
                timeout,
            }),
        }
    }

    /// Build a gateway backed by AWS Bedrock
    pub async fn from_config(config: &LlmConfig, routing: ToolRouting) -> Self {
        let backend = BedrockBackend::from_config(&config.bedrock).await;

        Self::new(ModelCatalog::from_config(config), Arc::new(backend), routing, config.timeout)
    }

    pub fn catalog(&self) -> &ModelCatalog {
        &self.inner.catalog
    }

    pub fn routing(&self) -> &ToolRouting {
        &self.inner.routing
    }

    /// Serve a non-streaming completion
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::UnsupportedModel`] for an unknown alias,
    /// [`LlmError::Backend`] or [`LlmError::Timeout`] when the backend call
    /// fails, and [`LlmError::Cancelled`] if `cancel` fires first.
    pub async fn complete(
        &self,
        request: &CompletionRequest,
        cancel: &CancellationToken,
    ) -> Result<CompletionResponse, LlmError> {
        let entry = self.inner.catalog.resolve(&request.model)?;
        let payload = entry
            .adapter
            .format_request(&request.messages, &request.params(), request.tools());

        tracing::info!(alias = entry.alias, model = entry.model_id, tools = request.tools().len(), "invoking backend");
        tracing::debug!(payload = %payload, "backend payload");

        let call = tokio::time::timeout(self.inner.timeout, self.inner.backend.invoke(entry.model_id, &payload));

        let body = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(LlmError::Cancelled),
            result = call => result.map_err(|_| {
                tracing::error!(alias = entry.alias, timeout = ?self.inner.timeout, "backend call timed out");
                LlmError::Timeout(self.inner.timeout)
            })??,
        };

        tracing::debug!(body = %body, "backend response");

        let parsed = entry.adapter.parse_response(&body);
        let usage = resolve_usage(
            (parsed.prompt_tokens, parsed.completion_tokens),
            &request.prompt_text(),
            &parsed.text,
        );

        let checked = if request.has_tools() {
            self.check_tool_call(parsed.text, parsed.finish_reason)
        } else {
            Checked {
                content: parsed.text,
                finish_reason: parsed.finish_reason,
                tool_calls: None,
            }
        };

        let choice = Choice::new(checked.content, checked.finish_reason, checked.tool_calls);
        Ok(CompletionResponse::new(&request.model, choice, usage))
    }

    /// Serve a streaming completion
    ///
    /// The alias is resolved up front so that an unknown model fails before
    /// any chunk is produced; every later failure is reported in-band as a
    /// terminal `error` chunk.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::UnsupportedModel`] for an unknown alias
    pub fn complete_stream(
        &self,
        request: CompletionRequest,
        cancel: CancellationToken,
    ) -> Result<CompletionStream, LlmError> {
        let entry = self.inner.catalog.resolve(&request.model)?;
        Ok(stream::start(self.clone(), &entry, request, cancel))
    }

    fn check_tool_call(&self, text: String, finish_reason: FinishReason) -> Checked {
        let MarkerScan::Found(parsed) = marker::parse_final(&text) else {
            return Checked {
                content: text,
                finish_reason,
                tool_calls: None,
            };
        };

        let name = &parsed.call.function.name;
        let local = self.inner.routing.is_local(name);
        tracing::info!(tool = %name, call_id = %parsed.call.id, local, "model requested a tool call");

        Checked {
            // forwarded calls keep the block so the caller can interpret it
            content: if local { parsed.prefix } else { text },
            finish_reason: FinishReason::ToolCalls,
            tool_calls: Some(vec![parsed.call]),
        }
    }
}
