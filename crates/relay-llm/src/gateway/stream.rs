use std::collections::VecDeque;
use std::pin::Pin;

use futures_util::{Stream, StreamExt};
use serde_json::Value;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::Gateway;
use crate::adapter::ModelAdapter;
use crate::backend::BackendEventStream;
use crate::catalog::ModelEntry;
use crate::error::LlmError;
use crate::marker::{self, Held, MarkerScan, MarkerScanner};
use crate::types::{CompletionRequest, FinishReason, StreamChunk, Usage, unix_now};
use crate::usage::resolve_usage;

/// One item of a completion stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamItem {
    Chunk(StreamChunk),
    /// Sentinel that follows the terminal chunk
    Done,
}

pub type CompletionStream = Pin<Box<dyn Stream<Item = StreamItem> + Send>>;

enum Phase {
    Start,
    Open,
    Streaming(BackendEventStream),
    /// Generation finished; waiting for trailing usage metadata
    Draining(BackendEventStream),
    Finished,
}

struct ChunkStream {
    gateway: Gateway,
    adapter: &'static dyn ModelAdapter,
    alias: String,
    model_id: String,
    payload: Value,
    prompt_text: String,
    id: String,
    created: u64,
    model: String,
    deadline: Instant,
    cancel: CancellationToken,
    phase: Phase,
    outbox: VecDeque<StreamItem>,
    /// Present when tools were declared
    scanner: Option<MarkerScanner>,
    generated: String,
    finish: Option<FinishReason>,
    usage: Option<(u32, u32)>,
    include_usage: bool,
}

pub(super) fn start(
    gateway: Gateway,
    entry: &ModelEntry<'_>,
    request: CompletionRequest,
    cancel: CancellationToken,
) -> CompletionStream {
    let payload = entry
        .adapter
        .format_request(&request.messages, &request.params(), request.tools());

    tracing::info!(alias = entry.alias, model = entry.model_id, tools = request.tools().len(), "opening backend stream");
    tracing::debug!(payload = %payload, "backend payload");

    let deadline = Instant::now() + gateway.inner.timeout;
    let include_usage = request.include_usage();

    let state = ChunkStream {
        adapter: entry.adapter,
        alias: entry.alias.to_owned(),
        model_id: entry.model_id.to_owned(),
        payload,
        prompt_text: request.prompt_text(),
        id: crate::types::completion_id(),
        created: unix_now(),
        scanner: request.has_tools().then(MarkerScanner::default),
        model: request.model,
        deadline,
        cancel,
        phase: Phase::Start,
        outbox: VecDeque::new(),
        generated: String::new(),
        finish: None,
        usage: None,
        include_usage,
        gateway,
    };

    Box::pin(futures_util::stream::unfold(state, |mut state| async move {
        let item = state.next_item().await?;
        Some((item, state))
    }))
}

impl ChunkStream {
    async fn next_item(&mut self) -> Option<StreamItem> {
        loop {
            if self.cancel.is_cancelled() {
                tracing::debug!(alias = %self.alias, "client went away, abandoning stream");
                self.outbox.clear();
                self.phase = Phase::Finished;
                return None;
            }

            if let Some(item) = self.outbox.pop_front() {
                return Some(item);
            }

            match std::mem::replace(&mut self.phase, Phase::Finished) {
                Phase::Start => {
                    self.push(StreamChunk::role(&self.id, self.created, &self.model));
                    self.phase = Phase::Open;
                }
                Phase::Open => {
                    let backend = self.gateway.inner.backend.clone();
                    let call = tokio::time::timeout_at(self.deadline, backend.invoke_stream(&self.model_id, &self.payload));

                    let opened = tokio::select! {
                        biased;
                        () = self.cancel.cancelled() => return None,
                        opened = call => opened,
                    };

                    match opened {
                        Ok(Ok(events)) => self.phase = Phase::Streaming(events),
                        Ok(Err(e)) => self.fail(&e),
                        Err(_) => self.fail(&LlmError::Timeout(self.gateway.inner.timeout)),
                    }
                }
                Phase::Streaming(mut events) => {
                    let next = tokio::select! {
                        biased;
                        () = self.cancel.cancelled() => return None,
                        next = tokio::time::timeout_at(self.deadline, events.next()) => next,
                    };

                    match next {
                        Err(_) => self.fail(&LlmError::Timeout(self.gateway.inner.timeout)),
                        Ok(None) => self.finalize(),
                        Ok(Some(Err(e))) => self.fail(&e),
                        Ok(Some(Ok(event))) => {
                            if !self.on_event(&event) {
                                self.phase = Phase::Streaming(events);
                            } else if self.usage.is_some() {
                                self.finalize();
                            } else {
                                self.phase = Phase::Draining(events);
                            }
                        }
                    }
                }
                Phase::Draining(mut events) => {
                    let next = tokio::select! {
                        biased;
                        () = self.cancel.cancelled() => return None,
                        next = tokio::time::timeout_at(self.deadline, events.next()) => next,
                    };

                    match next {
                        Ok(Some(Ok(event))) => {
                            if let Some(usage) = self.adapter.parse_stream_event(&event).usage {
                                self.usage = Some(usage);
                                self.finalize();
                            } else {
                                self.phase = Phase::Draining(events);
                            }
                        }
                        Ok(Some(Err(e))) => {
                            tracing::debug!(alias = %self.alias, error = %e, "ignoring failure after finish");
                            self.finalize();
                        }
                        Ok(None) | Err(_) => self.finalize(),
                    }
                }
                Phase::Finished => return None,
            }
        }
    }

    /// Apply one backend event, returning true when it ends the generation
    fn on_event(&mut self, event: &Value) -> bool {
        let fragment = self.adapter.parse_stream_event(event);

        if let Some(usage) = fragment.usage {
            self.usage = Some(usage);
        }

        if let Some(text) = fragment.text {
            self.generated.push_str(&text);

            let released = match &mut self.scanner {
                Some(scanner) => scanner.push(&text),
                None => Some(text),
            };
            if let Some(text) = released {
                self.push(StreamChunk::content(&self.id, self.created, &self.model, text));
            }
        }

        if let Some(reason) = fragment.finish {
            self.finish = Some(reason);
            return true;
        }

        false
    }

    /// Flush held text, report any tool call, and terminate normally
    fn finalize(&mut self) {
        let mut finish = self.finish.unwrap_or(FinishReason::Stop);

        if let Some(scanner) = self.scanner.take() {
            match scanner.finish() {
                Held::Text(text) if !text.is_empty() => {
                    self.push(StreamChunk::content(&self.id, self.created, &self.model, text));
                }
                Held::Text(_) => {}
                Held::Block { lead, block } => match marker::parse_final(&block) {
                    MarkerScan::Found(parsed) => {
                        let local = self.gateway.inner.routing.is_local(&parsed.call.function.name);
                        tracing::info!(
                            tool = %parsed.call.function.name,
                            call_id = %parsed.call.id,
                            local,
                            "model requested a tool call"
                        );

                        let visible = if local { lead.trim_end().to_owned() } else { lead + &block };
                        if !visible.is_empty() {
                            self.push(StreamChunk::content(&self.id, self.created, &self.model, visible));
                        }
                        self.push(StreamChunk::tool_calls(&self.id, self.created, &self.model, vec![parsed.call]));
                        finish = FinishReason::ToolCalls;
                    }
                    MarkerScan::NotFound | MarkerScan::Incomplete => {
                        self.push(StreamChunk::content(&self.id, self.created, &self.model, lead + &block));
                    }
                },
            }
        }

        let usage = resolve_usage(self.usage.unwrap_or_default(), &self.prompt_text, &self.generated);
        tracing::info!(
            alias = %self.alias,
            finish_reason = ?finish,
            prompt_tokens = usage.prompt_tokens,
            completion_tokens = usage.completion_tokens,
            "stream completed"
        );

        self.terminate(finish, self.include_usage.then_some(usage));
    }

    fn fail(&mut self, error: &LlmError) {
        tracing::error!(alias = %self.alias, error = %error, "stream failed");
        self.terminate(FinishReason::Error, None);
    }

    fn terminate(&mut self, reason: FinishReason, usage: Option<Usage>) {
        self.push(StreamChunk::finish(&self.id, self.created, &self.model, reason));
        if let Some(usage) = usage {
            self.push(StreamChunk::usage(&self.id, self.created, &self.model, usage));
        }
        self.outbox.push_back(StreamItem::Done);
        self.phase = Phase::Finished;
    }

    fn push(&mut self, chunk: StreamChunk) {
        self.outbox.push_back(StreamItem::Chunk(chunk));
    }
}
