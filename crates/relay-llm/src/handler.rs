//! Axum handlers for the `OpenAI`-compatible endpoints

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json, Router, routing};
use futures_util::StreamExt;
use relay_core::{HttpError, RequestContext, error_body};
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::error::LlmError;
use crate::gateway::{CompletionStream, Gateway, StreamItem};
use crate::types::{CompletionRequest, unix_now};

/// Router serving `/v1/chat/completions` and `/v1/models`
pub fn llm_router(gateway: Gateway) -> Router {
    Router::new()
        .route("/v1/chat/completions", routing::post(chat_completions))
        .route("/v1/models", routing::get(list_models))
        .with_state(gateway)
}

/// Handle `POST /v1/chat/completions`
async fn chat_completions(
    State(gateway): State<Gateway>,
    Extension(context): Extension<RequestContext>,
    payload: Result<Json<CompletionRequest>, JsonRejection>,
) -> Response {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => return error_response(&LlmError::InvalidRequest(rejection.body_text())),
    };

    tracing::debug!(request_id = %context.request_id, model = %request.model, stream = request.stream, "chat completion");

    if request.stream {
        let cancel = CancellationToken::new();
        match gateway.complete_stream(request, cancel.clone()) {
            Ok(stream) => sse_response(stream, cancel).into_response(),
            Err(e) => error_response(&e),
        }
    } else {
        // dropping this future on disconnect also drops the backend call
        match gateway.complete(&request, &CancellationToken::new()).await {
            Ok(response) => Json(response).into_response(),
            Err(e) => error_response(&e),
        }
    }
}

/// Encode a completion stream as SSE `data:` events ending in `[DONE]`
///
/// The token is cancelled when the response body is dropped, which is how
/// a client disconnect reaches the gateway.
fn sse_response(
    stream: CompletionStream,
    cancel: CancellationToken,
) -> Sse<impl futures_util::Stream<Item = Result<Event, axum::Error>>> {
    let guard = cancel.drop_guard();

    let events = stream.map(move |item| {
        let _ = &guard;
        match item {
            StreamItem::Chunk(chunk) => Event::default().json_data(chunk),
            StreamItem::Done => Ok(Event::default().data("[DONE]")),
        }
    });

    Sse::new(events).keep_alive(KeepAlive::default())
}

#[derive(Serialize)]
struct ModelCard<'a> {
    id: &'a str,
    object: &'static str,
    created: u64,
    owned_by: &'static str,
}

/// Handle `GET /v1/models`
async fn list_models(State(gateway): State<Gateway>) -> Response {
    let created = unix_now();

    let data: Vec<ModelCard<'_>> = gateway
        .catalog()
        .aliases()
        .map(|id| ModelCard {
            id,
            object: "model",
            created,
            owned_by: "bedrock",
        })
        .collect();

    Json(serde_json::json!({ "object": "list", "data": data })).into_response()
}

fn error_response(error: &LlmError) -> Response {
    (error.status_code(), Json(error_body(error))).into_response()
}
