//! `GET /v1/tools` and `POST /v1/tools/execute`

use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::response::{IntoResponse, Response};
use axum::{Json, Router, routing};
use http::StatusCode;
use relay_core::{HttpError, error_body};
use relay_llm::types::ToolSpec;
use relay_policy::TenantPolicy;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::toolbelt::Toolbelt;

/// Router serving the caller-driven tool endpoints
pub fn tools_router(toolbelt: Toolbelt) -> Router {
    Router::new()
        .route("/v1/tools", routing::get(list_tools))
        .route("/v1/tools/execute", routing::post(execute_tool))
        .with_state(toolbelt)
}

#[derive(Serialize)]
struct ToolList {
    object: &'static str,
    data: Vec<ToolSpec>,
}

async fn list_tools(State(toolbelt): State<Toolbelt>, policy: TenantPolicy) -> Json<ToolList> {
    Json(ToolList {
        object: "list",
        data: toolbelt.available_tools(&policy),
    })
}

#[derive(Debug, Deserialize)]
struct ExecuteRequest {
    name: String,
    #[serde(default)]
    arguments: Value,
}

async fn execute_tool(
    State(toolbelt): State<Toolbelt>,
    policy: TenantPolicy,
    payload: Result<Json<ExecuteRequest>, JsonRejection>,
) -> Response {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => return InvalidRequest(rejection.body_text()).into_response(),
    };

    let outcome = toolbelt
        .execute(&request.name, request.arguments, &policy, &CancellationToken::new())
        .await;
    Json(outcome).into_response()
}

#[derive(Debug, thiserror::Error)]
#[error("{0}")]
struct InvalidRequest(String);

impl HttpError for InvalidRequest {
    fn status_code(&self) -> StatusCode {
        StatusCode::BAD_REQUEST
    }

    fn error_type(&self) -> &str {
        "invalid_request_error"
    }

    fn client_message(&self) -> String {
        self.0.clone()
    }
}

impl IntoResponse for InvalidRequest {
    fn into_response(self) -> Response {
        (self.status_code(), Json(error_body(&self))).into_response()
    }
}
