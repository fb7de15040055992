use axum::Json;
use axum::extract::FromRequestParts;
use axum::response::{IntoResponse, Response};
use http::request::Parts;
use relay_core::{HttpError, error_body};

use crate::error::PolicyValidationError;
use crate::policy::TenantPolicy;

impl<S> FromRequestParts<S> for TenantPolicy
where
    S: Send + Sync,
{
    type Rejection = PolicyValidationError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Self::from_headers(&parts.headers).inspect_err(|e| {
            tracing::warn!(error = %e, "rejecting request with invalid policy headers");
        })
    }
}

impl IntoResponse for PolicyValidationError {
    fn into_response(self) -> Response {
        (self.status_code(), Json(error_body(&self))).into_response()
    }
}
