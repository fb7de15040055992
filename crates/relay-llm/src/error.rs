use http::StatusCode;
use relay_core::HttpError;
use thiserror::Error;

/// Errors raised while serving a completion
#[derive(Debug, Error)]
pub enum LlmError {
    /// Requested alias is not in the model table
    #[error("Model '{model}' not supported. Available models: {}", available.join(", "))]
    UnsupportedModel { model: String, available: Vec<String> },

    /// Client sent a malformed or invalid request
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Backend call failed or returned an unusable body
    #[error("backend error: {0}")]
    Backend(String),

    /// Backend call exceeded the configured timeout
    #[error("backend call timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// Caller went away before the completion finished
    #[error("request cancelled")]
    Cancelled,

    /// Unexpected internal error
    #[error("internal error: {0}")]
    Internal(String),
}

impl HttpError for LlmError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::UnsupportedModel { .. } | Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::Backend(_) => StatusCode::BAD_GATEWAY,
            Self::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            // nginx's "client closed request"
            Self::Cancelled => StatusCode::from_u16(499).unwrap_or(StatusCode::SERVICE_UNAVAILABLE),
        }
    }

    fn error_type(&self) -> &str {
        match self {
            Self::UnsupportedModel { .. } | Self::InvalidRequest(_) => "invalid_request_error",
            Self::Backend(_) => "backend_error",
            Self::Timeout(_) => "timeout_error",
            Self::Internal(_) => "internal_error",
            Self::Cancelled => "request_cancelled",
        }
    }

    fn client_message(&self) -> String {
        match self {
            Self::Internal(_) => "an internal error occurred".to_owned(),
            other => other.to_string(),
        }
    }
}
