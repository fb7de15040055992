use http::StatusCode;

/// Domain error that knows how it should be rendered over HTTP
///
/// Feature crates implement this on their error enums; the handlers turn
/// it into an `OpenAI`-style error body without the domain crates having
/// to know about axum.
pub trait HttpError: std::error::Error {
    /// HTTP status code for this error
    fn status_code(&self) -> StatusCode;

    /// Machine-readable error type (e.g. `invalid_request_error`)
    fn error_type(&self) -> &str;

    /// Message safe to return to the caller
    ///
    /// Must never contain credential material.
    fn client_message(&self) -> String;
}

/// `OpenAI`-style error body for an [`HttpError`]
pub fn error_body(error: &dyn HttpError) -> serde_json::Value {
    serde_json::json!({
        "error": {
            "message": error.client_message(),
            "type": error.error_type(),
            "code": serde_json::Value::Null,
        }
    })
}
