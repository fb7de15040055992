use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;
use http::HeaderValue;
use relay_core::RequestContext;

/// Middleware that attaches a [`RequestContext`] to every request
///
/// The request id is echoed back in `x-request-id`.
pub async fn request_context_middleware(request: Request, next: Next) -> Response {
    let (parts, body) = request.into_parts();
    let context = RequestContext::from_parts(parts.clone());
    let request_id = context.request_id.clone();

    let mut request = Request::from_parts(parts, body);
    request.extensions_mut().insert(context);

    let mut response = next.run(request).await;
    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert("x-request-id", value);
    }
    response
}
