/// Per-request context attached by the server middleware
///
/// Carries the inbound request parts so that feature crates can derive
/// request-scoped state (such as the tenant policy) without depending on
/// the web framework.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// HTTP request parts (method, URI, headers, extensions)
    pub parts: http::request::Parts,
    /// Identifier used to correlate log lines for one request
    pub request_id: String,
}

impl RequestContext {
    /// Build a context from request parts, reusing an inbound
    /// `x-request-id` when the caller supplied one
    pub fn from_parts(parts: http::request::Parts) -> Self {
        let request_id = parts
            .headers
            .get("x-request-id")
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.trim().is_empty())
            .map_or_else(|| uuid::Uuid::new_v4().simple().to_string(), |v| v.trim().to_owned());

        Self { parts, request_id }
    }

    /// Create a context with no headers, for calls made outside HTTP
    pub fn empty() -> Self {
        let (parts, ()) = http::Request::new(()).into_parts();
        Self::from_parts(parts)
    }

    /// Access request headers
    pub fn headers(&self) -> &http::HeaderMap {
        &self.parts.headers
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_context_has_no_headers() {
        let ctx = RequestContext::empty();
        assert!(ctx.headers().is_empty());
        assert_eq!(ctx.request_id.len(), 32);
    }

    #[test]
    fn inbound_request_id_is_reused() {
        let (parts, ()) = http::Request::builder()
            .header("x-request-id", " abc-123 ")
            .body(())
            .unwrap()
            .into_parts();

        let ctx = RequestContext::from_parts(parts);
        assert_eq!(ctx.request_id, "abc-123");
    }
}
