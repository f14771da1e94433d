//! Per-request context: correlation id and error redaction policy.
//!
//! The middleware stores the context in a task-local for the lifetime of the
//! request, so error responses built anywhere below it can carry the same
//! `requestId` that is sent back in the `x-request-id` header.

use std::time::Instant;

use axum::{
    extract::{Request, State},
    http::{HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use super::server::ServerConfig;

/// Header carrying the correlation id, in both directions.
pub const REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

const MAX_REQUEST_ID_LEN: usize = 128;

#[derive(Debug, Clone)]
pub struct RequestContext {
    pub request_id: String,
    /// Hide internal error details from callers
    pub redact_internal: bool,
}

tokio::task_local! {
    static REQUEST_CONTEXT: RequestContext;
}

/// Context of the request being handled, if any.
pub fn current() -> Option<RequestContext> {
    REQUEST_CONTEXT.try_with(Clone::clone).ok()
}

fn incoming_request_id(req: &Request) -> Option<String> {
    let value = req.headers().get(&REQUEST_ID_HEADER)?.to_str().ok()?.trim();
    if value.is_empty() || value.len() > MAX_REQUEST_ID_LEN {
        return None;
    }
    Some(value.to_string())
}

/// Assigns a request id, scopes the context and logs the completed request.
pub async fn request_context(
    State(config): State<ServerConfig>,
    req: Request,
    next: Next,
) -> Response {
    let request_id = incoming_request_id(&req).unwrap_or_else(|| Uuid::new_v4().to_string());
    let method = req.method().clone();
    let uri = req.uri().clone();
    let start = Instant::now();

    let context = RequestContext {
        request_id: request_id.clone(),
        redact_internal: config.environment.is_production(),
    };
    let mut response = REQUEST_CONTEXT.scope(context, next.run(req)).await;

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }

    tracing::info!(
        request_id = %request_id,
        method = %method,
        uri = %uri,
        status = response.status().as_u16(),
        latency_ms = start.elapsed().as_millis() as u64,
        "request completed"
    );

    response
}
