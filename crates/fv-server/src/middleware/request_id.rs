//! Per-request correlation id.
//!
//! Takes `x-request-id` from the client or mints a UUID, scopes the handler
//! in a tracing span and a task-local carrying it, and sets it on the
//! response.

use axum::body::Body;
use axum::http::{HeaderName, HeaderValue, Request};
use axum::middleware::Next;
use axum::response::Response;
use tracing::Instrument;
use uuid::Uuid;

pub static X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

tokio::task_local! {
    static CURRENT: String;
}

/// Id of the request being handled on this task, if any.
pub fn current() -> Option<String> {
    CURRENT.try_with(Clone::clone).ok()
}

pub async fn request_id_middleware(request: Request<Body>, next: Next) -> Response {
    let id = match request.headers().get(&X_REQUEST_ID).map(HeaderValue::to_str) {
        Some(Ok(v)) if !v.is_empty() => v.to_owned(),
        _ => Uuid::new_v4().to_string(),
    };

    let span = tracing::info_span!("request", request_id = %id);
    let mut response = CURRENT
        .scope(id.clone(), next.run(request))
        .instrument(span)
        .await;

    if let Ok(value) = HeaderValue::from_str(&id) {
        response.headers_mut().insert(X_REQUEST_ID.clone(), value);
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn current_is_scoped() {
        assert_eq!(current(), None);
        let seen = CURRENT.scope("req-1".to_string(), async { current() }).await;
        assert_eq!(seen.as_deref(), Some("req-1"));
    }
}
