//! JSON error responses for [`fv_core::Error`].

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::middleware::request_id;

/// Handler error type; lets routes use `?` on core results.
#[derive(Debug)]
pub struct AppError(pub fv_core::Error);

impl From<fv_core::Error> for AppError {
    fn from(e: fv_core::Error) -> Self {
        Self(e)
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    code: &'static str,
    request_id: Option<String>,
}

fn error_code(err: &fv_core::Error) -> &'static str {
    use fv_core::Error::*;
    match err {
        NotFound { .. } => "not_found",
        Validation(_) => "validation_error",
        Io(_) => "io_error",
        Tool { .. } => "tool_error",
        Probe(_) => "probe_error",
        Storage { .. } => "storage_error",
        Internal(_) => "internal_error",
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.0.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let request_id = request_id::current();

        if status.is_server_error() {
            tracing::error!(%status, error = %self.0, "Request failed");
        }

        let body = ErrorBody {
            error: self.0.to_string(),
            code: error_code(&self.0),
            request_id,
        };
        (status, axum::Json(body)).into_response()
    }
}
