//! Jellyfin-compatible endpoints: video attachments and notifications.

pub mod attachments;
pub mod notifications;

use axum::extract::Request;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::Router;

use crate::context::AppContext;

async fn unmatched(req: Request) -> impl IntoResponse {
    tracing::warn!(method = %req.method(), uri = %req.uri(), "No Jellyfin route");
    (
        StatusCode::NOT_FOUND,
        axum::Json(serde_json::json!({ "error": "Not Found", "path": req.uri().path() })),
    )
}

/// Routes mounted at the root, under the paths Jellyfin clients call.
pub fn jellyfin_router() -> Router<AppContext> {
    use notifications as n;

    Router::new()
        .route(
            "/Videos/{item_id}/{media_source_id}/Attachments/{index}",
            get(attachments::get_attachment),
        )
        .route("/Notifications/Types", get(n::get_types))
        .route("/Notifications/Services", get(n::get_services))
        .route("/Notifications/Admin", post(n::create_admin_notification))
        .route("/Notifications/{user_id}", get(n::get_notifications))
        .route("/Notifications/{user_id}/Summary", get(n::get_summary))
        .route("/Notifications/{user_id}/Read", post(n::set_read))
        .route("/Notifications/{user_id}/Unread", post(n::set_unread))
        .fallback(unmatched)
}
