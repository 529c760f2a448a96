//! Admin route handlers: tool availability and catalogue reload.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::context::AppContext;
use crate::error::AppError;

/// Result of a catalogue reload.
#[derive(Serialize, utoipa::ToSchema)]
pub struct ReloadResponse {
    pub items: usize,
}

/// GET /api/admin/tools
#[utoipa::path(
    get,
    path = "/api/admin/tools",
    responses(
        (status = 200, description = "List external tool availability", body = Vec<fv_av::ToolInfo>)
    )
)]
pub async fn tools(State(ctx): State<AppContext>) -> Json<Vec<fv_av::ToolInfo>> {
    Json(ctx.tools.check_all())
}

/// POST /api/admin/library/reload
#[utoipa::path(
    post,
    path = "/api/admin/library/reload",
    responses(
        (status = 200, description = "Catalogue reloaded", body = ReloadResponse),
        (status = 400, description = "Catalogue file is invalid")
    )
)]
pub async fn reload_library(
    State(ctx): State<AppContext>,
) -> Result<Json<ReloadResponse>, AppError> {
    let library = ctx.library.clone();
    let items = tokio::task::spawn_blocking(move || library.reload())
        .await
        .map_err(|e| fv_core::Error::Internal(format!("catalog reload task failed: {e}")))??;
    Ok(Json(ReloadResponse { items }))
}
