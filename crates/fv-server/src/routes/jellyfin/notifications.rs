//! Jellyfin notification endpoints.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use fv_core::config::NotificationLevel;
use fv_core::{NotificationId, UserId};
use serde::Deserialize;

use crate::context::AppContext;
use crate::error::AppError;
use crate::notifications::{
    NameIdPair, NotificationQuery, NotificationRequest, NotificationResult, NotificationTypeInfo,
    NotificationsSummary,
};
use crate::routes::parse_id;

/// Query parameters for `GET /Notifications/{user_id}`.
#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    #[serde(alias = "IsRead")]
    pub is_read: Option<bool>,
    #[serde(alias = "StartIndex")]
    pub start_index: Option<usize>,
    #[serde(alias = "Limit")]
    pub limit: Option<usize>,
}

/// Query parameters for the read/unread endpoints.
#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct IdsParams {
    /// Comma-separated notification ids; empty means all.
    #[serde(alias = "Ids")]
    pub ids: Option<String>,
}

/// Body of `POST /Notifications/Admin`.
#[derive(Debug, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "PascalCase")]
pub struct AdminNotificationDto {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub notification_level: Option<NotificationLevel>,
    #[serde(default)]
    pub url: Option<String>,
}

/// GET /Notifications/{user_id}
#[utoipa::path(
    get,
    path = "/Notifications/{user_id}",
    params(("user_id" = String, Path, description = "User id"), ListParams),
    responses((status = 200, description = "User notifications, newest first", body = NotificationResult))
)]
pub async fn get_notifications(
    State(ctx): State<AppContext>,
    Path(user_id): Path<String>,
    Query(params): Query<ListParams>,
) -> Result<Json<NotificationResult>, AppError> {
    let user_id: UserId = parse_id(&user_id, "user_id")?;
    let query = NotificationQuery {
        is_read: params.is_read,
        start_index: params.start_index.unwrap_or(0),
        limit: params.limit,
    };
    Ok(Json(ctx.notifications.list(user_id, query)))
}

/// GET /Notifications/{user_id}/Summary
#[utoipa::path(
    get,
    path = "/Notifications/{user_id}/Summary",
    params(("user_id" = String, Path, description = "User id")),
    responses((status = 200, description = "Unread totals", body = NotificationsSummary))
)]
pub async fn get_summary(
    State(ctx): State<AppContext>,
    Path(user_id): Path<String>,
) -> Result<Json<NotificationsSummary>, AppError> {
    let user_id: UserId = parse_id(&user_id, "user_id")?;
    Ok(Json(ctx.notifications.summary(user_id)))
}

/// GET /Notifications/Types
#[utoipa::path(
    get,
    path = "/Notifications/Types",
    responses((status = 200, description = "Notification types", body = Vec<NotificationTypeInfo>))
)]
pub async fn get_types(State(ctx): State<AppContext>) -> Json<Vec<NotificationTypeInfo>> {
    Json(ctx.notifications.types())
}

/// GET /Notifications/Services
#[utoipa::path(
    get,
    path = "/Notifications/Services",
    responses((status = 200, description = "Delivery services", body = Vec<NameIdPair>))
)]
pub async fn get_services(State(ctx): State<AppContext>) -> Json<Vec<NameIdPair>> {
    Json(ctx.notifications.services())
}

/// POST /Notifications/Admin
#[utoipa::path(
    post,
    path = "/Notifications/Admin",
    request_body = AdminNotificationDto,
    responses((status = 204, description = "Notification sent to admin users"))
)]
pub async fn create_admin_notification(
    State(ctx): State<AppContext>,
    Json(body): Json<AdminNotificationDto>,
) -> Result<StatusCode, AppError> {
    if body.name.trim().is_empty() {
        return Err(fv_core::Error::Validation("Notification name is required".into()).into());
    }

    ctx.notifications.send_to_admins(NotificationRequest {
        name: body.name,
        description: body.description,
        url: body.url,
        level: body.notification_level.unwrap_or_default(),
        user_ids: Vec::new(),
        date: None,
    });
    Ok(StatusCode::NO_CONTENT)
}

/// POST /Notifications/{user_id}/Read
#[utoipa::path(
    post,
    path = "/Notifications/{user_id}/Read",
    params(("user_id" = String, Path, description = "User id"), IdsParams),
    responses((status = 204, description = "Notifications marked read"))
)]
pub async fn set_read(
    State(ctx): State<AppContext>,
    Path(user_id): Path<String>,
    Query(params): Query<IdsParams>,
) -> Result<StatusCode, AppError> {
    mark(&ctx, &user_id, params, true)
}

/// POST /Notifications/{user_id}/Unread
#[utoipa::path(
    post,
    path = "/Notifications/{user_id}/Unread",
    params(("user_id" = String, Path, description = "User id"), IdsParams),
    responses((status = 204, description = "Notifications marked unread"))
)]
pub async fn set_unread(
    State(ctx): State<AppContext>,
    Path(user_id): Path<String>,
    Query(params): Query<IdsParams>,
) -> Result<StatusCode, AppError> {
    mark(&ctx, &user_id, params, false)
}

fn mark(ctx: &AppContext, user_id: &str, params: IdsParams, is_read: bool) -> Result<StatusCode, AppError> {
    let user_id: UserId = parse_id(user_id, "user_id")?;
    let ids = parse_ids(params.ids.as_deref().unwrap_or(""))?;
    let changed = ctx.notifications.mark(user_id, &ids, is_read);
    tracing::debug!(%user_id, changed, is_read, "Notification read state updated");
    Ok(StatusCode::NO_CONTENT)
}

fn parse_ids(raw: &str) -> fv_core::Result<Vec<NotificationId>> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| parse_id(s, "notification id"))
        .collect()
}
