//! Axum router construction.
//!
//! Builds the full application router with all route groups and middleware
//! layers.

use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::context::AppContext;
use crate::middleware::request_id::request_id_middleware;
use crate::routes;

#[derive(OpenApi)]
#[openapi(
    paths(
        routes::health::health_check,
        routes::admin::tools,
        routes::admin::reload_library,
        routes::attachments::list_attachments,
        routes::attachments::cache_stats,
        routes::attachments::evict_cache,
        routes::jellyfin::attachments::get_attachment,
        routes::jellyfin::notifications::get_notifications,
        routes::jellyfin::notifications::get_summary,
        routes::jellyfin::notifications::get_types,
        routes::jellyfin::notifications::get_services,
        routes::jellyfin::notifications::create_admin_notification,
        routes::jellyfin::notifications::set_read,
        routes::jellyfin::notifications::set_unread,
    ),
    components(schemas(
        routes::health::HealthResponse,
        routes::admin::ReloadResponse,
        routes::attachments::AttachmentResponse,
        routes::attachments::CacheStatsResponse,
        routes::attachments::EvictResponse,
        routes::jellyfin::notifications::AdminNotificationDto,
        crate::notifications::Notification,
        crate::notifications::NotificationResult,
        crate::notifications::NotificationsSummary,
        crate::notifications::NotificationTypeInfo,
        crate::notifications::NameIdPair,
        fv_av::ToolInfo,
    ))
)]
pub struct ApiDoc;

/// Build the complete Axum router.
pub fn build_router(ctx: AppContext) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api = Router::new()
        .route(
            "/items/{item_id}/sources/{source_id}/attachments",
            get(routes::attachments::list_attachments),
        )
        .route("/attachments/cache", get(routes::attachments::cache_stats))
        .route(
            "/attachments/cache/{media_source_id}",
            axum::routing::delete(routes::attachments::evict_cache),
        )
        .route("/admin/tools", get(routes::admin::tools))
        .route("/admin/library/reload", post(routes::admin::reload_library));

    Router::new()
        .route("/health", get(routes::health::health_check))
        .nest("/api", api)
        .merge(SwaggerUi::new("/api-docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(routes::jellyfin::jellyfin_router())
        .layer(middleware::from_fn(request_id_middleware))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(ctx)
}
