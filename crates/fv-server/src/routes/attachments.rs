//! Attachment listing and cache administration under `/api`.

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use fv_attachments::AttachmentHandle;
use fv_core::{ItemId, MediaSourceId};
use serde::Serialize;
use tokio_util::io::ReaderStream;

use crate::context::AppContext;
use crate::error::AppError;
use crate::routes::parse_id;

/// One attachment stream of a media source.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct AttachmentResponse {
    pub index: u32,
    pub file_name: Option<String>,
    pub mime_type: Option<String>,
    pub size: Option<u64>,
}

/// Extraction cache totals.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct CacheStatsResponse {
    pub entries: usize,
    pub bytes: u64,
    pub in_flight: usize,
}

/// Outcome of a cache eviction.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct EvictResponse {
    pub media_source_id: String,
    pub removed: usize,
}

/// GET /api/items/{item_id}/sources/{source_id}/attachments
#[utoipa::path(
    get,
    path = "/api/items/{item_id}/sources/{source_id}/attachments",
    params(
        ("item_id" = String, Path, description = "Media item id"),
        ("source_id" = String, Path, description = "Media source id")
    ),
    responses(
        (status = 200, description = "Attachment streams in the container", body = Vec<AttachmentResponse>),
        (status = 404, description = "Unknown item, source or file")
    )
)]
pub async fn list_attachments(
    State(ctx): State<AppContext>,
    Path((item_id, source_id)): Path<(String, String)>,
) -> Result<Json<Vec<AttachmentResponse>>, AppError> {
    let item_id: ItemId = parse_id(&item_id, "item_id")?;
    let source_id: MediaSourceId = parse_id(&source_id, "source_id")?;

    let streams = ctx.attachments.list_attachments(item_id, source_id).await?;
    Ok(Json(
        streams
            .into_iter()
            .map(|s| AttachmentResponse {
                index: s.index,
                file_name: s.file_name,
                mime_type: s.mime_type,
                size: s.size,
            })
            .collect(),
    ))
}

/// GET /api/attachments/cache
#[utoipa::path(
    get,
    path = "/api/attachments/cache",
    responses(
        (status = 200, description = "Extraction cache totals", body = CacheStatsResponse)
    )
)]
pub async fn cache_stats(
    State(ctx): State<AppContext>,
) -> Result<Json<CacheStatsResponse>, AppError> {
    let stats = ctx.attachments.cache_stats().await?;
    Ok(Json(CacheStatsResponse {
        entries: stats.entries,
        bytes: stats.bytes,
        in_flight: ctx.attachments.coordinator().in_flight(),
    }))
}

/// DELETE /api/attachments/cache/{media_source_id}
#[utoipa::path(
    delete,
    path = "/api/attachments/cache/{media_source_id}",
    params(("media_source_id" = String, Path, description = "Media source id")),
    responses(
        (status = 200, description = "Cached attachments removed", body = EvictResponse),
        (status = 400, description = "Invalid media source id")
    )
)]
pub async fn evict_cache(
    State(ctx): State<AppContext>,
    Path(media_source_id): Path<String>,
) -> Result<Json<EvictResponse>, AppError> {
    let source_id: MediaSourceId = parse_id(&media_source_id, "media_source_id")?;
    let removed = ctx.attachments.evict(source_id).await?;
    Ok(Json(EvictResponse {
        media_source_id: source_id.to_string(),
        removed,
    }))
}

/// Stream an extracted attachment with its content headers.
pub fn attachment_response(handle: AttachmentHandle) -> Response {
    let disposition = format!(
        "attachment; filename=\"{}\"",
        sanitize_file_name(&handle.attachment.download_name())
    );
    let content_type = handle.content_type().to_string();
    let size = handle.size();

    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, content_type),
            (header::CONTENT_LENGTH, size.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
            (header::CACHE_CONTROL, "public, max-age=86400".to_string()),
        ],
        Body::from_stream(ReaderStream::new(handle.file)),
    )
        .into_response()
}

/// Keep a file name safe inside a quoted header parameter.
fn sanitize_file_name(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '"' | '\\' | '/' => '_',
            c if c.is_control() || !c.is_ascii() => '_',
            c => c,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_replaces_unsafe_characters() {
        assert_eq!(sanitize_file_name("subs.vtt"), "subs.vtt");
        assert_eq!(sanitize_file_name("a\"b\\c/d\ne"), "a_b_c_d_e");
        assert_eq!(sanitize_file_name("fönt.ttf"), "f_nt.ttf");
    }
}
