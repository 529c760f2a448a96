//! `GET /Videos/{item_id}/{media_source_id}/Attachments/{index}`.

use axum::extract::{Path, State};
use axum::response::Response;
use fv_core::{Error, ItemId, MediaSourceId};

use crate::context::AppContext;
use crate::error::AppError;
use crate::routes::attachments::attachment_response;
use crate::routes::parse_id;

/// Stream attachment `index` of a media source, extracting it on first use.
#[utoipa::path(
    get,
    path = "/Videos/{item_id}/{media_source_id}/Attachments/{index}",
    params(
        ("item_id" = String, Path, description = "Media item id"),
        ("media_source_id" = String, Path, description = "Media source id"),
        ("index" = u32, Path, description = "Attachment stream index")
    ),
    responses(
        (status = 200, description = "Attachment bytes", content_type = "application/octet-stream"),
        (status = 400, description = "Malformed id or index"),
        (status = 404, description = "Unknown item, source or attachment"),
        (status = 500, description = "Attachment cache failure")
    )
)]
pub async fn get_attachment(
    State(ctx): State<AppContext>,
    Path((item_id, media_source_id, index)): Path<(String, String, String)>,
) -> Result<Response, AppError> {
    let item_id: ItemId = parse_id(&item_id, "item_id")?;
    let media_source_id: MediaSourceId = parse_id(&media_source_id, "media_source_id")?;
    let index = parse_index(&index, media_source_id)?;

    let handle = ctx
        .attachments
        .get_attachment(item_id, media_source_id, index)
        .await?;

    tracing::debug!(
        %media_source_id,
        index,
        content_type = handle.content_type(),
        size = handle.size(),
        "Serving attachment"
    );

    Ok(attachment_response(handle))
}

/// Any run of digits is a well-formed ordinal. One past what a container can
/// hold is simply an attachment that does not exist.
fn parse_index(raw: &str, source: MediaSourceId) -> Result<u32, Error> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Error::Validation(format!("invalid attachment index: {raw}")));
    }
    raw.parse()
        .map_err(|_| Error::not_found("attachment", format!("{source}/{raw}")))
}
