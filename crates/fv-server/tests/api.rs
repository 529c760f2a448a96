//! HTTP-level tests for the attachment and notification endpoints, driven
//! through `build_router` with `oneshot`.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use fv_attachments::{
    AttachmentService, Catalog, CatalogItem, CatalogLibrary, CatalogSource, ExtractionCache,
    ExtractionCoordinator,
};
use fv_av::ToolRegistry;
use fv_core::config::{Config, NotificationsConfig};
use fv_core::{ItemId, MediaSourceId, UserId};
use fv_probe::{AttachmentProber, AttachmentStream, ProbeError, ProbedAttachment};
use fv_server::context::AppContext;
use fv_server::notifications::NotificationManager;
use fv_server::router::build_router;
use http_body_util::BodyExt;
use tower::ServiceExt;

const VTT: &[u8] = b"WEBVTT\n\n00:00.000 --> 00:02.000\nSubtitle line\n";

/// Container with one WebVTT attachment at index 0 and a nameless font at 1.
struct StubProber {
    calls: AtomicUsize,
}

#[async_trait]
impl AttachmentProber for StubProber {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn supports(&self, _path: &Path) -> bool {
        true
    }

    async fn list(&self, _path: &Path) -> Result<Vec<AttachmentStream>, ProbeError> {
        Ok(vec![
            AttachmentStream {
                index: 0,
                file_name: Some("english.vtt".into()),
                mime_type: Some("text/vtt".into()),
                size: Some(VTT.len() as u64),
            },
            AttachmentStream {
                index: 1,
                file_name: None,
                mime_type: None,
                size: None,
            },
        ])
    }

    async fn extract(&self, path: &Path, index: u32, dest: &Path) -> Result<ProbedAttachment, ProbeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let (bytes, probed) = match index {
            0 => (
                VTT,
                ProbedAttachment::new(Some("text/vtt".into()), Some("english.vtt".into())),
            ),
            1 => (&b"\x00\x01\x00\x00font"[..], ProbedAttachment::default()),
            _ => {
                return Err(ProbeError::IndexNotFound {
                    path: path.to_path_buf(),
                    index,
                })
            }
        };
        std::fs::write(dest, bytes).map_err(|e| ProbeError::failed("stub", e.to_string()))?;
        Ok(probed)
    }
}

struct TestApp {
    _dir: tempfile::TempDir,
    ctx: AppContext,
    prober: Arc<StubProber>,
    item: ItemId,
    source: MediaSourceId,
}

fn test_app() -> TestApp {
    let dir = tempfile::tempdir().unwrap();
    let media: PathBuf = dir.path().join("movie.mkv");
    std::fs::write(&media, b"container").unwrap();

    let item = ItemId::new();
    let source = MediaSourceId::new();
    let library = Arc::new(CatalogLibrary::from_catalog(Catalog {
        items: vec![CatalogItem {
            id: item,
            name: Some("Movie".into()),
            sources: vec![CatalogSource {
                id: source,
                path: media,
            }],
        }],
    }));

    let prober = Arc::new(StubProber {
        calls: AtomicUsize::new(0),
    });
    let cache = ExtractionCache::open(dir.path().join("cache")).unwrap();
    let attachments = AttachmentService::new(
        library.clone(),
        prober.clone(),
        ExtractionCoordinator::new(Arc::new(cache)),
    );

    let admin = UserId::new();
    let notifications = Arc::new(NotificationManager::new(&NotificationsConfig {
        admin_users: vec![admin],
        ..Default::default()
    }));

    let ctx = AppContext {
        config: Arc::new(Config::default()),
        library,
        attachments,
        notifications,
        tools: Arc::new(ToolRegistry::default()),
    };

    TestApp {
        _dir: dir,
        ctx,
        prober,
        item,
        source,
    }
}

async fn send(ctx: &AppContext, request: Request<Body>) -> (StatusCode, axum::http::HeaderMap, Vec<u8>) {
    let response = build_router(ctx.clone()).oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = response.into_body().collect().await.unwrap().to_bytes().to_vec();
    (status, headers, body)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post(uri: &str, json: Option<serde_json::Value>) -> Request<Body> {
    let builder = Request::builder().method("POST").uri(uri);
    match json {
        Some(v) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(v.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

#[tokio::test]
async fn health_endpoint() {
    let app = test_app();
    let (status, headers, body) = send(&app.ctx, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(headers.contains_key("x-request-id"));
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn request_id_is_echoed() {
    let app = test_app();
    let request = Request::builder()
        .uri("/health")
        .header("x-request-id", "abc-123")
        .body(Body::empty())
        .unwrap();
    let (_, headers, _) = send(&app.ctx, request).await;
    assert_eq!(headers["x-request-id"], "abc-123");
}

#[tokio::test]
async fn error_body_carries_request_id() {
    let app = test_app();
    let request = Request::builder()
        .uri(format!("/Videos/{}/{}/Attachments/99", app.item, app.source))
        .header("x-request-id", "req-404")
        .body(Body::empty())
        .unwrap();
    let (status, _, body) = send(&app.ctx, request).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["request_id"], "req-404");
}

#[tokio::test]
async fn serves_subtitle_attachment() {
    let app = test_app();
    let uri = format!("/Videos/{}/{}/Attachments/0", app.item, app.source.simple());

    let (status, headers, body) = send(&app.ctx, get(&uri)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::CONTENT_TYPE], "text/vtt");
    assert_eq!(headers[header::CONTENT_LENGTH], VTT.len().to_string().as_str());
    assert_eq!(
        headers[header::CONTENT_DISPOSITION],
        "attachment; filename=\"english.vtt\""
    );
    assert_eq!(body, VTT);

    // Second request is served from the cache.
    let (status, _, body) = send(&app.ctx, get(&uri)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, VTT);
    assert_eq!(app.prober.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn attachment_without_metadata_uses_fallbacks() {
    let app = test_app();
    let uri = format!("/Videos/{}/{}/Attachments/1", app.item, app.source);

    let (status, headers, _) = send(&app.ctx, get(&uri)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::CONTENT_TYPE], "application/octet-stream");
    assert_eq!(
        headers[header::CONTENT_DISPOSITION],
        "attachment; filename=\"attachment-1\""
    );
}

#[tokio::test]
async fn missing_attachment_index_is_404() {
    let app = test_app();
    let uri = format!("/Videos/{}/{}/Attachments/99", app.item, app.source);

    let (status, _, body) = send(&app.ctx, get(&uri)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["code"], "not_found");
}

#[tokio::test]
async fn cache_write_failure_is_500_storage_error() {
    let app = test_app();
    let root = app.ctx.attachments.coordinator().cache().root().to_path_buf();
    std::fs::write(root.join(app.source.to_string()), b"not a directory").unwrap();

    let uri = format!("/Videos/{}/{}/Attachments/0", app.item, app.source);
    let (status, _, body) = send(&app.ctx, get(&uri)).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["code"], "storage_error");
}

#[tokio::test]
async fn unknown_source_is_404_and_bad_index_is_400() {
    let app = test_app();

    let uri = format!("/Videos/{}/{}/Attachments/0", app.item, MediaSourceId::new());
    let (status, _, _) = send(&app.ctx, get(&uri)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let uri = format!("/Videos/{}/{}/Attachments/-1", app.item, app.source);
    let (status, _, _) = send(&app.ctx, get(&uri)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let uri = format!("/Videos/{}/{}/Attachments/99999999999", app.item, app.source);
    let (status, _, _) = send(&app.ctx, get(&uri)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let uri = format!("/Videos/not-a-guid/{}/Attachments/0", app.source);
    let (status, _, _) = send(&app.ctx, get(&uri)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn lists_attachments() {
    let app = test_app();
    let uri = format!("/api/items/{}/sources/{}/attachments", app.item, app.source);

    let (status, _, body) = send(&app.ctx, get(&uri)).await;
    assert_eq!(status, StatusCode::OK);
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json.as_array().unwrap().len(), 2);
    assert_eq!(json[0]["mime_type"], "text/vtt");
    assert_eq!(app.prober.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn cache_stats_and_evict() {
    let app = test_app();
    let uri = format!("/Videos/{}/{}/Attachments/0", app.item, app.source);
    send(&app.ctx, get(&uri)).await;

    let (_, _, body) = send(&app.ctx, get("/api/attachments/cache")).await;
    let stats: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(stats["entries"], 1);
    assert_eq!(stats["bytes"], VTT.len());

    let request = Request::builder()
        .method("DELETE")
        .uri(format!("/api/attachments/cache/{}", app.source))
        .body(Body::empty())
        .unwrap();
    let (status, _, body) = send(&app.ctx, request).await;
    assert_eq!(status, StatusCode::OK);
    let evicted: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(evicted["removed"], 1);

    send(&app.ctx, get(&uri)).await;
    assert_eq!(app.prober.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn admin_tools_lists_known_tools() {
    let app = test_app();
    let (status, _, body) = send(&app.ctx, get("/api/admin/tools")).await;
    assert_eq!(status, StatusCode::OK);
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert!(json.as_array().unwrap().iter().any(|t| t["name"] == "ffmpeg"));
}

#[tokio::test]
async fn notification_lifecycle() {
    let app = test_app();
    let user = UserId::new();

    app.ctx.notifications.send(fv_server::notifications::NotificationRequest {
        name: "Extraction failed".into(),
        description: Some("movie.mkv".into()),
        url: None,
        level: fv_core::config::NotificationLevel::Warning,
        user_ids: vec![user],
        date: None,
    });

    let (status, _, body) = send(&app.ctx, get(&format!("/Notifications/{user}"))).await;
    assert_eq!(status, StatusCode::OK);
    let list: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(list["TotalRecordCount"], 1);
    assert_eq!(list["Notifications"][0]["Name"], "Extraction failed");
    assert_eq!(list["Notifications"][0]["IsRead"], false);

    let (_, _, body) = send(&app.ctx, get(&format!("/Notifications/{user}/Summary"))).await;
    let summary: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(summary["UnreadCount"], 1);
    assert_eq!(summary["MaxUnreadNotificationLevel"], "Warning");

    let (status, _, _) = send(&app.ctx, post(&format!("/Notifications/{user}/Read"), None)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (_, _, body) = send(&app.ctx, get(&format!("/Notifications/{user}/Summary"))).await;
    let summary: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(summary["UnreadCount"], 0);

    let (status, _, _) = send(&app.ctx, post(&format!("/Notifications/{user}/Unread"), None)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (_, _, body) = send(&app.ctx, get(&format!("/Notifications/{user}?isRead=false"))).await;
    let list: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(list["TotalRecordCount"], 1);
}

#[tokio::test]
async fn admin_notification_and_catalogues() {
    let app = test_app();

    let body = serde_json::json!({ "Name": "Restart required", "NotificationLevel": "Error" });
    let (status, _, _) = send(&app.ctx, post("/Notifications/Admin", Some(body))).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _, _) =
        send(&app.ctx, post("/Notifications/Admin", Some(serde_json::json!({ "Name": " " })))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _, body) = send(&app.ctx, get("/Notifications/Types")).await;
    assert_eq!(status, StatusCode::OK);
    let types: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert!(types.as_array().unwrap().iter().any(|t| t["Type"] == "TaskFailed"));

    let (status, _, body) = send(&app.ctx, get("/Notifications/Services")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"[]");
}

#[tokio::test]
async fn invalid_user_id_is_400() {
    let app = test_app();
    let (status, _, _) = send(&app.ctx, get("/Notifications/not-a-user/Summary")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn openapi_document_is_served() {
    let app = test_app();
    let (status, _, body) = send(&app.ctx, get("/api-docs/openapi.json")).await;
    assert_eq!(status, StatusCode::OK);
    let doc: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert!(doc["paths"]["/Videos/{item_id}/{media_source_id}/Attachments/{index}"].is_object());
}

#[tokio::test]
async fn unknown_jellyfin_path_returns_json_404() {
    let app = test_app();
    let (status, headers, _) = send(&app.ctx, get("/System/Unknown")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(headers[header::CONTENT_TYPE], "application/json");
}
