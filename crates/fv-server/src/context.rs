//! Application context shared by all route handlers via Axum state.

use std::sync::Arc;
use std::time::Duration;

use fv_attachments::{
    AttachmentService, Catalog, CatalogLibrary, ExtractionCache, ExtractionCoordinator,
};
use fv_av::{FfmpegProber, ToolRegistry};
use fv_core::config::{Config, ProberKind};
use fv_probe::{AttachmentProber, CompositeProber, MatroskaProber};

use crate::notifications::NotificationManager;

/// Application context shared by all request handlers (via Axum state).
///
/// This is cheaply cloneable because it only holds `Arc`s.
#[derive(Clone)]
pub struct AppContext {
    /// Immutable application configuration snapshot.
    pub config: Arc<Config>,
    /// Media catalogue; also backs the attachment service.
    pub library: Arc<CatalogLibrary>,
    /// Attachment extraction and cache.
    pub attachments: AttachmentService,
    /// Notification inboxes and webhook delivery.
    pub notifications: Arc<NotificationManager>,
    /// External tool registry.
    pub tools: Arc<ToolRegistry>,
}

impl AppContext {
    /// Wire up every service from `config`.
    pub fn from_config(config: Config) -> fv_core::Result<Self> {
        let tools = Arc::new(ToolRegistry::discover(&config.tools));
        for info in tools.check_all() {
            if info.available {
                tracing::info!(
                    "Tool found: {} ({})",
                    info.name,
                    info.version.as_deref().unwrap_or("unknown version")
                );
            } else {
                tracing::debug!("Tool not found: {}", info.name);
            }
        }

        let timeout = Duration::from_secs(config.attachments.extraction_timeout_secs);
        let prober = build_prober(config.attachments.prober, &tools, timeout)?;

        let library = match &config.library.catalog_path {
            Some(path) => Arc::new(CatalogLibrary::load(path)?),
            None => {
                tracing::warn!("No library catalog configured; every lookup will be not found");
                Arc::new(CatalogLibrary::from_catalog(Catalog::default()))
            }
        };

        let cache = ExtractionCache::open(&config.attachments.cache_dir)?;
        let attachments = AttachmentService::new(
            library.clone(),
            prober,
            ExtractionCoordinator::new(Arc::new(cache)),
        )
        .with_extraction_timeout(timeout);

        let notifications = Arc::new(NotificationManager::new(&config.notifications));

        Ok(Self {
            config: Arc::new(config),
            library,
            attachments,
            notifications,
            tools,
        })
    }
}

/// Build the configured attachment prober.
///
/// `auto` prefers the pure-Rust Matroska reader and falls back to ffmpeg
/// when it is installed. `ffmpeg` fails if the tools are missing.
pub fn build_prober(
    kind: ProberKind,
    tools: &ToolRegistry,
    timeout: Duration,
) -> fv_core::Result<Arc<dyn AttachmentProber>> {
    let mut probers: Vec<Box<dyn AttachmentProber>> = Vec::new();

    match kind {
        ProberKind::Matroska => probers.push(Box::new(MatroskaProber::new())),
        ProberKind::Ffmpeg => {
            probers.push(Box::new(FfmpegProber::from_registry(tools)?.with_timeout(timeout)));
        }
        ProberKind::Auto => {
            probers.push(Box::new(MatroskaProber::new()));
            match FfmpegProber::from_registry(tools) {
                Ok(ffmpeg) => probers.push(Box::new(ffmpeg.with_timeout(timeout))),
                Err(e) => tracing::info!("ffmpeg prober unavailable: {e}"),
            }
        }
    }

    let names: Vec<&str> = probers.iter().map(|p| p.name()).collect();
    tracing::info!(probers = ?names, "Attachment probers configured");

    Ok(Arc::new(CompositeProber::new(probers)))
}
