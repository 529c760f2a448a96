//! Request-facing attachment operations.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use fv_core::{Error, ItemId, MediaSourceId, Result};
use fv_probe::{AttachmentProber, AttachmentStream, ProbeError};
use tracing::{debug, warn};

use crate::cache::{CacheStats, ExtractedAttachment};
use crate::coordinator::ExtractionCoordinator;
use crate::error::ExtractionError;
use crate::key::{CacheKey, Fingerprint};
use crate::library::{MediaLibrary, MediaSourceRef};

/// An extracted attachment ready to be streamed.
#[derive(Debug)]
pub struct AttachmentHandle {
    pub attachment: ExtractedAttachment,
    pub file: tokio::fs::File,
}

impl AttachmentHandle {
    pub fn content_type(&self) -> &str {
        self.attachment.content_type()
    }

    pub fn size(&self) -> u64 {
        self.attachment.size
    }
}

/// Resolves, extracts and serves container attachments.
#[derive(Clone)]
pub struct AttachmentService {
    library: Arc<dyn MediaLibrary>,
    prober: Arc<dyn AttachmentProber>,
    coordinator: ExtractionCoordinator,
    extraction_timeout: Duration,
}

impl AttachmentService {
    pub fn new(
        library: Arc<dyn MediaLibrary>,
        prober: Arc<dyn AttachmentProber>,
        coordinator: ExtractionCoordinator,
    ) -> Self {
        Self {
            library,
            prober,
            coordinator,
            extraction_timeout: Duration::from_secs(300),
        }
    }

    /// Bound each prober run. Zero disables the limit.
    pub fn with_extraction_timeout(mut self, timeout: Duration) -> Self {
        self.extraction_timeout = timeout;
        self
    }

    pub fn coordinator(&self) -> &ExtractionCoordinator {
        &self.coordinator
    }

    /// Fetch attachment `index` of a media source, extracting it on first use.
    ///
    /// Unknown ids, a missing source file and any prober failure all surface
    /// as [`Error::NotFound`]. Cache I/O failures surface as
    /// [`Error::Storage`].
    pub async fn get_attachment(
        &self,
        item_id: ItemId,
        media_source_id: MediaSourceId,
        index: u32,
    ) -> Result<AttachmentHandle> {
        let source = self
            .library
            .resolve_media_source(item_id, media_source_id)
            .await?;

        // A concurrent store of a newer file version can remove the entry
        // between resolve and open; one retry picks up the new entry.
        let mut retried = false;
        loop {
            let attachment = self.resolve(&source, index).await?;
            match tokio::fs::File::open(&attachment.path).await {
                Ok(file) => return Ok(AttachmentHandle { attachment, file }),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound && !retried => {
                    debug!(path = %attachment.path.display(), "Cache entry vanished, retrying");
                    retried = true;
                }
                Err(e) => return Err(Error::storage(attachment.path, e)),
            }
        }
    }

    /// List the attachment streams of a media source.
    pub async fn list_attachments(
        &self,
        item_id: ItemId,
        media_source_id: MediaSourceId,
    ) -> Result<Vec<AttachmentStream>> {
        let source = self
            .library
            .resolve_media_source(item_id, media_source_id)
            .await?;
        if !tokio::fs::try_exists(&source.path).await.unwrap_or(false) {
            return Err(Error::not_found("file", source.path.display()));
        }
        Ok(self.prober.list(&source.path).await?)
    }

    /// Drop every cached attachment of a media source.
    pub async fn evict(&self, media_source_id: MediaSourceId) -> Result<usize> {
        Ok(self.coordinator.cache().evict(media_source_id).await?)
    }

    pub async fn cache_stats(&self) -> Result<CacheStats> {
        Ok(self.coordinator.cache().stats().await?)
    }

    async fn resolve(&self, source: &MediaSourceRef, index: u32) -> Result<ExtractedAttachment> {
        let fingerprint = match Fingerprint::of_file(&source.path).await {
            Ok(fp) => fp,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::not_found("file", source.path.display()));
            }
            Err(e) => return Err(e.into()),
        };
        let key = CacheKey::new(source.media_source_id, index, fingerprint);

        let prober = self.prober.clone();
        let path = source.path.clone();
        let timeout = self.extraction_timeout;
        let outcome = self
            .coordinator
            .resolve(key, move |dest: PathBuf| async move {
                if timeout.is_zero() {
                    return prober.extract(&path, index, &dest).await;
                }
                match tokio::time::timeout(timeout, prober.extract(&path, index, &dest)).await {
                    Ok(result) => result,
                    Err(_) => Err(ProbeError::failed(
                        prober.name(),
                        format!("timed out after {}s", timeout.as_secs()),
                    )),
                }
            })
            .await;

        outcome.map_err(|e| match e {
            ExtractionError::Probe(probe) => {
                if !probe.is_index_not_found() {
                    warn!(
                        media_source_id = %source.media_source_id,
                        index,
                        error = %probe,
                        "Attachment unavailable"
                    );
                }
                Error::not_found("attachment", format!("{}/{index}", source.media_source_id))
            }
            other => other.into(),
        })
    }
}
