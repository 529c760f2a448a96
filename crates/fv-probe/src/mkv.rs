//! Pure-Rust attachment prober for Matroska/WebM containers.
//!
//! Uses the `matroska` crate, which parses the attachment section into
//! memory. Stream indices follow ffprobe numbering: tracks come first, then
//! attachments, so attachment `n` has stream index `track_count + n`.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use async_trait::async_trait;

use crate::error::ProbeError;
use crate::prober::AttachmentProber;
use crate::types::{AttachmentStream, ProbedAttachment};

const NAME: &str = "matroska";

/// An [`AttachmentProber`] reading MKV/WebM files natively.
pub struct MatroskaProber;

impl MatroskaProber {
    /// Create a new `MatroskaProber`.
    pub fn new() -> Self {
        Self
    }
}

impl Default for MatroskaProber {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AttachmentProber for MatroskaProber {
    fn name(&self) -> &'static str {
        NAME
    }

    fn supports(&self, path: &Path) -> bool {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) => matches!(ext.to_lowercase().as_str(), "mkv" | "mka" | "mks" | "webm"),
            None => false,
        }
    }

    async fn list(&self, path: &Path) -> Result<Vec<AttachmentStream>, ProbeError> {
        let path = path.to_path_buf();
        run_blocking(move || {
            let mkv = open(&path)?;
            let track_count = mkv.tracks.len();
            Ok(mkv
                .attachments
                .iter()
                .enumerate()
                .map(|(ordinal, att)| AttachmentStream {
                    index: (track_count + ordinal) as u32,
                    file_name: Some(att.name.clone()).filter(|n| !n.is_empty()),
                    mime_type: Some(att.mime_type.clone()).filter(|m| !m.is_empty()),
                    size: Some(att.data.len() as u64),
                })
                .collect())
        })
        .await
    }

    async fn extract(
        &self,
        path: &Path,
        index: u32,
        dest: &Path,
    ) -> Result<ProbedAttachment, ProbeError> {
        let path = path.to_path_buf();
        let dest = dest.to_path_buf();
        run_blocking(move || {
            let mkv = open(&path)?;
            let ordinal = attachment_ordinal(mkv.tracks.len(), index).ok_or_else(|| {
                ProbeError::IndexNotFound {
                    path: path.clone(),
                    index,
                }
            })?;
            let att = mkv
                .attachments
                .get(ordinal)
                .ok_or_else(|| ProbeError::IndexNotFound {
                    path: path.clone(),
                    index,
                })?;

            std::fs::write(&dest, &att.data).map_err(|e| {
                ProbeError::failed(NAME, format!("failed to write {}: {e}", dest.display()))
            })?;

            tracing::debug!(
                path = %path.display(),
                index,
                bytes = att.data.len(),
                "dumped matroska attachment"
            );

            Ok(ProbedAttachment::new(
                Some(att.mime_type.clone()),
                Some(att.name.clone()),
            ))
        })
        .await
    }
}

/// Map a stream index to a position in the attachment list.
fn attachment_ordinal(track_count: usize, index: u32) -> Option<usize> {
    (index as usize).checked_sub(track_count)
}

fn open(path: &Path) -> Result<::matroska::Matroska, ProbeError> {
    let file = File::open(path)
        .map_err(|e| ProbeError::failed(NAME, format!("{}: {e}", path.display())))?;
    ::matroska::Matroska::open(BufReader::new(file))
        .map_err(|e| ProbeError::failed(NAME, format!("MKV parse error: {e}")))
}

/// Container parsing is blocking file I/O; keep it off the async workers.
async fn run_blocking<T, F>(f: F) -> Result<T, ProbeError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, ProbeError> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ProbeError::failed(NAME, format!("probe task failed: {e}")))?
}
