//! A composite prober that delegates to multiple [`AttachmentProber`]
//! implementations.

use std::path::Path;

use async_trait::async_trait;

use crate::error::ProbeError;
use crate::prober::AttachmentProber;
use crate::types::{AttachmentStream, ProbedAttachment};

/// Tries each registered [`AttachmentProber`] in order and returns the first
/// successful result.
///
/// [`ProbeError::IndexNotFound`] is authoritative: a prober that could read
/// the container and found no such stream ends the search.
pub struct CompositeProber {
    probers: Vec<Box<dyn AttachmentProber>>,
}

impl CompositeProber {
    /// Create a new `CompositeProber` from an ordered list of probers.
    pub fn new(probers: Vec<Box<dyn AttachmentProber>>) -> Self {
        Self { probers }
    }

    fn unsupported(path: &Path) -> ProbeError {
        ProbeError::Unsupported(format!("no prober supports file: {}", path.display()))
    }
}

#[async_trait]
impl AttachmentProber for CompositeProber {
    fn name(&self) -> &'static str {
        "composite"
    }

    fn supports(&self, path: &Path) -> bool {
        self.probers.iter().any(|p| p.supports(path))
    }

    async fn list(&self, path: &Path) -> Result<Vec<AttachmentStream>, ProbeError> {
        let mut last_err = None;

        for prober in &self.probers {
            if !prober.supports(path) {
                continue;
            }

            match prober.list(path).await {
                Ok(streams) => return Ok(streams),
                Err(e) => {
                    tracing::debug!(
                        prober = prober.name(),
                        error = %e,
                        "attachment listing failed, trying next prober"
                    );
                    last_err = Some(e);
                }
            }
        }

        Err(last_err.unwrap_or_else(|| Self::unsupported(path)))
    }

    async fn extract(
        &self,
        path: &Path,
        index: u32,
        dest: &Path,
    ) -> Result<ProbedAttachment, ProbeError> {
        let mut last_err = None;

        for prober in &self.probers {
            if !prober.supports(path) {
                continue;
            }

            match prober.extract(path, index, dest).await {
                Ok(probed) => return Ok(probed),
                Err(e) if e.is_index_not_found() => return Err(e),
                Err(e) => {
                    tracing::debug!(
                        prober = prober.name(),
                        index,
                        error = %e,
                        "attachment extraction failed, trying next prober"
                    );
                    last_err = Some(e);
                }
            }
        }

        Err(last_err.unwrap_or_else(|| Self::unsupported(path)))
    }
}
