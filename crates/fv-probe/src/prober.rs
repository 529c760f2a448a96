//! The [`AttachmentProber`] trait defining the interface for attachment
//! extraction.

use std::path::Path;

use async_trait::async_trait;

use crate::error::ProbeError;
use crate::types::{AttachmentStream, ProbedAttachment};

/// A container prober capable of listing and dumping embedded attachments.
///
/// Implementations must be safe to share across threads (`Send + Sync`).
#[async_trait]
pub trait AttachmentProber: Send + Sync {
    /// Human-readable name identifying this prober implementation.
    fn name(&self) -> &'static str;

    /// Check whether this prober supports the given file path.
    ///
    /// Typically checks the file extension. A return value of `true` does
    /// not guarantee that extraction will succeed.
    fn supports(&self, path: &Path) -> bool;

    /// List every attachment stream in the container.
    async fn list(&self, path: &Path) -> Result<Vec<AttachmentStream>, ProbeError>;

    /// Write the raw bytes of attachment `index` to `dest`.
    ///
    /// `dest` may already exist (an empty staging file) and is overwritten.
    /// Returns [`ProbeError::IndexNotFound`] when the container has no
    /// attachment at `index`.
    async fn extract(
        &self,
        path: &Path,
        index: u32,
        dest: &Path,
    ) -> Result<ProbedAttachment, ProbeError>;
}
