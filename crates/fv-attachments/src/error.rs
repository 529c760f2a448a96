//! Failure outcomes of an extraction.

use std::path::PathBuf;
use std::sync::Arc;

use fv_probe::ProbeError;

/// Why an extraction did not produce a cached attachment.
///
/// `Clone` so the leader can publish one failure to every waiter on the key.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ExtractionError {
    /// The prober could not produce the attachment.
    #[error(transparent)]
    Probe(#[from] ProbeError),

    /// Reading or writing the cache directory failed.
    #[error("cache storage error at {}: {source}", path.display())]
    Storage {
        /// File or directory the operation touched.
        path: PathBuf,
        /// The underlying I/O error.
        source: Arc<std::io::Error>,
    },

    /// The extraction task ended without publishing a result.
    #[error("extraction aborted: {0}")]
    Aborted(String),
}

impl ExtractionError {
    /// Convenience constructor for [`ExtractionError::Storage`].
    pub fn storage(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ExtractionError::Storage {
            path: path.into(),
            source: Arc::new(source),
        }
    }
}

impl From<ExtractionError> for fv_core::Error {
    fn from(e: ExtractionError) -> Self {
        match e {
            ExtractionError::Probe(probe) => probe.into(),
            ExtractionError::Storage { path, source } => fv_core::Error::storage(
                path,
                std::io::Error::new(source.kind(), source.to_string()),
            ),
            ExtractionError::Aborted(message) => fv_core::Error::Internal(message),
        }
    }
}
