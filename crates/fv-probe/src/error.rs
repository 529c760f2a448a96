//! Prober failure modes.

use std::path::PathBuf;

/// Why a prober could not list or extract attachments.
///
/// `Clone` so a single failure can be handed to every caller waiting on the
/// same extraction.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProbeError {
    /// The container has no attachment stream at the requested index.
    #[error("no attachment at index {index} in {}", path.display())]
    IndexNotFound {
        /// Container that was inspected.
        path: PathBuf,
        /// Requested stream index.
        index: u32,
    },

    /// No configured prober handles this kind of file.
    #[error("unsupported container: {0}")]
    Unsupported(String),

    /// The prober ran but could not read or decode the container.
    #[error("{prober} failed: {message}")]
    Failed {
        /// Name of the prober that failed.
        prober: String,
        /// Human-readable error description.
        message: String,
    },
}

impl ProbeError {
    /// Convenience constructor for [`ProbeError::Failed`].
    pub fn failed(prober: impl Into<String>, message: impl Into<String>) -> Self {
        ProbeError::Failed {
            prober: prober.into(),
            message: message.into(),
        }
    }

    /// Whether the container simply lacks the requested stream.
    pub fn is_index_not_found(&self) -> bool {
        matches!(self, ProbeError::IndexNotFound { .. })
    }
}

impl From<ProbeError> for fv_core::Error {
    fn from(e: ProbeError) -> Self {
        match e {
            ProbeError::IndexNotFound { path, index } => {
                fv_core::Error::not_found("attachment", format!("{}#{index}", path.display()))
            }
            other => fv_core::Error::Probe(other.to_string()),
        }
    }
}
