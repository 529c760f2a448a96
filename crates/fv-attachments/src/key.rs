//! Cache identity: which source, which stream, which version of the file.

use std::fmt;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use fv_core::MediaSourceId;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Hex characters kept from the digest; 64 bits is plenty to tell file
/// versions of one media source apart.
const FINGERPRINT_LEN: usize = 16;

/// Digest of a source file's path, modification time and size.
///
/// Any change to the file (replacement, re-mux, touch) yields a new
/// fingerprint, which makes older cache entries stale.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Compute a fingerprint from already-known file attributes.
    pub fn compute(path: &Path, modified: SystemTime, len: u64) -> Self {
        let mtime_nanos = modified
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);

        let mut hasher = Sha256::new();
        hasher.update(path.to_string_lossy().as_bytes());
        hasher.update(b"\0");
        hasher.update(mtime_nanos.to_le_bytes());
        hasher.update(len.to_le_bytes());
        let digest = hex::encode(hasher.finalize());

        Self(digest[..FINGERPRINT_LEN].to_string())
    }

    /// Stat `path` and fingerprint it.
    pub async fn of_file(path: &Path) -> std::io::Result<Self> {
        let meta = tokio::fs::metadata(path).await?;
        let modified = meta.modified().unwrap_or(UNIX_EPOCH);
        Ok(Self::compute(path, modified, meta.len()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Address of one extracted attachment in the cache.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub media_source_id: MediaSourceId,
    /// Stream index of the attachment inside the container.
    pub index: u32,
    pub fingerprint: Fingerprint,
}

impl CacheKey {
    pub fn new(media_source_id: MediaSourceId, index: u32, fingerprint: Fingerprint) -> Self {
        Self {
            media_source_id,
            index,
            fingerprint,
        }
    }

    /// File stem shared by the data file and its metadata sidecar.
    pub fn file_stem(&self) -> String {
        format!("{}-{}", self.index, self.fingerprint)
    }

    /// Prefix shared by every version of this source + index.
    pub(crate) fn slot_prefix(&self) -> String {
        format!("{}-", self.index)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}@{}", self.media_source_id, self.index, self.fingerprint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn at(secs: u64) -> SystemTime {
        UNIX_EPOCH + Duration::from_secs(secs)
    }

    #[test]
    fn fingerprint_is_stable() {
        let a = Fingerprint::compute(Path::new("/media/a.mkv"), at(1_700_000_000), 42);
        let b = Fingerprint::compute(Path::new("/media/a.mkv"), at(1_700_000_000), 42);
        assert_eq!(a, b);
        assert_eq!(a.as_str().len(), FINGERPRINT_LEN);
    }

    #[test]
    fn fingerprint_tracks_every_attribute() {
        let base = Fingerprint::compute(Path::new("/media/a.mkv"), at(100), 42);
        assert_ne!(base, Fingerprint::compute(Path::new("/media/b.mkv"), at(100), 42));
        assert_ne!(base, Fingerprint::compute(Path::new("/media/a.mkv"), at(101), 42));
        assert_ne!(base, Fingerprint::compute(Path::new("/media/a.mkv"), at(100), 43));
    }

    #[tokio::test]
    async fn fingerprint_of_file_changes_with_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("movie.mkv");
        std::fs::write(&path, b"one").unwrap();
        let first = Fingerprint::of_file(&path).await.unwrap();

        std::fs::write(&path, b"longer content").unwrap();
        let second = Fingerprint::of_file(&path).await.unwrap();
        assert_ne!(first, second);
    }

    #[tokio::test]
    async fn fingerprint_of_missing_file_is_not_found() {
        let err = Fingerprint::of_file(Path::new("/nonexistent/movie.mkv"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::NotFound);
    }

    #[test]
    fn key_naming() {
        let source = MediaSourceId::new();
        let fp = Fingerprint::compute(Path::new("/m.mkv"), at(1), 1);
        let key = CacheKey::new(source, 7, fp.clone());
        assert_eq!(key.file_stem(), format!("7-{fp}"));
        assert_eq!(key.slot_prefix(), "7-");
        assert_eq!(key.to_string(), format!("{source}/7@{fp}"));
    }
}
