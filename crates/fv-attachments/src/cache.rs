//! On-disk store of extracted attachments.
//!
//! Layout under the cache root:
//!
//! ```text
//! <root>/.staging/                    in-progress writes
//! <root>/<media_source_id>/<index>-<fingerprint>.bin
//! <root>/<media_source_id>/<index>-<fingerprint>.json
//! ```
//!
//! The sidecar is renamed into place before the data file, so a visible data
//! file always has its metadata next to it. Readers never see partial data.

use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use fv_core::MediaSourceId;
use fv_probe::ProbedAttachment;
use serde::{Deserialize, Serialize};
use tempfile::{NamedTempFile, TempPath};
use tracing::{debug, info, warn};

use crate::error::ExtractionError;
use crate::key::{CacheKey, Fingerprint};

/// Content type used when the container does not declare one.
pub const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

const STAGING_DIR: &str = ".staging";
const DATA_EXT: &str = "bin";
const META_EXT: &str = "json";

/// A cached attachment and its metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedAttachment {
    pub media_source_id: MediaSourceId,
    pub index: u32,
    pub fingerprint: Fingerprint,
    pub mime_type: Option<String>,
    pub file_name: Option<String>,
    pub size: u64,
    pub created: DateTime<Utc>,
    /// Location of the data file. Derived from the key, never persisted.
    #[serde(skip)]
    pub path: PathBuf,
}

impl ExtractedAttachment {
    /// Declared content type or [`DEFAULT_MIME_TYPE`].
    pub fn content_type(&self) -> &str {
        self.mime_type.as_deref().unwrap_or(DEFAULT_MIME_TYPE)
    }

    /// Declared file name or `attachment-<index>`.
    pub fn download_name(&self) -> String {
        self.file_name
            .clone()
            .unwrap_or_else(|| format!("attachment-{}", self.index))
    }
}

/// Totals reported by [`ExtractionCache::stats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub entries: usize,
    pub bytes: u64,
}

/// Directory-backed attachment cache.
#[derive(Debug)]
pub struct ExtractionCache {
    root: PathBuf,
}

impl ExtractionCache {
    /// Open (creating if needed) a cache rooted at `root`.
    ///
    /// Leftover staging files from an interrupted run are removed.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, ExtractionError> {
        let root = root.into();
        let staging = root.join(STAGING_DIR);

        if staging.exists() {
            std::fs::remove_dir_all(&staging)
                .map_err(|e| ExtractionError::storage(&staging, e))?;
        }
        std::fs::create_dir_all(&staging).map_err(|e| ExtractionError::storage(&staging, e))?;

        info!(root = %root.display(), "Attachment cache opened");
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn source_dir(&self, source: MediaSourceId) -> PathBuf {
        self.root.join(source.to_string())
    }

    fn data_path(&self, key: &CacheKey) -> PathBuf {
        self.source_dir(key.media_source_id)
            .join(format!("{}.{DATA_EXT}", key.file_stem()))
    }

    fn meta_path(&self, key: &CacheKey) -> PathBuf {
        self.source_dir(key.media_source_id)
            .join(format!("{}.{META_EXT}", key.file_stem()))
    }

    /// Return the cached entry for `key`, if complete.
    ///
    /// A data file without a readable sidecar, or whose sidecar disagrees
    /// with it, is treated as absent.
    pub async fn lookup(&self, key: &CacheKey) -> Result<Option<ExtractedAttachment>, ExtractionError> {
        let data_path = self.data_path(key);
        let data_meta = match tokio::fs::metadata(&data_path).await {
            Ok(m) => m,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(ExtractionError::storage(&data_path, e)),
        };

        let meta_path = self.meta_path(key);
        let raw = match tokio::fs::read(&meta_path).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!(key = %key, error = %e, "Cache entry has no readable sidecar");
                return Ok(None);
            }
        };

        let mut entry: ExtractedAttachment = match serde_json::from_slice(&raw) {
            Ok(entry) => entry,
            Err(e) => {
                warn!(key = %key, error = %e, "Cache sidecar is corrupt");
                return Ok(None);
            }
        };

        if entry.fingerprint != key.fingerprint || entry.index != key.index || entry.size != data_meta.len() {
            warn!(key = %key, "Cache sidecar does not match data file");
            return Ok(None);
        }

        entry.path = data_path;
        Ok(Some(entry))
    }

    /// Reserve a staging file for a prober to write into.
    ///
    /// The file is deleted when the returned path is dropped unless it is
    /// handed to [`ExtractionCache::store`].
    pub fn staging_file(&self) -> Result<TempPath, ExtractionError> {
        let staging = self.root.join(STAGING_DIR);
        NamedTempFile::new_in(&staging)
            .map(NamedTempFile::into_temp_path)
            .map_err(|e| ExtractionError::storage(&staging, e))
    }

    /// Move a fully written staging file into place under `key`.
    ///
    /// Older versions of the same source + index are removed afterwards.
    pub async fn store(
        &self,
        key: &CacheKey,
        staged: TempPath,
        probed: &ProbedAttachment,
    ) -> Result<ExtractedAttachment, ExtractionError> {
        let dir = self.source_dir(key.media_source_id);
        let staging = self.root.join(STAGING_DIR);
        let data_path = self.data_path(key);
        let meta_path = self.meta_path(key);
        let key = key.clone();
        let probed = probed.clone();

        let entry = tokio::task::spawn_blocking(move || {
            std::fs::create_dir_all(&dir).map_err(|e| ExtractionError::storage(&dir, e))?;

            let size = std::fs::metadata(&staged)
                .map_err(|e| ExtractionError::storage(&*staged, e))?
                .len();

            let entry = ExtractedAttachment {
                media_source_id: key.media_source_id,
                index: key.index,
                fingerprint: key.fingerprint.clone(),
                mime_type: probed.mime_type,
                file_name: probed.file_name,
                size,
                created: Utc::now(),
                path: data_path.clone(),
            };

            write_sidecar(&staging, &meta_path, &entry)?;
            staged
                .persist(&data_path)
                .map_err(|e| ExtractionError::storage(&data_path, e.error))?;

            remove_stale(&dir, &key);
            Ok::<_, ExtractionError>(entry)
        })
        .await
        .map_err(|e| ExtractionError::Aborted(format!("cache store task failed: {e}")))??;

        debug!(
            path = %entry.path.display(),
            size = entry.size,
            mime_type = entry.content_type(),
            "Attachment stored in cache"
        );
        Ok(entry)
    }

    /// Drop every cached attachment of `source`. Returns the number of
    /// attachments removed.
    pub async fn evict(&self, source: MediaSourceId) -> Result<usize, ExtractionError> {
        let dir = self.source_dir(source);
        let removed = tokio::task::spawn_blocking(move || {
            let count = match std::fs::read_dir(&dir) {
                Ok(entries) => entries
                    .filter_map(|e| e.ok())
                    .filter(|e| has_ext(&e.path(), DATA_EXT))
                    .count(),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
                Err(e) => return Err(ExtractionError::storage(&dir, e)),
            };
            std::fs::remove_dir_all(&dir).map_err(|e| ExtractionError::storage(&dir, e))?;
            Ok(count)
        })
        .await
        .map_err(|e| ExtractionError::Aborted(format!("cache evict task failed: {e}")))??;

        info!(media_source_id = %source, removed, "Evicted cached attachments");
        Ok(removed)
    }

    /// Count cached attachments and their total size.
    pub async fn stats(&self) -> Result<CacheStats, ExtractionError> {
        let root = self.root.clone();
        tokio::task::spawn_blocking(move || {
            let mut stats = CacheStats::default();
            for entry in walkdir::WalkDir::new(&root).min_depth(2).max_depth(2) {
                let entry = entry.map_err(|e| {
                    let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| root.clone());
                    ExtractionError::storage(path, std::io::Error::other(e.to_string()))
                })?;
                if entry.file_type().is_file() && has_ext(entry.path(), DATA_EXT) {
                    stats.entries += 1;
                    stats.bytes += entry.metadata().map(|m| m.len()).unwrap_or(0);
                }
            }
            Ok(stats)
        })
        .await
        .map_err(|e| ExtractionError::Aborted(format!("cache stats task failed: {e}")))?
    }
}

fn has_ext(path: &Path, ext: &str) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some(ext)
}

fn write_sidecar(staging: &Path, dest: &Path, entry: &ExtractedAttachment) -> Result<(), ExtractionError> {
    let json = serde_json::to_vec_pretty(entry)
        .map_err(|e| ExtractionError::storage(dest, std::io::Error::other(e)))?;

    let mut tmp = NamedTempFile::new_in(staging).map_err(|e| ExtractionError::storage(staging, e))?;
    tmp.write_all(&json)
        .map_err(|e| ExtractionError::storage(tmp.path(), e))?;
    tmp.persist(dest)
        .map_err(|e| ExtractionError::storage(dest, e.error))?;
    Ok(())
}

/// Remove other fingerprints' files for the same index. Best effort.
fn remove_stale(dir: &Path, key: &CacheKey) {
    let prefix = key.slot_prefix();
    let current = key.file_stem();

    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    for entry in entries.filter_map(|e| e.ok()) {
        let path = entry.path();
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        if stem.starts_with(&prefix) && stem != current {
            if let Err(e) = std::fs::remove_file(&path) {
                warn!(path = %path.display(), error = %e, "Failed to remove stale cache file");
            } else {
                debug!(path = %path.display(), "Removed stale cache file");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, UNIX_EPOCH};

    fn key(source: MediaSourceId, index: u32, version: u64) -> CacheKey {
        let fp = Fingerprint::compute(
            Path::new("/media/movie.mkv"),
            UNIX_EPOCH + Duration::from_secs(version),
            1024,
        );
        CacheKey::new(source, index, fp)
    }

    fn probed(mime: &str, name: &str) -> ProbedAttachment {
        ProbedAttachment::new(Some(mime.to_string()), Some(name.to_string()))
    }

    async fn put(cache: &ExtractionCache, key: &CacheKey, data: &[u8]) -> ExtractedAttachment {
        let staged = cache.staging_file().unwrap();
        std::fs::write(&staged, data).unwrap();
        cache.store(key, staged, &probed("text/vtt", "subs.vtt")).await.unwrap()
    }

    #[tokio::test]
    async fn lookup_miss_on_empty_cache() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ExtractionCache::open(dir.path()).unwrap();
        let k = key(MediaSourceId::new(), 3, 1);
        assert!(cache.lookup(&k).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn store_then_lookup() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ExtractionCache::open(dir.path()).unwrap();
        let k = key(MediaSourceId::new(), 3, 1);

        let stored = put(&cache, &k, b"WEBVTT\n").await;
        assert_eq!(stored.size, 7);
        assert_eq!(stored.content_type(), "text/vtt");

        let found = cache.lookup(&k).await.unwrap().unwrap();
        assert_eq!(found, stored);
        assert_eq!(std::fs::read(&found.path).unwrap(), b"WEBVTT\n");
    }

    #[tokio::test]
    async fn defaults_when_metadata_missing() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ExtractionCache::open(dir.path()).unwrap();
        let k = key(MediaSourceId::new(), 5, 1);

        let staged = cache.staging_file().unwrap();
        std::fs::write(&staged, b"data").unwrap();
        let entry = cache.store(&k, staged, &ProbedAttachment::default()).await.unwrap();

        assert_eq!(entry.content_type(), DEFAULT_MIME_TYPE);
        assert_eq!(entry.download_name(), "attachment-5");
    }

    #[tokio::test]
    async fn missing_sidecar_is_a_miss() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ExtractionCache::open(dir.path()).unwrap();
        let k = key(MediaSourceId::new(), 3, 1);
        put(&cache, &k, b"abc").await;

        std::fs::remove_file(cache.meta_path(&k)).unwrap();
        assert!(cache.lookup(&k).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn corrupt_sidecar_is_a_miss() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ExtractionCache::open(dir.path()).unwrap();
        let k = key(MediaSourceId::new(), 3, 1);
        put(&cache, &k, b"abc").await;

        std::fs::write(cache.meta_path(&k), b"{not json").unwrap();
        assert!(cache.lookup(&k).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn new_fingerprint_replaces_old_version() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ExtractionCache::open(dir.path()).unwrap();
        let source = MediaSourceId::new();
        let old = key(source, 3, 1);
        let new = key(source, 3, 2);
        let other_index = key(source, 4, 1);

        put(&cache, &old, b"old").await;
        put(&cache, &other_index, b"keep").await;
        put(&cache, &new, b"new").await;

        assert!(cache.lookup(&old).await.unwrap().is_none());
        assert!(!cache.data_path(&old).exists());
        assert!(!cache.meta_path(&old).exists());
        assert!(cache.lookup(&new).await.unwrap().is_some());
        assert!(cache.lookup(&other_index).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn dropped_staging_file_leaves_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ExtractionCache::open(dir.path()).unwrap();

        let staged = cache.staging_file().unwrap();
        std::fs::write(&staged, b"partial").unwrap();
        let path = staged.to_path_buf();
        drop(staged);

        assert!(!path.exists());
        assert_eq!(cache.stats().await.unwrap(), CacheStats::default());
    }

    #[tokio::test]
    async fn open_clears_orphaned_staging_files() {
        let dir = tempfile::tempdir().unwrap();
        let staging = dir.path().join(STAGING_DIR);
        std::fs::create_dir_all(&staging).unwrap();
        std::fs::write(staging.join("orphan"), b"junk").unwrap();

        ExtractionCache::open(dir.path()).unwrap();
        assert!(staging.exists());
        assert!(!staging.join("orphan").exists());
    }

    #[tokio::test]
    async fn evict_and_stats() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ExtractionCache::open(dir.path()).unwrap();
        let a = MediaSourceId::new();
        let b = MediaSourceId::new();

        put(&cache, &key(a, 1, 1), b"12345").await;
        put(&cache, &key(a, 2, 1), b"123").await;
        put(&cache, &key(b, 1, 1), b"1").await;

        assert_eq!(cache.stats().await.unwrap(), CacheStats { entries: 3, bytes: 9 });

        assert_eq!(cache.evict(a).await.unwrap(), 2);
        assert_eq!(cache.stats().await.unwrap(), CacheStats { entries: 1, bytes: 1 });
        assert!(cache.lookup(&key(a, 1, 1)).await.unwrap().is_none());

        assert_eq!(cache.evict(a).await.unwrap(), 0);
    }
}
