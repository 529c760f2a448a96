//! Resolution of item + media source ids to files on disk.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use fv_core::{Error, ItemId, MediaSourceId, Result};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::info;

/// A media source's backing file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaSourceRef {
    pub item_id: ItemId,
    pub media_source_id: MediaSourceId,
    pub path: PathBuf,
}

/// Source of truth for which files back which items.
#[async_trait]
pub trait MediaLibrary: Send + Sync {
    /// Look up the file behind `media_source_id` of `item_id`.
    ///
    /// Returns [`Error::NotFound`] when either id is unknown or the source
    /// does not belong to the item.
    async fn resolve_media_source(
        &self,
        item_id: ItemId,
        media_source_id: MediaSourceId,
    ) -> Result<MediaSourceRef>;
}

/// On-disk catalog format.
///
/// ```json
/// { "items": [ { "id": "...", "name": "Movie", "sources": [ { "id": "...", "path": "/media/movie.mkv" } ] } ] }
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    pub items: Vec<CatalogItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogItem {
    pub id: ItemId,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub sources: Vec<CatalogSource>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogSource {
    pub id: MediaSourceId,
    pub path: PathBuf,
}

/// [`MediaLibrary`] backed by a JSON catalog file.
#[derive(Debug, Default)]
pub struct CatalogLibrary {
    file: Option<PathBuf>,
    items: RwLock<HashMap<ItemId, HashMap<MediaSourceId, PathBuf>>>,
}

impl CatalogLibrary {
    /// Build from an in-memory catalog. [`CatalogLibrary::reload`] is a no-op.
    pub fn from_catalog(catalog: Catalog) -> Self {
        Self {
            file: None,
            items: RwLock::new(index(catalog)),
        }
    }

    /// Load the catalog at `path`.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let catalog = read_catalog(&path)?;
        let library = Self {
            file: Some(path),
            items: RwLock::new(index(catalog)),
        };
        info!(items = library.len(), "Media catalog loaded");
        Ok(library)
    }

    /// Re-read the catalog file, replacing the current contents.
    ///
    /// On failure the previous contents stay in place.
    pub fn reload(&self) -> Result<usize> {
        let Some(path) = &self.file else {
            return Ok(self.len());
        };
        let items = index(read_catalog(path)?);
        let count = items.len();
        *self.items.write() = items;
        info!(items = count, path = %path.display(), "Media catalog reloaded");
        Ok(count)
    }

    /// Number of items in the catalog.
    pub fn len(&self) -> usize {
        self.items.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.read().is_empty()
    }
}

fn read_catalog(path: &Path) -> Result<Catalog> {
    let raw = std::fs::read_to_string(path)?;
    serde_json::from_str(&raw)
        .map_err(|e| Error::Validation(format!("invalid catalog {}: {e}", path.display())))
}

fn index(catalog: Catalog) -> HashMap<ItemId, HashMap<MediaSourceId, PathBuf>> {
    catalog
        .items
        .into_iter()
        .map(|item| {
            let sources = item.sources.into_iter().map(|s| (s.id, s.path)).collect();
            (item.id, sources)
        })
        .collect()
}

#[async_trait]
impl MediaLibrary for CatalogLibrary {
    async fn resolve_media_source(
        &self,
        item_id: ItemId,
        media_source_id: MediaSourceId,
    ) -> Result<MediaSourceRef> {
        let items = self.items.read();
        let sources = items
            .get(&item_id)
            .ok_or_else(|| Error::not_found("item", item_id))?;
        let path = sources
            .get(&media_source_id)
            .ok_or_else(|| Error::not_found("media_source", media_source_id))?;

        Ok(MediaSourceRef {
            item_id,
            media_source_id,
            path: path.clone(),
        })
    }
}
