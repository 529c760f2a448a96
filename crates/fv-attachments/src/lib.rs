//! fv-attachments: on-demand extraction of embedded container attachments.
//!
//! Requests flow through three layers:
//!
//! - [`AttachmentService`] resolves an item + media source through the
//!   [`MediaLibrary`], fingerprints the source file into a [`CacheKey`] and
//!   hands back an open file plus metadata.
//! - [`ExtractionCoordinator`] makes sure the prober runs at most once per key
//!   at a time. Concurrent callers for the same key share one extraction and
//!   all receive the same outcome; failures are never cached.
//! - [`ExtractionCache`] keeps one extracted file per media source + index on
//!   disk, written to a staging name and renamed into place.

pub mod cache;
pub mod coordinator;
pub mod error;
pub mod key;
pub mod library;
pub mod service;

pub use cache::{CacheStats, ExtractedAttachment, ExtractionCache, DEFAULT_MIME_TYPE};
pub use coordinator::{ExtractionCoordinator, Outcome};
pub use error::ExtractionError;
pub use key::{CacheKey, Fingerprint};
pub use library::{Catalog, CatalogItem, CatalogLibrary, CatalogSource, MediaLibrary, MediaSourceRef};
pub use service::{AttachmentHandle, AttachmentService};
