//! Per-key request coalescing in front of the extraction cache.
//!
//! The first caller for a key becomes the leader: it spawns the extraction as
//! a detached task and publishes the outcome on a watch channel. Later
//! callers for the same key subscribe to that channel instead of probing
//! again. Dropping a caller's future never cancels the extraction.

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use fv_probe::{ProbeError, ProbedAttachment};
use tokio::sync::watch;
use tracing::{debug, trace, warn};

use crate::cache::{ExtractedAttachment, ExtractionCache};
use crate::error::ExtractionError;
use crate::key::CacheKey;

/// Result every caller of one extraction receives.
pub type Outcome = Result<ExtractedAttachment, ExtractionError>;

type Slot = watch::Receiver<Option<Outcome>>;

/// Ensures at most one extraction per [`CacheKey`] runs at a time.
#[derive(Clone)]
pub struct ExtractionCoordinator {
    cache: Arc<ExtractionCache>,
    in_flight: Arc<DashMap<CacheKey, Slot>>,
}

impl ExtractionCoordinator {
    pub fn new(cache: Arc<ExtractionCache>) -> Self {
        Self {
            cache,
            in_flight: Arc::new(DashMap::new()),
        }
    }

    pub fn cache(&self) -> &Arc<ExtractionCache> {
        &self.cache
    }

    /// Number of extractions currently running.
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// Return the cached attachment for `key`, extracting it if needed.
    ///
    /// `extractor` receives the staging path to write into and reports the
    /// attachment's metadata. It is invoked only when this call ends up
    /// leading the extraction. A failure is handed to every caller waiting
    /// on the key and is not cached.
    pub async fn resolve<F, Fut>(&self, key: CacheKey, extractor: F) -> Outcome
    where
        F: FnOnce(PathBuf) -> Fut + Send + 'static,
        Fut: Future<Output = Result<ProbedAttachment, ProbeError>> + Send + 'static,
    {
        if let Some(hit) = self.cache.lookup(&key).await? {
            trace!(key = %key, "Attachment cache hit");
            return Ok(hit);
        }

        let mut rx = match self.in_flight.entry(key.clone()) {
            Entry::Occupied(slot) => {
                debug!(key = %key, "Joining in-flight extraction");
                slot.get().clone()
            }
            Entry::Vacant(slot) => {
                let (tx, rx) = watch::channel(None);
                slot.insert(rx.clone());
                debug!(key = %key, "Starting extraction");
                self.spawn_leader(key, tx, rx.clone(), extractor);
                rx
            }
        };

        let outcome = match rx.wait_for(Option::is_some).await {
            Ok(published) => published.clone().unwrap_or_else(|| {
                Err(ExtractionError::Aborted("extraction published no result".into()))
            }),
            Err(_) => Err(ExtractionError::Aborted(
                "extraction task ended without a result".into(),
            )),
        };
        outcome
    }

    fn spawn_leader<F, Fut>(&self, key: CacheKey, tx: watch::Sender<Option<Outcome>>, rx: Slot, extractor: F)
    where
        F: FnOnce(PathBuf) -> Fut + Send + 'static,
        Fut: Future<Output = Result<ProbedAttachment, ProbeError>> + Send + 'static,
    {
        let cache = self.cache.clone();
        let guard = SlotGuard {
            in_flight: self.in_flight.clone(),
            key: key.clone(),
            rx,
        };

        tokio::spawn(async move {
            let outcome = lead(&cache, &key, extractor).await;
            if let Err(e) = &outcome {
                warn!(key = %key, error = %e, "Attachment extraction failed");
            }
            // Late arrivals either hit the stored entry or start a fresh attempt.
            drop(guard);
            tx.send_replace(Some(outcome));
        });
    }
}

async fn lead<F, Fut>(cache: &ExtractionCache, key: &CacheKey, extractor: F) -> Outcome
where
    F: FnOnce(PathBuf) -> Fut,
    Fut: Future<Output = Result<ProbedAttachment, ProbeError>>,
{
    // A previous leader may have stored the entry after our caller's lookup.
    if let Some(hit) = cache.lookup(key).await? {
        return Ok(hit);
    }

    let staged = cache.staging_file()?;
    let probed = extractor(staged.to_path_buf()).await?;
    cache.store(key, staged, &probed).await
}

/// Clears the in-flight slot when the leader finishes or panics.
struct SlotGuard {
    in_flight: Arc<DashMap<CacheKey, Slot>>,
    key: CacheKey,
    rx: Slot,
}

impl Drop for SlotGuard {
    fn drop(&mut self) {
        self.in_flight
            .remove_if(&self.key, |_, slot| slot.same_channel(&self.rx));
    }
}
