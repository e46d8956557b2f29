//! Thread-safe cache for fetched primary datasets.
//!
//! Entries are keyed by source identity (URL or path) and stamped with their
//! fetch time, so a table is reused only while it is fresh and only for the
//! source it came from. Nothing derived from a particular ZIP list is stored
//! here; every run still computes its own gaps and secondary lookups.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use tokio::sync::{Mutex, RwLock};

use crate::primary::PrimaryLookup;

struct CachedDataset {
    lookup: Arc<PrimaryLookup>,
    fetched_at: Instant,
}

impl CachedDataset {
    fn is_fresh(&self, ttl: Duration) -> bool {
        self.fetched_at.elapsed() < ttl
    }
}

/// Primary lookups shared across resolver clones.
///
/// Readers take the `RwLock` read side. Refreshes are serialized by a separate
/// mutex and re-check freshness once they hold it, so concurrent callers that
/// all find an entry stale trigger a single fetch.
#[derive(Clone)]
pub struct DatasetCache {
    entries: Arc<RwLock<HashMap<String, CachedDataset>>>,
    refresh_lock: Arc<Mutex<()>>,
    ttl: Duration,
}

impl DatasetCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            refresh_lock: Arc::new(Mutex::new(())),
            ttl,
        }
    }

    /// Cached lookup for `key` if present and not expired (read lock only)
    pub async fn get_fresh(&self, key: &str) -> Option<Arc<PrimaryLookup>> {
        let entries = self.entries.read().await;
        entries
            .get(key)
            .filter(|entry| entry.is_fresh(self.ttl))
            .map(|entry| Arc::clone(&entry.lookup))
    }

    /// Return the cached lookup for `key`, running `fetch` when it is missing
    /// or stale. A failed fetch leaves the cache untouched.
    pub async fn get_or_refresh<F, Fut>(&self, key: &str, fetch: F) -> Result<Arc<PrimaryLookup>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<PrimaryLookup>>,
    {
        if let Some(lookup) = self.get_fresh(key).await {
            tracing::debug!(key, "primary dataset cache hit");
            return Ok(lookup);
        }

        let _refresh = self.refresh_lock.lock().await;

        // Another task may have refreshed while we waited
        if let Some(lookup) = self.get_fresh(key).await {
            tracing::debug!(key, "primary dataset refreshed by another task");
            return Ok(lookup);
        }

        tracing::debug!(
            key,
            ttl_secs = self.ttl.as_secs(),
            "primary dataset cache miss, fetching"
        );
        let lookup = Arc::new(fetch().await?);

        let mut entries = self.entries.write().await;
        entries.insert(
            key.to_string(),
            CachedDataset {
                lookup: Arc::clone(&lookup),
                fetched_at: Instant::now(),
            },
        );
        Ok(lookup)
    }

    /// Drop one entry
    pub async fn invalidate(&self, key: &str) {
        let mut entries = self.entries.write().await;
        if entries.remove(key).is_some() {
            tracing::debug!(key, "primary dataset cache entry invalidated");
        }
    }

    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}

impl Default for DatasetCache {
    fn default() -> Self {
        Self::new(Duration::from_secs(3600))
    }
}
