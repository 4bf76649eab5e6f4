//! Session record cache
//!
//! Holds the most recent successful `list` result so repeated dashboard and
//! map requests do not hit the store. The snapshot is replaced only by an
//! explicit forced refresh or after it has been invalidated by a write.
//!
//! The snapshot belongs to the collection it was fetched from; asking for a
//! different collection fetches again and replaces it.
//!
//! Concurrent fetches are coalesced: one caller fetches while the others wait
//! on the fetch lock and then reuse the result.

use super::{CaseRecord, RecordStore, StoreResult};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

/// Records handed out by the cache
#[derive(Debug, Clone)]
pub struct CacheSnapshot {
    pub records: Arc<Vec<CaseRecord>>,
    pub fetched_at: DateTime<Utc>,
    /// True when no store round-trip was made for this call
    pub from_cache: bool,
}

/// Cache state for health/status output
#[derive(Debug, Clone, Serialize)]
pub struct CacheStatus {
    pub records: usize,
    pub last_fetched_at: Option<DateTime<Utc>>,
    pub fresh: bool,
}

#[derive(Debug, Default)]
struct CacheState {
    /// Collection the snapshot was listed from
    collection: String,
    data: Arc<Vec<CaseRecord>>,
    last_fetched_at: Option<DateTime<Utc>>,
    fresh: bool,
    /// Bumped on every invalidation
    generation: u64,
    /// Bumped on every completed fetch
    fetches: u64,
}

/// Session-scoped cache in front of [`RecordStore::list`]
pub struct RecordCache {
    state: RwLock<CacheState>,
    fetch_lock: Mutex<()>,
    max_age: Option<Duration>,
}

impl Default for RecordCache {
    fn default() -> Self {
        Self::new(None)
    }
}

impl RecordCache {
    /// Create an empty cache. `max_age` of `None` keeps snapshots until invalidated.
    pub fn new(max_age: Option<Duration>) -> Self {
        Self {
            state: RwLock::new(CacheState::default()),
            fetch_lock: Mutex::new(()),
            max_age,
        }
    }

    /// Get records, fetching from the store when the snapshot is missing,
    /// stale, or `force` is set.
    pub async fn get(
        &self,
        store: &dyn RecordStore,
        collection: &str,
        force: bool,
    ) -> StoreResult<CacheSnapshot> {
        if !force {
            if let Some(snapshot) = self.fresh_snapshot(collection).await {
                tracing::debug!(collection = %collection, "Using cached records");
                return Ok(snapshot);
            }
        }

        let fetches_seen = self.state.read().await.fetches;
        let _guard = self.fetch_lock.lock().await;

        // Another caller may have refreshed while we waited; a forced refresh
        // only reuses a fetch that completed after it started waiting
        if !force || self.state.read().await.fetches != fetches_seen {
            if let Some(snapshot) = self.fresh_snapshot(collection).await {
                tracing::debug!(collection = %collection, "Coalesced with in-flight fetch");
                return Ok(snapshot);
            }
        }

        let generation = self.state.read().await.generation;
        let records = match store.list(collection).await {
            Ok(records) => records,
            Err(e) => {
                tracing::warn!(collection = %collection, error = %e, "Record fetch failed");
                return Err(e);
            }
        };

        let now = Utc::now();
        let data = Arc::new(records);

        let mut state = self.state.write().await;
        state.collection = collection.to_string();
        state.data = Arc::clone(&data);
        state.last_fetched_at = Some(now);
        // A write landed during the fetch; the data may predate it
        state.fresh = state.generation == generation;
        state.fetches += 1;

        tracing::info!(
            collection = %collection,
            store = %store.name(),
            records = data.len(),
            "Fetched records"
        );

        Ok(CacheSnapshot {
            records: data,
            fetched_at: now,
            from_cache: false,
        })
    }

    /// Mark the snapshot stale; the next `get` fetches again
    pub async fn invalidate(&self) {
        let mut state = self.state.write().await;
        state.fresh = false;
        state.generation += 1;
    }

    pub async fn status(&self) -> CacheStatus {
        let state = self.state.read().await;
        CacheStatus {
            records: state.data.len(),
            last_fetched_at: state.last_fetched_at,
            fresh: self.is_fresh(&state),
        }
    }

    async fn fresh_snapshot(&self, collection: &str) -> Option<CacheSnapshot> {
        let state = self.state.read().await;
        if state.collection != collection || !self.is_fresh(&state) {
            return None;
        }

        state.last_fetched_at.map(|fetched_at| CacheSnapshot {
            records: Arc::clone(&state.data),
            fetched_at,
            from_cache: true,
        })
    }

    fn is_fresh(&self, state: &CacheState) -> bool {
        match (state.fresh, state.last_fetched_at, self.max_age) {
            (false, _, _) | (_, None, _) => false,
            (true, Some(_), None) => true,
            (true, Some(at), Some(max_age)) => Utc::now() - at <= max_age,
        }
    }
}
