//! Bounded LRU of converted splits.

use std::{
    num::NonZeroUsize,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use lru::LruCache;
use tracing::trace;

use super::RequestKey;
use crate::dataset::Split;

/// Memoised `gen_data` results.
///
/// The lock is held only for lookups and inserts, never while a result is
/// being computed, so concurrent misses on one key may both compute it; the
/// last insert wins.
#[derive(Debug)]
pub(super) struct MemoCache {
    entries: Mutex<LruCache<RequestKey, Arc<Split>>>,
}

impl MemoCache {
    pub(super) fn new(capacity: NonZeroUsize) -> Self {
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, LruCache<RequestKey, Arc<Split>>> {
        // Entries are inserted whole, so a poisoned lock still guards a
        // consistent cache.
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(super) fn get(&self, key: &RequestKey) -> Option<Arc<Split>> {
        let hit = self.lock().get(key).map(Arc::clone);
        if hit.is_some() {
            record_hit();
        } else {
            record_miss();
        }
        hit
    }

    pub(super) fn insert(&self, key: RequestKey, split: Arc<Split>) {
        let displaced = self.lock().push(key, split);
        if let Some((evicted, _)) = displaced {
            if evicted != key {
                trace!(?evicted, "memo eviction");
                record_eviction();
            }
        }
    }

    pub(super) fn len(&self) -> usize {
        self.lock().len()
    }
}

#[cfg(feature = "metrics")]
fn record_hit() {
    metrics::counter!("benchdata_memo_hits").increment(1);
}

#[cfg(not(feature = "metrics"))]
const fn record_hit() {}

#[cfg(feature = "metrics")]
fn record_miss() {
    metrics::counter!("benchdata_memo_misses").increment(1);
}

#[cfg(not(feature = "metrics"))]
const fn record_miss() {}

#[cfg(feature = "metrics")]
fn record_eviction() {
    metrics::counter!("benchdata_memo_evictions").increment(1);
}

#[cfg(not(feature = "metrics"))]
const fn record_eviction() {}
