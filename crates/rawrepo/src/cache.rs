//! Memo of merged records.
//!
//! Entries are grouped by bibliographic id. Any write or enqueue touching one
//! agency's copy of a work drops every merged view of that work, since the
//! sibling chain behind a view can cross agencies.
//!
//! A view is computed outside the lock, so a write may land while it is being
//! built. Every invalidation advances an epoch, and a view is only stored
//! when no invalidation happened since its computation started.

use std::collections::HashMap;
use std::num::NonZeroUsize;

use lru::LruCache;
use tokio::sync::Mutex;
use tracing::trace;

use rawrepo_core::Record;
use rawrepo_core::types::{AgencyId, RecordId};

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub(crate) struct CacheKey {
    pub agency_id: AgencyId,
    pub fetch_deleted: bool,
    pub merger: String,
}

/// Token taken before a view is computed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Epoch(u64);

struct State {
    works: LruCache<String, HashMap<CacheKey, Record>>,
    epoch: u64,
}

pub(crate) struct MergeCache {
    state: Mutex<State>,
}

impl MergeCache {
    /// Keep the views of at most `capacity` works, least recently used out first.
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            state: Mutex::new(State {
                works: LruCache::new(capacity),
                epoch: 0,
            }),
        }
    }

    pub async fn epoch(&self) -> Epoch {
        Epoch(self.state.lock().await.epoch)
    }

    pub async fn get(&self, bibliographic_record_id: &str, key: &CacheKey) -> Option<Record> {
        let mut state = self.state.lock().await;
        state
            .works
            .get(bibliographic_record_id)
            .and_then(|views| views.get(key))
            .cloned()
    }

    /// Store a view computed since `since`. Returns false, storing nothing,
    /// when an invalidation happened in between.
    pub async fn insert(
        &self,
        bibliographic_record_id: &str,
        key: CacheKey,
        record: Record,
        since: Epoch,
    ) -> bool {
        let mut state = self.state.lock().await;
        if state.epoch != since.0 {
            trace!(bib = bibliographic_record_id, "Discarded merged view built across a write");
            return false;
        }
        if let Some(views) = state.works.get_mut(bibliographic_record_id) {
            views.insert(key, record);
        } else {
            let views = HashMap::from([(key, record)]);
            if let Some((evicted, _)) = state.works.push(bibliographic_record_id.to_string(), views) {
                trace!(bib = %evicted, "Evicted merged views");
            }
        }
        true
    }

    pub async fn invalidate(&self, id: &RecordId) {
        let mut state = self.state.lock().await;
        state.epoch += 1;
        if let Some(views) = state.works.pop(id.bibliographic_record_id()) {
            trace!(record = %id, dropped = views.len(), "Invalidated merged views");
        }
    }

    #[cfg(test)]
    pub async fn len(&self) -> usize {
        self.state.lock().await.works.iter().map(|(_, views)| views.len()).sum()
    }
}
