//! The engine type and record lifecycle operations.

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, instrument, trace};

use rawrepo_core::Result;
use rawrepo_core::error::NotFoundError;
use rawrepo_core::types::{AgencyId, MimeType, RecordId};
use rawrepo_core::{Record, RecordMerger, RecordMetaData, RecordStore, RelationHints};

use crate::cache::MergeCache;
use crate::config::EngineConfig;

/// A record repository built from a store, relation hints and a merger.
///
/// All collaborators are fixed at construction. The engine itself only
/// holds the merge memo, which every write and enqueue invalidates.
pub struct RawRepo<S, H, M> {
    pub(crate) store: S,
    pub(crate) hints: H,
    pub(crate) merger: M,
    pub(crate) config: EngineConfig,
    pub(crate) cache: MergeCache,
}

impl<S, H, M> RawRepo<S, H, M>
where
    S: RecordStore,
    H: RelationHints,
    M: RecordMerger,
{
    pub fn new(store: S, hints: H, merger: M) -> Self {
        Self::with_config(store, hints, merger, EngineConfig::default())
    }

    pub fn with_config(store: S, hints: H, merger: M, config: EngineConfig) -> Self {
        let cache = MergeCache::new(config.merge_cache_capacity);
        Self {
            store,
            hints,
            merger,
            config,
            cache,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn hints(&self) -> &H {
        &self.hints
    }

    pub fn merger(&self) -> &M {
        &self.merger
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // ========================================================================
    // Record Lifecycle
    // ========================================================================

    /// True when a live (not deleted) record exists.
    pub async fn record_exists(&self, bibliographic_record_id: &str, agency_id: AgencyId) -> Result<bool> {
        let id = RecordId::new(bibliographic_record_id, agency_id);
        Ok(self
            .store
            .get_record(&id)
            .await?
            .is_some_and(|r| !r.is_deleted()))
    }

    /// True when a record exists, tombstones included.
    pub async fn record_exists_maybe_deleted(
        &self,
        bibliographic_record_id: &str,
        agency_id: AgencyId,
    ) -> Result<bool> {
        let id = RecordId::new(bibliographic_record_id, agency_id);
        Ok(self.store.get_record(&id).await?.is_some())
    }

    /// The stored record, or an unsaved placeholder when there is none.
    pub async fn fetch_record(&self, bibliographic_record_id: &str, agency_id: AgencyId) -> Result<Record> {
        let id = RecordId::new(bibliographic_record_id, agency_id);
        match self.store.get_record(&id).await? {
            Some(record) => Ok(record),
            None => {
                debug!(record = %id, "Created placeholder record");
                Ok(Record::new(id))
            }
        }
    }

    /// Persist a record, returning the stored value.
    #[instrument(skip(self, record), fields(record = %record.id()))]
    pub async fn save_record(&self, record: &Record) -> Result<Record> {
        // Reject before touching the store.
        record.to_version()?;
        // History is addressed by `modified`, so a version may not reuse the
        // current one's timestamp.
        let saved = match self.store.get_record(record.id()).await? {
            Some(current) if current.modified() == record.modified() => {
                let modified = Utc::now().max(current.modified() + Duration::microseconds(1));
                trace!(%modified, "Advanced modified past the stored version");
                self.store
                    .put_record(&record.clone().with_modified(modified))
                    .await?
            }
            _ => self.store.put_record(record).await?,
        };
        self.cache.invalidate(saved.id()).await;
        debug!(mimetype = ?saved.mimetype(), deleted = saved.is_deleted(), "Saved record");
        Ok(saved)
    }

    /// Replace a record with an empty tombstone and drop its outbound relations.
    #[instrument(skip(self))]
    pub async fn delete_record(&self, id: &RecordId) -> Result<Record> {
        let record = self
            .store
            .get_record(id)
            .await?
            .ok_or_else(|| NotFoundError::Record { id: id.clone() })?;

        let tombstone = record.with_content(Vec::new()).with_deleted(true);
        let saved = self.store.put_record(&tombstone).await?;
        self.store.delete_relations_from(id).await?;
        self.cache.invalidate(id).await;
        debug!("Deleted record");
        Ok(saved)
    }

    /// Remove every trace of a record from the store.
    #[instrument(skip(self))]
    pub async fn purge_record(&self, id: &RecordId) -> Result<()> {
        self.store.purge_record(id).await?;
        self.cache.invalidate(id).await;
        debug!("Purged record");
        Ok(())
    }

    pub async fn get_mimetype_of(&self, bibliographic_record_id: &str, agency_id: AgencyId) -> Result<MimeType> {
        let id = RecordId::new(bibliographic_record_id, agency_id);
        let record = self
            .store
            .get_record(&id)
            .await?
            .ok_or_else(|| NotFoundError::Record { id: id.clone() })?;
        record
            .mimetype()
            .ok_or_else(|| NotFoundError::Record { id }.into())
    }

    // ========================================================================
    // History
    // ========================================================================

    /// Every saved version, newest first.
    pub async fn get_record_history(&self, id: &RecordId) -> Result<Vec<RecordMetaData>> {
        let versions = self.store.get_record_history(id).await?;
        Ok(versions
            .iter()
            .map(|version| RecordMetaData::of(id, version))
            .collect())
    }

    /// The record as it was saved at `meta.modified`.
    pub async fn get_historic_record(&self, meta: &RecordMetaData) -> Result<Record> {
        let versions = self.store.get_record_history(&meta.id).await?;
        versions
            .into_iter()
            .find(|version| version.modified == meta.modified)
            .map(|version| Record::from_version(meta.id.clone(), version))
            .ok_or_else(|| {
                NotFoundError::HistoricVersion {
                    id: meta.id.clone(),
                    modified: meta.modified,
                }
                .into()
            })
    }

    /// Tracking ids of the versions modified at or after `since`, oldest first.
    pub async fn get_tracking_ids_since(
        &self,
        id: &RecordId,
        since: DateTime<Utc>,
    ) -> Result<Vec<String>> {
        let mut versions = self.store.get_record_history(id).await?;
        versions.retain(|version| version.modified >= since);
        versions.sort_by_key(|version| version.modified);

        let mut tracking_ids: Vec<String> = Vec::new();
        for version in versions {
            if !version.tracking_id.is_empty() && !tracking_ids.contains(&version.tracking_id) {
                tracking_ids.push(version.tracking_id);
            }
        }
        Ok(tracking_ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rawrepo_core::{MemoryStore, StaticRelationHints};

    use crate::merger::FieldOverlayMerger;

    fn repo() -> RawRepo<MemoryStore, StaticRelationHints, FieldOverlayMerger> {
        RawRepo::new(
            MemoryStore::new(),
            StaticRelationHints::new(vec![870970]),
            FieldOverlayMerger::default(),
        )
    }

    #[tokio::test]
    async fn test_placeholder_lifecycle() {
        let repo = repo();
        let placeholder = repo.fetch_record("abc", 870970).await.unwrap();
        assert!(placeholder.is_original());
        assert!(placeholder.content().is_empty());

        let saved = repo
            .save_record(
                &placeholder
                    .with_mimetype(MimeType::MarcXchange)
                    .with_content(b"245 title".to_vec()),
            )
            .await
            .unwrap();
        assert!(!saved.is_original());

        let again = repo.fetch_record("abc", 870970).await.unwrap();
        assert!(!again.is_original());
        assert_eq!(again.created(), saved.created());

        let resaved = repo
            .save_record(&again.with_content(b"245 other".to_vec()))
            .await
            .unwrap();
        assert_eq!(resaved.created(), saved.created());
        assert!(resaved.modified() >= saved.modified());
    }

    #[tokio::test]
    async fn test_save_requires_mimetype() {
        let repo = repo();
        let placeholder = repo.fetch_record("abc", 870970).await.unwrap();
        assert!(repo.save_record(&placeholder).await.is_err());
        assert!(!repo.record_exists_maybe_deleted("abc", 870970).await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_leaves_tombstone() {
        let repo = repo();
        let record = Record::new(RecordId::new("abc", 191919))
            .with_mimetype(MimeType::Enrichment)
            .with_content(b"001 x".to_vec());
        repo.save_record(&record).await.unwrap();

        let tombstone = repo.delete_record(record.id()).await.unwrap();
        assert!(tombstone.is_deleted());
        assert!(tombstone.content().is_empty());
        assert!(!repo.record_exists("abc", 191919).await.unwrap());
        assert!(repo.record_exists_maybe_deleted("abc", 191919).await.unwrap());

        repo.purge_record(record.id()).await.unwrap();
        assert!(!repo.record_exists_maybe_deleted("abc", 191919).await.unwrap());
    }

    #[tokio::test]
    async fn test_history_and_historic_record() {
        let repo = repo();
        let base = Utc::now() - Duration::hours(3);
        let id = RecordId::new("abc", 870970);

        for (i, tracking) in ["t1", "t2", "t2", "t3"].iter().enumerate() {
            let record = repo
                .fetch_record("abc", 870970)
                .await
                .unwrap()
                .with_mimetype(MimeType::MarcXchange)
                .with_content(format!("245 v{}", i).into_bytes())
                .with_modified(base + Duration::hours(i as i64))
                .with_tracking_id(*tracking);
            repo.save_record(&record).await.unwrap();
        }

        let history = repo.get_record_history(&id).await.unwrap();
        assert_eq!(history.len(), 4);
        assert!(history.windows(2).all(|w| w[0].modified > w[1].modified));
        assert_eq!(history[0].tracking_id, "t3");

        let oldest = repo.get_historic_record(&history[3]).await.unwrap();
        assert_eq!(oldest.content(), b"245 v0");

        let ids = repo
            .get_tracking_ids_since(&id, base + Duration::hours(1))
            .await
            .unwrap();
        assert_eq!(ids, vec!["t2", "t3"]);
    }

    #[tokio::test]
    async fn test_resave_keeps_versions_apart() {
        let repo = repo();
        let id = RecordId::new("abc", 870970);
        let first = repo
            .fetch_record("abc", 870970)
            .await
            .unwrap()
            .with_mimetype(MimeType::MarcXchange)
            .with_content(b"245 v0".to_vec())
            .with_tracking_id("t1");
        let first = repo.save_record(&first).await.unwrap();

        let second = repo
            .fetch_record("abc", 870970)
            .await
            .unwrap()
            .with_tracking_id("t2");
        let second = repo.save_record(&second).await.unwrap();
        assert!(second.modified() > first.modified());

        let history = repo.get_record_history(&id).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].tracking_id, "t2");
        let older = repo.get_historic_record(&history[1]).await.unwrap();
        assert_eq!(older.tracking_id(), "t1");
        assert_eq!(older.content(), b"245 v0");
    }

    #[tokio::test]
    async fn test_mimetype_of_missing_record() {
        let repo = repo();
        let err = repo.get_mimetype_of("nope", 870970).await.unwrap_err();
        assert!(err.is_not_found());
    }
}
