//! Merged record views.
//!
//! The merged view of a record folds its sibling chain from the common base
//! record toward the requesting agency's own enrichment. Collections add
//! every ancestor reachable over parent edges, each merged the same way.

use std::collections::{BTreeMap, VecDeque};

use tracing::{debug, instrument, trace};

use rawrepo_core::Result;
use rawrepo_core::error::{InvalidInputError, MergeError, NotFoundError};
use rawrepo_core::types::{AgencyId, RecordId};
use rawrepo_core::{Record, RecordMerger, RecordStore, RecordVersion, RelationHints};

use crate::RawRepo;
use crate::cache::CacheKey;

impl<S, H, M> RawRepo<S, H, M>
where
    S: RecordStore,
    H: RelationHints,
    M: RecordMerger,
{
    /// The record `agency_id` sees for a bibliographic id, with every
    /// enrichment on its sibling chain applied.
    #[instrument(skip(self))]
    pub async fn fetch_merged_record(
        &self,
        bibliographic_record_id: &str,
        agency_id: AgencyId,
        fetch_deleted: bool,
    ) -> Result<Record> {
        let key = CacheKey {
            agency_id,
            fetch_deleted,
            merger: self.merger.cache_key(),
        };
        if self.config.cache_merges
            && let Some(cached) = self.cache.get(bibliographic_record_id, &key).await
        {
            trace!("Merged record served from cache");
            return Ok(cached);
        }

        let epoch = self.cache.epoch().await;
        let resolved = self
            .agency_for(bibliographic_record_id, agency_id, fetch_deleted)
            .await?;
        let chain = self
            .merge_chain(&RecordId::new(bibliographic_record_id, resolved))
            .await?;
        let merged = self.fold_chain(chain, agency_id)?;
        debug!(resolved, trail = merged.enrichment_trail(), "Merged record");

        if self.config.cache_merges {
            self.cache
                .insert(bibliographic_record_id, key, merged.clone(), epoch)
                .await;
        }
        Ok(merged)
    }

    /// The merged record plus every merged ancestor, keyed by bibliographic id.
    ///
    /// Ancestors are resolved for the requesting agency first and for their
    /// owning agency when the requester can't see them. Authority records
    /// are left out unless `include_authority` is set.
    #[instrument(skip(self))]
    pub async fn fetch_record_collection(
        &self,
        bibliographic_record_id: &str,
        agency_id: AgencyId,
        include_authority: bool,
    ) -> Result<BTreeMap<String, Record>> {
        let mut collection = BTreeMap::new();
        let mut pending = VecDeque::from([(bibliographic_record_id.to_string(), agency_id)]);

        while let Some((bib, owner)) = pending.pop_front() {
            if collection.contains_key(&bib) {
                continue;
            }

            let record = match self.fetch_merged_record(&bib, agency_id, false).await {
                Ok(record) => record,
                Err(e) if e.is_not_found() && owner != agency_id => {
                    trace!(bib = %bib, owner, "Ancestor not visible to requester");
                    self.fetch_merged_record(&bib, owner, false).await?
                }
                Err(e) => return Err(e),
            };

            for parent in self.chain_parents(record.id()).await? {
                if parent.agency_id() == self.config.authority_agency && !include_authority {
                    continue;
                }
                if !collection.contains_key(parent.bibliographic_record_id()) {
                    pending.push_back((
                        parent.bibliographic_record_id().to_string(),
                        parent.agency_id(),
                    ));
                }
            }

            collection.insert(bib, record);
        }

        debug!(size = collection.len(), "Collected records");
        Ok(collection)
    }

    /// The stored records of the sibling chain of `id`, common base first.
    pub(crate) async fn merge_chain(&self, id: &RecordId) -> Result<Vec<Record>> {
        let mut chain = Vec::new();
        for link in self.sibling_chain(id).await? {
            let record = self
                .store
                .get_record(&link)
                .await?
                .ok_or_else(|| NotFoundError::Record { id: link.clone() })?;
            chain.push(record);
        }
        chain.reverse();
        Ok(chain)
    }

    /// Fold a base-first chain into one record carrying the id of the last
    /// (least common) record.
    pub(crate) fn fold_chain(&self, chain: Vec<Record>, requested: AgencyId) -> Result<Record> {
        let contributors = chain.len();
        let mut links = chain.into_iter();
        let base = links.next().ok_or_else(|| InvalidInputError::Other {
            message: "cannot merge an empty chain".to_string(),
        })?;

        let mut id = base.id().clone();
        let mut merged = base.to_version()?;
        let mut trail = vec![id.agency_id().to_string()];

        for next in links {
            let next_mimetype = next.to_version()?.mimetype;
            if !self.merger.can_merge(merged.mimetype, next_mimetype) {
                return Err(MergeError::Incompatible {
                    base: merged.mimetype,
                    enrichment: next_mimetype,
                }
                .into());
            }

            let is_final = next.id().agency_id() == requested;
            merged = RecordVersion {
                content: self.merger.merge(&merged.content, next.content(), is_final)?,
                mimetype: self.merger.merged_mimetype(merged.mimetype, next_mimetype)?,
                deleted: next.is_deleted(),
                // Keeps the later creation time of the pair.
                created: merged.created.max(next.created()),
                tracking_id: if next.modified() >= merged.modified {
                    next.tracking_id().to_string()
                } else {
                    merged.tracking_id
                },
                modified: merged.modified.max(next.modified()),
            };
            id = next.id().clone();
            trail.push(id.agency_id().to_string());
        }

        Ok(Record::from_version(id, merged).with_enrichment_trail(trail.join(","), contributors > 1))
    }
}
