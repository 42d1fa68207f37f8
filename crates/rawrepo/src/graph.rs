//! Relation graph traversal.
//!
//! Thin set-returning wrappers over the store's edges, plus the agency
//! resolution rules every other component builds on. A missing record is
//! never an error here; it just has no edges.

use std::collections::{BTreeSet, HashSet};

use tracing::{instrument, trace};

use rawrepo_core::Result;
use rawrepo_core::error::{CircularRelationError, NotFoundError};
use rawrepo_core::types::{AgencyId, RecordId};
use rawrepo_core::{RecordMerger, RecordStore, RelationHints};

use crate::RawRepo;

impl<S, H, M> RawRepo<S, H, M>
where
    S: RecordStore,
    H: RelationHints,
    M: RecordMerger,
{
    pub async fn get_relations_from(&self, id: &RecordId) -> Result<BTreeSet<RecordId>> {
        self.store.get_relations_from(id).await
    }

    pub async fn get_relations_parents(&self, id: &RecordId) -> Result<BTreeSet<RecordId>> {
        self.store.get_relations_parents(id).await
    }

    pub async fn get_relations_children(&self, id: &RecordId) -> Result<BTreeSet<RecordId>> {
        self.store.get_relations_children(id).await
    }

    pub async fn get_relations_siblings_to_me(&self, id: &RecordId) -> Result<BTreeSet<RecordId>> {
        self.store.get_relations_siblings_to_me(id).await
    }

    pub async fn get_relations_siblings_from_me(&self, id: &RecordId) -> Result<BTreeSet<RecordId>> {
        self.store.get_relations_siblings_from_me(id).await
    }

    pub async fn agencies_for(&self, bibliographic_record_id: &str) -> Result<BTreeSet<AgencyId>> {
        self.store.agencies_for_bib_id(bibliographic_record_id).await
    }

    pub async fn agencies_for_skip_deleted(
        &self,
        bibliographic_record_id: &str,
    ) -> Result<BTreeSet<AgencyId>> {
        self.store
            .agencies_for_bib_id_skip_deleted(bibliographic_record_id)
            .await
    }

    /// Validate and then replace the outbound edges of `id`.
    ///
    /// A rejected set leaves the existing edges untouched.
    #[instrument(skip(self, refers), fields(count = refers.len()))]
    pub async fn set_relations_from(&self, id: &RecordId, refers: &BTreeSet<RecordId>) -> Result<()> {
        self.validate_relations(id, refers).await?;
        self.store.set_relations_from(id, refers).await?;
        self.cache.invalidate(id).await;
        trace!("Replaced relations");
        Ok(())
    }

    pub async fn delete_relations_from(&self, id: &RecordId) -> Result<()> {
        self.store.delete_relations_from(id).await?;
        self.cache.invalidate(id).await;
        Ok(())
    }

    // ========================================================================
    // Agency Resolution
    // ========================================================================

    /// The agency whose record `agency_id` sees for this bibliographic id.
    ///
    /// The agency's own record wins. Agencies that enrich a common
    /// catalogue then fall back along their priority list.
    pub async fn agency_for(
        &self,
        bibliographic_record_id: &str,
        agency_id: AgencyId,
        fetch_deleted: bool,
    ) -> Result<AgencyId> {
        let holders = if fetch_deleted {
            self.agencies_for(bibliographic_record_id).await?
        } else {
            self.agencies_for_skip_deleted(bibliographic_record_id).await?
        };

        if holders.contains(&agency_id) {
            return Ok(agency_id);
        }

        if self.hints.uses_common_agency(agency_id).await? {
            for candidate in self.hints.agency_priority(agency_id).await? {
                if holders.contains(&candidate) {
                    return Ok(candidate);
                }
            }
        }

        Err(no_candidate(bibliographic_record_id, agency_id))
    }

    /// The agency holding the record that `agency_id` relates to as a sibling.
    pub async fn find_sibling_relation_agency(
        &self,
        bibliographic_record_id: &str,
        agency_id: AgencyId,
    ) -> Result<AgencyId> {
        for candidate in self.hints.agency_priority(agency_id).await? {
            if self.record_exists(bibliographic_record_id, candidate).await? {
                return Ok(candidate);
            }
        }
        Err(no_candidate(bibliographic_record_id, agency_id))
    }

    /// The agency whose record carries the parent relations `agency_id` sees.
    pub async fn find_parent_relation_agency(
        &self,
        bibliographic_record_id: &str,
        agency_id: AgencyId,
    ) -> Result<AgencyId> {
        if !self.hints.uses_common_agency(agency_id).await? {
            return Ok(agency_id);
        }
        for candidate in self.hints.agency_priority(agency_id).await? {
            if self.record_exists(bibliographic_record_id, candidate).await? {
                return Ok(candidate);
            }
        }
        if self.record_exists(bibliographic_record_id, agency_id).await? {
            return Ok(agency_id);
        }
        Err(no_candidate(bibliographic_record_id, agency_id))
    }

    // ========================================================================
    // Chains
    // ========================================================================

    /// `id` followed by the records reached over sibling-from-me edges, least
    /// common first.
    pub(crate) async fn sibling_chain(&self, id: &RecordId) -> Result<Vec<RecordId>> {
        let mut chain = vec![id.clone()];
        let mut seen = HashSet::from([id.agency_id()]);
        let mut current = id.clone();

        while let Some(next) = self
            .store
            .get_relations_siblings_from_me(&current)
            .await?
            .into_iter()
            .next()
        {
            let looped = !seen.insert(next.agency_id());
            chain.push(next.clone());
            if looped {
                return Err(CircularRelationError { path: chain }.into());
            }
            current = next;
        }
        Ok(chain)
    }

    /// Parent edges of every record in the sibling chain of `id`.
    ///
    /// Enrichments carry no hierarchy of their own, so the parents a record
    /// sees usually sit on the end of its chain.
    pub(crate) async fn chain_parents(&self, id: &RecordId) -> Result<BTreeSet<RecordId>> {
        let mut parents = BTreeSet::new();
        for link in self.sibling_chain(id).await? {
            parents.extend(self.store.get_relations_parents(&link).await?);
        }
        Ok(parents)
    }
}

fn no_candidate(bibliographic_record_id: &str, agency_id: AgencyId) -> rawrepo_core::Error {
    NotFoundError::NoCandidateAgency {
        bibliographic_record_id: bibliographic_record_id.to_string(),
        agency_id,
    }
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rawrepo_core::{MemoryStore, MimeType, Record, StaticRelationHints};

    use crate::merger::FieldOverlayMerger;

    type Repo = RawRepo<MemoryStore, StaticRelationHints, FieldOverlayMerger>;

    async fn repo_with(records: &[(&str, AgencyId, MimeType)], hints: StaticRelationHints) -> Repo {
        let repo = RawRepo::new(MemoryStore::new(), hints, FieldOverlayMerger::default());
        for (bib, agency, mimetype) in records {
            let record = Record::new(RecordId::new(*bib, *agency)).with_mimetype(*mimetype);
            repo.store().put_record(&record).await.unwrap();
        }
        repo
    }

    #[tokio::test]
    async fn test_agency_for_prefers_own_record() {
        let repo = repo_with(
            &[
                ("b", 870970, MimeType::MarcXchange),
                ("b", 191919, MimeType::Enrichment),
            ],
            StaticRelationHints::new(vec![870970]),
        )
        .await;

        assert_eq!(repo.agency_for("b", 191919, false).await.unwrap(), 191919);
        assert_eq!(repo.agency_for("b", 123456, false).await.unwrap(), 870970);
        assert!(repo.agency_for("x", 123456, false).await.is_err());
    }

    #[tokio::test]
    async fn test_agency_for_honors_deleted_flag() {
        let repo = repo_with(&[("b", 870970, MimeType::MarcXchange)], StaticRelationHints::new(vec![870970])).await;
        let tombstone = Record::new(RecordId::new("b", 870970))
            .with_mimetype(MimeType::MarcXchange)
            .with_deleted(true);
        repo.store().put_record(&tombstone).await.unwrap();

        assert!(repo.agency_for("b", 870970, false).await.unwrap_err().is_not_found());
        assert_eq!(repo.agency_for("b", 870970, true).await.unwrap(), 870970);
    }

    #[tokio::test]
    async fn test_agency_without_common_stays_local() {
        let repo = repo_with(
            &[("b", 870970, MimeType::MarcXchange)],
            StaticRelationHints::new(vec![870970]).without_common(777777),
        )
        .await;

        assert!(repo.agency_for("b", 777777, false).await.is_err());
        assert_eq!(repo.find_parent_relation_agency("b", 777777).await.unwrap(), 777777);
        assert_eq!(repo.find_parent_relation_agency("b", 191919).await.unwrap(), 870970);
    }

    #[tokio::test]
    async fn test_find_parent_relation_agency_falls_back_to_own() {
        let repo = repo_with(
            &[("b", 191919, MimeType::MarcXchange)],
            StaticRelationHints::new(vec![870970]).with_override(191919, vec![870970]),
        )
        .await;

        assert_eq!(repo.find_parent_relation_agency("b", 191919).await.unwrap(), 191919);
        assert!(repo.find_sibling_relation_agency("b", 191919).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_sibling_chain_detects_loops() {
        let repo = repo_with(
            &[("b", 1, MimeType::Enrichment), ("b", 2, MimeType::Enrichment)],
            StaticRelationHints::new(vec![870970]),
        )
        .await;
        repo.store()
            .set_relations_from(&RecordId::new("b", 1), &BTreeSet::from([RecordId::new("b", 2)]))
            .await
            .unwrap();
        repo.store()
            .set_relations_from(&RecordId::new("b", 2), &BTreeSet::from([RecordId::new("b", 1)]))
            .await
            .unwrap();

        let err = repo.sibling_chain(&RecordId::new("b", 1)).await.unwrap_err();
        assert!(matches!(err, rawrepo_core::Error::CircularRelation(_)));
    }
}
