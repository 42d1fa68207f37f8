//! Authority expansion.

use std::collections::BTreeMap;

use tracing::{debug, instrument};

use rawrepo_core::Result;
use rawrepo_core::error::NotFoundError;
use rawrepo_core::types::RecordId;
use rawrepo_core::{FieldExpander, Record, RecordMerger, RecordStore, RelationHints};

use crate::RawRepo;

impl<S, H, M> RawRepo<S, H, M>
where
    S: RecordStore,
    H: RelationHints,
    M: RecordMerger,
{
    /// Inline the authority records linked from `record` (or from the
    /// record on its sibling chain that carries the links).
    ///
    /// Records that don't exist in the store, or that have no record with
    /// authority links behind them, come back unchanged.
    #[instrument(skip(self, record, expander), fields(record = %record.id()))]
    pub async fn expand_record<E>(
        &self,
        record: Record,
        expander: &E,
        keep_authority_fields: bool,
    ) -> Result<Record>
    where
        E: FieldExpander + ?Sized,
    {
        let id = record.id().clone();
        if !self
            .record_exists(id.bibliographic_record_id(), id.agency_id())
            .await?
        {
            return Ok(record);
        }

        let Some(expandable) = self.find_expandable(&id).await? else {
            debug!("No record with authority links");
            return Ok(record);
        };

        let mut authorities = BTreeMap::new();
        for parent in self.store.get_relations_parents(&expandable).await? {
            if parent.agency_id() != self.config.authority_agency {
                continue;
            }
            let authority = self
                .store
                .get_record(&parent)
                .await?
                .ok_or_else(|| NotFoundError::Record { id: parent.clone() })?;
            authorities.insert(parent.bibliographic_record_id().to_string(), authority);
        }

        if authorities.is_empty() {
            return Ok(record);
        }

        let content = expander.expand(record.content(), &authorities, keep_authority_fields)?;
        debug!(expandable = %expandable, authorities = authorities.len(), "Expanded record");
        Ok(record.with_content(content))
    }

    async fn find_expandable(&self, id: &RecordId) -> Result<Option<RecordId>> {
        Ok(self
            .sibling_chain(id)
            .await?
            .into_iter()
            .find(|link| self.config.expandable_agencies.contains(&link.agency_id())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rawrepo_core::{MemoryStore, MimeType, StaticRelationHints};
    use std::collections::BTreeSet;

    use crate::merger::FieldOverlayMerger;

    /// Appends `<bib>=<first line of authority>` for every authority.
    struct Inline;

    impl FieldExpander for Inline {
        fn expand(
            &self,
            content: &[u8],
            authorities: &BTreeMap<String, Record>,
            keep_authority_fields: bool,
        ) -> Result<Vec<u8>> {
            let mut out = String::from_utf8_lossy(content).trim_end().to_string();
            for (bib, authority) in authorities {
                let text = String::from_utf8_lossy(authority.content());
                out.push_str(&format!("\n{}={}", bib, text.lines().next().unwrap_or_default()));
            }
            if keep_authority_fields {
                out.push_str("\nkept");
            }
            Ok(out.into_bytes())
        }
    }

    type Repo = RawRepo<MemoryStore, StaticRelationHints, FieldOverlayMerger>;

    async fn fixture() -> Repo {
        let repo = RawRepo::new(
            MemoryStore::new(),
            StaticRelationHints::new(vec![870970]),
            FieldOverlayMerger::default(),
        );
        for (bib, agency, mimetype, content) in [
            ("b", 870970, MimeType::MarcXchange, "245 base"),
            ("b", 191919, MimeType::Enrichment, "245 local"),
            ("aut1", 870979, MimeType::Authority, "100 Andersen"),
        ] {
            let record = Record::new(RecordId::new(bib, agency))
                .with_mimetype(mimetype)
                .with_content(content.as_bytes().to_vec());
            repo.store().put_record(&record).await.unwrap();
        }
        repo.store()
            .set_relations_from(
                &RecordId::new("b", 870970),
                &BTreeSet::from([RecordId::new("aut1", 870979)]),
            )
            .await
            .unwrap();
        repo.store()
            .set_relations_from(
                &RecordId::new("b", 191919),
                &BTreeSet::from([RecordId::new("b", 870970)]),
            )
            .await
            .unwrap();
        repo
    }

    #[tokio::test]
    async fn test_expands_through_sibling() {
        let repo = fixture().await;
        let merged = repo.fetch_merged_record("b", 191919, false).await.unwrap();
        let expanded = repo.expand_record(merged, &Inline, false).await.unwrap();
        assert_eq!(
            String::from_utf8(expanded.content().to_vec()).unwrap(),
            "245 local\naut1=100 Andersen"
        );
    }

    #[tokio::test]
    async fn test_keep_flag_reaches_expander() {
        let repo = fixture().await;
        let record = repo.fetch_record("b", 870970).await.unwrap();
        let expanded = repo.expand_record(record, &Inline, true).await.unwrap();
        assert!(expanded.content().ends_with(b"kept"));
    }

    #[tokio::test]
    async fn test_unsaved_record_untouched() {
        let repo = fixture().await;
        let placeholder = repo.fetch_record("new", 870970).await.unwrap();
        let expanded = repo.expand_record(placeholder.clone(), &Inline, false).await.unwrap();
        assert_eq!(expanded, placeholder);
    }

    #[tokio::test]
    async fn test_no_expandable_agency_is_noop() {
        let repo = fixture().await;
        let local = Record::new(RecordId::new("x", 191919))
            .with_mimetype(MimeType::MarcXchange)
            .with_content(b"245 own".to_vec());
        let local = repo.store().put_record(&local).await.unwrap();
        let expanded = repo.expand_record(local.clone(), &Inline, false).await.unwrap();
        assert_eq!(expanded.content(), local.content());
    }
}
