//! Merged views stay consistent with writes that race a merge.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::Notify;

use rawrepo::{FieldOverlayMerger, RawRepo};
use rawrepo_core::types::AgencyId;
use rawrepo_core::{
    EnqueueJob, MemoryStore, MimeType, QueueFailure, QueueJob, QueueRule, Record, RecordId,
    RecordStore, RecordVersion, Result, StaticRelationHints,
};

/// A store that parks the first armed `get_record` after reading, until
/// released.
#[derive(Default)]
struct GatedStore {
    inner: MemoryStore,
    armed: AtomicBool,
    reached: Notify,
    release: Notify,
}

#[async_trait]
impl RecordStore for GatedStore {
    async fn get_record(&self, id: &RecordId) -> Result<Option<Record>> {
        let record = self.inner.get_record(id).await;
        if self.armed.swap(false, Ordering::SeqCst) {
            self.reached.notify_one();
            self.release.notified().await;
        }
        record
    }

    async fn put_record(&self, record: &Record) -> Result<Record> {
        self.inner.put_record(record).await
    }

    async fn purge_record(&self, id: &RecordId) -> Result<()> {
        self.inner.purge_record(id).await
    }

    async fn get_record_history(&self, id: &RecordId) -> Result<Vec<RecordVersion>> {
        self.inner.get_record_history(id).await
    }

    async fn agencies_for_bib_id(
        &self,
        bibliographic_record_id: &str,
    ) -> Result<BTreeSet<AgencyId>> {
        self.inner.agencies_for_bib_id(bibliographic_record_id).await
    }

    async fn agencies_for_bib_id_skip_deleted(
        &self,
        bibliographic_record_id: &str,
    ) -> Result<BTreeSet<AgencyId>> {
        self.inner
            .agencies_for_bib_id_skip_deleted(bibliographic_record_id)
            .await
    }

    async fn get_relations_from(&self, id: &RecordId) -> Result<BTreeSet<RecordId>> {
        self.inner.get_relations_from(id).await
    }

    async fn get_relations_children(&self, id: &RecordId) -> Result<BTreeSet<RecordId>> {
        self.inner.get_relations_children(id).await
    }

    async fn get_relations_siblings_to_me(&self, id: &RecordId) -> Result<BTreeSet<RecordId>> {
        self.inner.get_relations_siblings_to_me(id).await
    }

    async fn set_relations_from(&self, id: &RecordId, refers: &BTreeSet<RecordId>) -> Result<()> {
        self.inner.set_relations_from(id, refers).await
    }

    async fn delete_relations_from(&self, id: &RecordId) -> Result<()> {
        self.inner.delete_relations_from(id).await
    }

    async fn enqueue(&self, job: &EnqueueJob) -> Result<Vec<String>> {
        self.inner.enqueue(job).await
    }

    async fn dequeue_n(&self, worker: &str, count: usize) -> Result<Vec<QueueJob>> {
        self.inner.dequeue_n(worker, count).await
    }

    async fn queue_fail(&self, failure: &QueueFailure) -> Result<()> {
        self.inner.queue_fail(failure).await
    }

    async fn queue_rules(&self) -> Result<Vec<QueueRule>> {
        self.inner.queue_rules().await
    }

    async fn list_queue(&self, worker: &str) -> Result<Vec<QueueJob>> {
        self.inner.list_queue(worker).await
    }

    async fn queue_failures(&self, worker: &str) -> Result<Vec<QueueFailure>> {
        self.inner.queue_failures(worker).await
    }
}

fn record(content: &str) -> Record {
    Record::new(RecordId::new("b", 870970))
        .with_mimetype(MimeType::MarcXchange)
        .with_content(content.as_bytes().to_vec())
}

#[tokio::test]
async fn test_write_during_merge_is_not_masked() {
    let repo = RawRepo::new(
        GatedStore::default(),
        StaticRelationHints::new(vec![870970]),
        FieldOverlayMerger::default(),
    );
    repo.save_record(&record("245 one")).await.unwrap();
    repo.store().armed.store(true, Ordering::SeqCst);

    let (during, _) = tokio::join!(repo.fetch_merged_record("b", 870970, false), async {
        repo.store().reached.notified().await;
        repo.save_record(&record("245 two")).await.unwrap();
        repo.store().release.notify_one();
    });
    assert_eq!(during.unwrap().content(), b"245 one");

    let after = repo.fetch_merged_record("b", 870970, false).await.unwrap();
    assert_eq!(after.content(), b"245 two");
}

#[tokio::test]
async fn test_unchanged_work_served_again() {
    let repo = RawRepo::new(
        GatedStore::default(),
        StaticRelationHints::new(vec![870970]),
        FieldOverlayMerger::default(),
    );
    repo.save_record(&record("245 one")).await.unwrap();

    let first = repo.fetch_merged_record("b", 870970, false).await.unwrap();
    // Not re-read: a read would park on the gate for good.
    repo.store().armed.store(true, Ordering::SeqCst);
    let second = repo.fetch_merged_record("b", 870970, false).await.unwrap();
    assert_eq!(first.content(), second.content());
}
