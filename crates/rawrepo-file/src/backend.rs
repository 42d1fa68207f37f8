//! [`RecordStore`] over the filesystem layout.

use std::collections::BTreeSet;

use async_trait::async_trait;

use rawrepo_core::{
    AgencyId, EnqueueJob, QueueFailure, QueueJob, QueueRule, Record, RecordId, RecordStore,
    RecordVersion, Result,
};

use crate::store::FileStore;

#[async_trait]
impl RecordStore for FileStore {
    async fn get_record(&self, id: &RecordId) -> Result<Option<Record>> {
        Ok(self
            .current(id)?
            .map(|version| Record::from_version(id.clone(), version)))
    }

    async fn put_record(&self, record: &Record) -> Result<Record> {
        let version = self.append_version(record.id(), record.to_version()?)?;
        Ok(Record::from_version(record.id().clone(), version))
    }

    async fn purge_record(&self, id: &RecordId) -> Result<()> {
        self.remove_record(id)
    }

    async fn get_record_history(&self, id: &RecordId) -> Result<Vec<RecordVersion>> {
        let mut versions = self.versions(id)?;
        versions.reverse();
        versions.sort_by(|a, b| b.modified.cmp(&a.modified));
        Ok(versions)
    }

    async fn agencies_for_bib_id(&self, bibliographic_record_id: &str) -> Result<BTreeSet<AgencyId>> {
        self.agencies(bibliographic_record_id, false)
    }

    async fn agencies_for_bib_id_skip_deleted(
        &self,
        bibliographic_record_id: &str,
    ) -> Result<BTreeSet<AgencyId>> {
        self.agencies(bibliographic_record_id, true)
    }

    async fn get_relations_from(&self, id: &RecordId) -> Result<BTreeSet<RecordId>> {
        self.outbound(id)
    }

    async fn get_relations_children(&self, id: &RecordId) -> Result<BTreeSet<RecordId>> {
        self.inbound(id, false)
    }

    async fn get_relations_siblings_to_me(&self, id: &RecordId) -> Result<BTreeSet<RecordId>> {
        self.inbound(id, true)
    }

    async fn set_relations_from(&self, id: &RecordId, refers: &BTreeSet<RecordId>) -> Result<()> {
        self.set_outbound(id, refers)
    }

    async fn delete_relations_from(&self, id: &RecordId) -> Result<()> {
        self.set_outbound(id, &BTreeSet::new())
    }

    async fn enqueue(&self, job: &EnqueueJob) -> Result<Vec<String>> {
        self.push_job(job)
    }

    async fn dequeue_n(&self, worker: &str, count: usize) -> Result<Vec<QueueJob>> {
        self.take_jobs(worker, count)
    }

    async fn queue_fail(&self, failure: &QueueFailure) -> Result<()> {
        self.append_failure(failure)
    }

    async fn queue_rules(&self) -> Result<Vec<QueueRule>> {
        self.rules()
    }

    async fn list_queue(&self, worker: &str) -> Result<Vec<QueueJob>> {
        self.pending_jobs(worker)
    }

    async fn queue_failures(&self, worker: &str) -> Result<Vec<QueueFailure>> {
        self.failures(worker)
    }
}
