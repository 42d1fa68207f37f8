//! Durable storage boundary.

use std::collections::BTreeSet;

use async_trait::async_trait;

use crate::Result;
use crate::queue::{EnqueueJob, QueueFailure, QueueJob, QueueRule};
use crate::record::{Record, RecordVersion};
use crate::types::{AgencyId, RecordId};

/// Records, relation edges and the job queue.
///
/// Implementations own the concurrency guarantees: `dequeue_n` must never
/// hand the same job to two callers, and the priority-min update in
/// `enqueue` must be atomic per `(record, worker)`.
#[async_trait]
pub trait RecordStore: Send + Sync {
    // Records

    /// The stored record, live or deleted.
    async fn get_record(&self, id: &RecordId) -> Result<Option<Record>>;

    /// Persist a record and return the stored value.
    ///
    /// The first `created` ever stored is kept. Every call adds a version to
    /// the record's history.
    async fn put_record(&self, record: &Record) -> Result<Record>;

    /// Remove a record, its history and its outbound relations.
    async fn purge_record(&self, id: &RecordId) -> Result<()>;

    /// Every saved version, newest `modified` first.
    async fn get_record_history(&self, id: &RecordId) -> Result<Vec<RecordVersion>>;

    /// Agencies holding the bibliographic id, tombstones included.
    async fn agencies_for_bib_id(&self, bibliographic_record_id: &str)
    -> Result<BTreeSet<AgencyId>>;

    /// Agencies holding a live record for the bibliographic id.
    async fn agencies_for_bib_id_skip_deleted(
        &self,
        bibliographic_record_id: &str,
    ) -> Result<BTreeSet<AgencyId>>;

    // Relations

    /// All outbound edges.
    async fn get_relations_from(&self, id: &RecordId) -> Result<BTreeSet<RecordId>>;

    /// Inbound edges from other works.
    async fn get_relations_children(&self, id: &RecordId) -> Result<BTreeSet<RecordId>>;

    /// Inbound edges from the same work held by other agencies.
    async fn get_relations_siblings_to_me(&self, id: &RecordId) -> Result<BTreeSet<RecordId>>;

    /// Outbound edges to other works.
    async fn get_relations_parents(&self, id: &RecordId) -> Result<BTreeSet<RecordId>> {
        let from = self.get_relations_from(id).await?;
        Ok(from.into_iter().filter(|to| !to.same_work(id)).collect())
    }

    /// Outbound edges to the same work held by other agencies.
    async fn get_relations_siblings_from_me(&self, id: &RecordId) -> Result<BTreeSet<RecordId>> {
        let from = self.get_relations_from(id).await?;
        Ok(from.into_iter().filter(|to| to.same_work(id)).collect())
    }

    /// Replace the outbound edge set in one step.
    async fn set_relations_from(&self, id: &RecordId, refers: &BTreeSet<RecordId>) -> Result<()>;

    async fn delete_relations_from(&self, id: &RecordId) -> Result<()>;

    // Queue

    /// Fan a job out to every worker whose rule matches, keeping the lowest
    /// priority for jobs already pending. Returns the workers reached.
    async fn enqueue(&self, job: &EnqueueJob) -> Result<Vec<String>>;

    /// Claim and remove up to `count` jobs, most urgent then oldest first.
    async fn dequeue_n(&self, worker: &str, count: usize) -> Result<Vec<QueueJob>>;

    /// Claim and remove the single most urgent job.
    async fn dequeue(&self, worker: &str) -> Result<Option<QueueJob>> {
        Ok(self.dequeue_n(worker, 1).await?.into_iter().next())
    }

    /// Record a diagnostic entry for a job a worker gave up on.
    async fn queue_fail(&self, failure: &QueueFailure) -> Result<()>;

    /// The fan-out table.
    async fn queue_rules(&self) -> Result<Vec<QueueRule>>;

    async fn check_provider(&self, provider: &str) -> Result<bool> {
        Ok(self
            .queue_rules()
            .await?
            .iter()
            .any(|rule| rule.provider == provider))
    }

    /// Pending jobs for a worker in dequeue order, without claiming them.
    async fn list_queue(&self, worker: &str) -> Result<Vec<QueueJob>>;

    /// Recorded failures for a worker, oldest first.
    async fn queue_failures(&self, worker: &str) -> Result<Vec<QueueFailure>>;
}
