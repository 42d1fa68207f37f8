//! Queue operations.
//!
//! Workers drain a queue through either `dequeue` or `dequeue_n`, not a mix
//! of both against the same worker under concurrent load.

use tracing::{debug, instrument, warn};

use rawrepo_core::error::QueueError;
use rawrepo_core::{
    EnqueueJob, QueueFailure, QueueJob, QueueRule, RecordMerger, RecordStore, RelationHints,
    Result,
};

use crate::RawRepo;

impl<S, H, M> RawRepo<S, H, M>
where
    S: RecordStore,
    H: RelationHints,
    M: RecordMerger,
{
    /// Notify the workers subscribed to `job.provider`.
    ///
    /// Returns the workers that received (or already had) the job.
    pub async fn enqueue(&self, job: &EnqueueJob) -> Result<Vec<String>> {
        self.ensure_provider(&job.provider).await?;
        self.enqueue_unchecked(job).await
    }

    pub(crate) async fn enqueue_unchecked(&self, job: &EnqueueJob) -> Result<Vec<String>> {
        let workers = self.store.enqueue(job).await?;
        self.cache.invalidate(&job.record_id).await;
        debug!(
            record = %job.record_id,
            changed = job.changed,
            leaf = job.leaf,
            priority = job.priority,
            workers = ?workers,
            "Enqueued job"
        );
        Ok(workers)
    }

    /// Claim the most urgent job for `worker`.
    pub async fn dequeue(&self, worker: &str) -> Result<Option<QueueJob>> {
        let job = self.store.dequeue(worker).await?;
        if let Some(job) = &job {
            debug!(record = %job.record_id, worker, priority = job.priority, "Dequeued job");
        }
        Ok(job)
    }

    /// Claim up to `count` jobs for `worker`, most urgent first.
    pub async fn dequeue_n(&self, worker: &str, count: usize) -> Result<Vec<QueueJob>> {
        if count == 0 {
            return Err(QueueError::InvalidCount.into());
        }
        let jobs = self.store.dequeue_n(worker, count).await?;
        debug!(worker, requested = count, claimed = jobs.len(), "Dequeued jobs");
        Ok(jobs)
    }

    /// Record that a worker gave up on a claimed job.
    #[instrument(skip(self, job), fields(record = %job.record_id, worker = %job.worker))]
    pub async fn queue_fail(&self, job: QueueJob, error: &str) -> Result<()> {
        if error.trim().is_empty() {
            return Err(QueueError::EmptyErrorMessage.into());
        }
        warn!(error, "Job failed");
        self.store
            .queue_fail(&QueueFailure {
                job,
                error: error.to_string(),
            })
            .await
    }

    pub async fn check_provider(&self, provider: &str) -> Result<bool> {
        self.store.check_provider(provider).await
    }

    pub async fn queue_rules(&self) -> Result<Vec<QueueRule>> {
        self.store.queue_rules().await
    }

    /// Pending jobs for `worker` in the order they would be claimed.
    pub async fn list_queue(&self, worker: &str) -> Result<Vec<QueueJob>> {
        self.store.list_queue(worker).await
    }

    pub async fn queue_failures(&self, worker: &str) -> Result<Vec<QueueFailure>> {
        self.store.queue_failures(worker).await
    }
}
