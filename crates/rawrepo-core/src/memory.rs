//! In-memory record store.
//!
//! Holds every record version, both edge indexes and the queue behind one
//! async mutex, so each trait call is a single atomic step. Used by the
//! engine tests and by embedders that don't need durability.

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use tracing::debug;

use crate::Result;
use crate::queue::{EnqueueJob, QueueFailure, QueueJob, QueueRule, matching_workers};
use crate::record::{Record, RecordVersion};
use crate::traits::RecordStore;
use crate::types::{AgencyId, RecordId};

#[derive(Debug, Clone)]
struct PendingJob {
    job: QueueJob,
    seq: u64,
}

#[derive(Debug, Default)]
struct State {
    /// Versions oldest first; the last one is current.
    records: BTreeMap<RecordId, Vec<RecordVersion>>,
    outbound: BTreeMap<RecordId, BTreeSet<RecordId>>,
    inbound: BTreeMap<RecordId, BTreeSet<RecordId>>,
    rules: Vec<QueueRule>,
    queue: Vec<PendingJob>,
    failures: Vec<QueueFailure>,
    seq: u64,
}

impl State {
    fn current(&self, id: &RecordId) -> Option<&RecordVersion> {
        self.records.get(id).and_then(|versions| versions.last())
    }

    fn agencies_for(&self, bibliographic_record_id: &str, skip_deleted: bool) -> BTreeSet<AgencyId> {
        self.records
            .iter()
            .filter(|(id, _)| id.bibliographic_record_id() == bibliographic_record_id)
            .filter(|(_, versions)| {
                !skip_deleted || versions.last().is_some_and(|v| !v.deleted)
            })
            .map(|(id, _)| id.agency_id())
            .collect()
    }

    fn inbound_where(&self, id: &RecordId, sibling: bool) -> BTreeSet<RecordId> {
        self.inbound
            .get(id)
            .map(|from| {
                from.iter()
                    .filter(|f| f.same_work(id) == sibling)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    fn clear_outbound(&mut self, id: &RecordId) {
        if let Some(old) = self.outbound.remove(id) {
            for to in old {
                if let Some(from) = self.inbound.get_mut(&to) {
                    from.remove(id);
                    if from.is_empty() {
                        self.inbound.remove(&to);
                    }
                }
            }
        }
    }

    /// Indexes of a worker's pending jobs in dequeue order.
    fn ordered_for(&self, worker: &str) -> Vec<usize> {
        let mut indexes: Vec<usize> = self
            .queue
            .iter()
            .enumerate()
            .filter(|(_, p)| p.job.worker == worker)
            .map(|(i, _)| i)
            .collect();
        indexes.sort_by_key(|&i| {
            let p = &self.queue[i];
            (p.job.priority, p.job.queued_at, p.seq)
        });
        indexes
    }
}

/// A [`RecordStore`] that lives in process memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with the given fan-out table.
    pub fn with_rules(rules: impl IntoIterator<Item = QueueRule>) -> Self {
        let state = State {
            rules: rules.into_iter().collect(),
            ..State::default()
        };
        Self {
            state: Mutex::new(state),
        }
    }

    pub async fn add_queue_rule(&self, rule: QueueRule) {
        let mut state = self.state.lock().await;
        if !state.rules.contains(&rule) {
            state.rules.push(rule);
        }
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn get_record(&self, id: &RecordId) -> Result<Option<Record>> {
        let state = self.state.lock().await;
        Ok(state
            .current(id)
            .map(|version| Record::from_version(id.clone(), version.clone())))
    }

    async fn put_record(&self, record: &Record) -> Result<Record> {
        let mut version = record.to_version()?;
        let mut state = self.state.lock().await;
        if let Some(existing) = state.current(record.id()) {
            version.created = existing.created;
        }
        state
            .records
            .entry(record.id().clone())
            .or_default()
            .push(version.clone());
        debug!(record = %record.id(), deleted = version.deleted, "Stored record");
        Ok(Record::from_version(record.id().clone(), version))
    }

    async fn purge_record(&self, id: &RecordId) -> Result<()> {
        let mut state = self.state.lock().await;
        state.records.remove(id);
        state.clear_outbound(id);
        Ok(())
    }

    async fn get_record_history(&self, id: &RecordId) -> Result<Vec<RecordVersion>> {
        let state = self.state.lock().await;
        let mut versions = state.records.get(id).cloned().unwrap_or_default();
        versions.sort_by(|a, b| b.modified.cmp(&a.modified));
        Ok(versions)
    }

    async fn agencies_for_bib_id(
        &self,
        bibliographic_record_id: &str,
    ) -> Result<BTreeSet<AgencyId>> {
        let state = self.state.lock().await;
        Ok(state.agencies_for(bibliographic_record_id, false))
    }

    async fn agencies_for_bib_id_skip_deleted(
        &self,
        bibliographic_record_id: &str,
    ) -> Result<BTreeSet<AgencyId>> {
        let state = self.state.lock().await;
        Ok(state.agencies_for(bibliographic_record_id, true))
    }

    async fn get_relations_from(&self, id: &RecordId) -> Result<BTreeSet<RecordId>> {
        let state = self.state.lock().await;
        Ok(state.outbound.get(id).cloned().unwrap_or_default())
    }

    async fn get_relations_children(&self, id: &RecordId) -> Result<BTreeSet<RecordId>> {
        let state = self.state.lock().await;
        Ok(state.inbound_where(id, false))
    }

    async fn get_relations_siblings_to_me(&self, id: &RecordId) -> Result<BTreeSet<RecordId>> {
        let state = self.state.lock().await;
        Ok(state.inbound_where(id, true))
    }

    async fn set_relations_from(&self, id: &RecordId, refers: &BTreeSet<RecordId>) -> Result<()> {
        let mut state = self.state.lock().await;
        state.clear_outbound(id);
        if refers.is_empty() {
            return Ok(());
        }
        for to in refers {
            state
                .inbound
                .entry(to.clone())
                .or_default()
                .insert(id.clone());
        }
        state.outbound.insert(id.clone(), refers.clone());
        Ok(())
    }

    async fn delete_relations_from(&self, id: &RecordId) -> Result<()> {
        let mut state = self.state.lock().await;
        state.clear_outbound(id);
        Ok(())
    }

    async fn enqueue(&self, job: &EnqueueJob) -> Result<Vec<String>> {
        let mut state = self.state.lock().await;
        let workers: Vec<String> =
            matching_workers(&state.rules, &job.provider, job.changed, job.leaf)
                .into_iter()
                .map(str::to_string)
                .collect();

        for worker in &workers {
            let pending = state
                .queue
                .iter()
                .position(|p| p.job.worker == *worker && p.job.record_id == job.record_id);
            match pending {
                Some(i) => {
                    let p = &mut state.queue[i];
                    p.job.priority = p.job.priority.min(job.priority);
                }
                None => {
                    state.seq += 1;
                    let seq = state.seq;
                    state.queue.push(PendingJob {
                        job: QueueJob {
                            record_id: job.record_id.clone(),
                            worker: worker.clone(),
                            queued_at: Utc::now(),
                            priority: job.priority,
                        },
                        seq,
                    });
                }
            }
        }
        Ok(workers)
    }

    async fn dequeue_n(&self, worker: &str, count: usize) -> Result<Vec<QueueJob>> {
        let mut state = self.state.lock().await;
        let mut claimed: Vec<usize> = state.ordered_for(worker).into_iter().take(count).collect();
        let jobs: Vec<QueueJob> = claimed.iter().map(|&i| state.queue[i].job.clone()).collect();
        claimed.sort_unstable_by(|a, b| b.cmp(a));
        for i in claimed {
            state.queue.remove(i);
        }
        Ok(jobs)
    }

    async fn queue_fail(&self, failure: &QueueFailure) -> Result<()> {
        let mut state = self.state.lock().await;
        state.failures.push(failure.clone());
        Ok(())
    }

    async fn queue_rules(&self) -> Result<Vec<QueueRule>> {
        let state = self.state.lock().await;
        Ok(state.rules.clone())
    }

    async fn list_queue(&self, worker: &str) -> Result<Vec<QueueJob>> {
        let state = self.state.lock().await;
        Ok(state
            .ordered_for(worker)
            .into_iter()
            .map(|i| state.queue[i].job.clone())
            .collect())
    }

    async fn queue_failures(&self, worker: &str) -> Result<Vec<QueueFailure>> {
        let state = self.state.lock().await;
        Ok(state
            .failures
            .iter()
            .filter(|f| f.job.worker == worker)
            .cloned()
            .collect())
    }
}
