//! Filesystem storage for records, relations and the queue.

use std::collections::BTreeSet;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use chrono::Utc;
use fs2::FileExt;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument, trace};
use uuid::Uuid;

use rawrepo_core::Result;
use rawrepo_core::error::{Error, StoreError};
use rawrepo_core::queue::matching_workers;
use rawrepo_core::{
    AgencyId, EnqueueJob, QueueFailure, QueueJob, QueueRule, RecordId, RecordVersion,
};

use crate::codec::{QueueDocument, StoredJob, StoredVersion, bib_dir_name};

fn map_io(err: std::io::Error) -> Error {
    Error::Store(StoreError::Io {
        message: format!("IO error: {}", err),
    })
}

fn map_lock(err: std::io::Error) -> Error {
    Error::Store(StoreError::Lock {
        message: err.to_string(),
    })
}

fn corrupt(path: &Path, err: impl std::fmt::Display) -> Error {
    Error::Store(StoreError::Corrupt {
        path: path.display().to_string(),
        message: err.to_string(),
    })
}

/// Held for the duration of one write; dropping it unlocks.
struct WriteLock {
    file: File,
}

impl Drop for WriteLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}

/// Filesystem-backed record store.
///
/// Every mutating call holds an exclusive advisory lock on `rawrepo.lock`,
/// so several processes may share one root.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Create a new file store at the given root directory.
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Get the root directory path.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn records_dir(&self) -> PathBuf {
        self.root.join("records")
    }

    fn bib_dir(&self, bibliographic_record_id: &str) -> PathBuf {
        self.records_dir().join(bib_dir_name(bibliographic_record_id))
    }

    fn record_path(&self, id: &RecordId) -> PathBuf {
        self.bib_dir(id.bibliographic_record_id())
            .join(format!("{}.json", id.agency_id()))
    }

    /// Edge index of one record, `direction` being `out` or `in`.
    fn edges_path(&self, direction: &str, id: &RecordId) -> PathBuf {
        self.root
            .join("relations")
            .join(direction)
            .join(bib_dir_name(id.bibliographic_record_id()))
            .join(format!("{}.json", id.agency_id()))
    }

    fn queue_path(&self) -> PathBuf {
        self.root.join("queue.json")
    }

    fn diagnostics_path(&self) -> PathBuf {
        self.root.join("jobdiag.jsonl")
    }

    /// Path of the fan-out table.
    pub fn rules_path(&self) -> PathBuf {
        self.root.join("queuerules.json")
    }

    fn lock_path(&self) -> PathBuf {
        self.root.join("rawrepo.lock")
    }

    // ========================================================================
    // Documents
    // ========================================================================

    fn lock(&self) -> Result<WriteLock> {
        fs::create_dir_all(&self.root).map_err(map_io)?;
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(self.lock_path())
            .map_err(map_io)?;
        file.lock_exclusive().map_err(map_lock)?;
        Ok(WriteLock { file })
    }

    /// Read a JSON document, or the default when it doesn't exist yet.
    fn read_json<T: DeserializeOwned + Default>(&self, path: &Path) -> Result<T> {
        if !path.exists() {
            return Ok(T::default());
        }
        let content = fs::read_to_string(path).map_err(map_io)?;
        serde_json::from_str(&content).map_err(|e| corrupt(path, e))
    }

    /// Replace a JSON document through a temporary file and a rename.
    fn write_json<T: Serialize>(&self, path: &Path, value: &T) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(map_io)?;
        }
        let content = serde_json::to_string_pretty(value).map_err(Error::serialization)?;
        let temp_path = path.with_extension(format!("{}.tmp", Uuid::new_v4().simple()));
        fs::write(&temp_path, &content).map_err(map_io)?;
        fs::rename(&temp_path, path).map_err(map_io)?;
        Ok(())
    }

    // ========================================================================
    // Records
    // ========================================================================

    pub(crate) fn versions(&self, id: &RecordId) -> Result<Vec<RecordVersion>> {
        let path = self.record_path(id);
        let stored: Vec<StoredVersion> = self.read_json(&path)?;
        let display = path.display().to_string();
        stored
            .iter()
            .map(|v| v.decode(&display).map_err(Error::from))
            .collect()
    }

    pub(crate) fn current(&self, id: &RecordId) -> Result<Option<RecordVersion>> {
        Ok(self.versions(id)?.pop())
    }

    /// Append a version, keeping the first `created` ever stored.
    #[instrument(skip(self, version), fields(record = %id))]
    pub(crate) fn append_version(&self, id: &RecordId, mut version: RecordVersion) -> Result<RecordVersion> {
        let _lock = self.lock()?;
        let path = self.record_path(id);
        let mut stored: Vec<StoredVersion> = self.read_json(&path)?;
        if let Some(first) = stored.first() {
            version.created = first.created;
        }
        stored.push(StoredVersion::encode(&version));
        self.write_json(&path, &stored)?;
        debug!(versions = stored.len(), deleted = version.deleted, "Stored record");
        Ok(version)
    }

    #[instrument(skip(self))]
    pub(crate) fn remove_record(&self, id: &RecordId) -> Result<()> {
        let _lock = self.lock()?;
        let path = self.record_path(id);
        if path.exists() {
            fs::remove_file(&path).map_err(map_io)?;
        }
        if let Some(dir) = path.parent()
            && dir.exists()
            && fs::read_dir(dir).map_err(map_io)?.next().is_none()
        {
            fs::remove_dir(dir).map_err(map_io)?;
        }
        self.replace_outbound(id, &BTreeSet::new())?;
        debug!("Purged record");
        Ok(())
    }

    pub(crate) fn agencies(&self, bibliographic_record_id: &str, skip_deleted: bool) -> Result<BTreeSet<AgencyId>> {
        let dir = self.bib_dir(bibliographic_record_id);
        let mut agencies = BTreeSet::new();
        if !dir.exists() {
            return Ok(agencies);
        }

        for entry in fs::read_dir(&dir).map_err(map_io)? {
            let path = entry.map_err(map_io)?.path();
            if path.extension().is_none_or(|ext| ext != "json") {
                continue;
            }
            let Some(agency_id) = path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(|s| s.parse::<AgencyId>().ok())
            else {
                continue;
            };
            if skip_deleted {
                let id = RecordId::new(bibliographic_record_id, agency_id);
                if self.current(&id)?.is_none_or(|v| v.deleted) {
                    continue;
                }
            }
            agencies.insert(agency_id);
        }
        Ok(agencies)
    }

    // ========================================================================
    // Relations
    // ========================================================================

    pub(crate) fn outbound(&self, id: &RecordId) -> Result<BTreeSet<RecordId>> {
        self.read_json(&self.edges_path("out", id))
    }

    pub(crate) fn inbound(&self, id: &RecordId, sibling: bool) -> Result<BTreeSet<RecordId>> {
        let mut from: BTreeSet<RecordId> = self.read_json(&self.edges_path("in", id))?;
        from.retain(|from| from.same_work(id) == sibling);
        Ok(from)
    }

    pub(crate) fn set_outbound(&self, id: &RecordId, refers: &BTreeSet<RecordId>) -> Result<()> {
        let _lock = self.lock()?;
        self.replace_outbound(id, refers)
    }

    /// Caller holds the lock.
    fn replace_outbound(&self, id: &RecordId, refers: &BTreeSet<RecordId>) -> Result<()> {
        let previous: BTreeSet<RecordId> = self.read_json(&self.edges_path("out", id))?;
        for gone in previous.difference(refers) {
            self.update_edges(&self.edges_path("in", gone), |from| {
                from.remove(id);
            })?;
        }
        for added in refers.difference(&previous) {
            self.update_edges(&self.edges_path("in", added), |from| {
                from.insert(id.clone());
            })?;
        }
        self.update_edges(&self.edges_path("out", id), |to| to.clone_from(refers))?;
        trace!(record = %id, count = refers.len(), "Replaced relations");
        Ok(())
    }

    /// Rewrite one edge index, deleting it once empty. Caller holds the lock.
    fn update_edges(&self, path: &Path, update: impl FnOnce(&mut BTreeSet<RecordId>)) -> Result<()> {
        let mut edges: BTreeSet<RecordId> = self.read_json(path)?;
        update(&mut edges);
        if !edges.is_empty() {
            return self.write_json(path, &edges);
        }
        if path.exists() {
            fs::remove_file(path).map_err(map_io)?;
        }
        if let Some(dir) = path.parent()
            && dir.exists()
            && fs::read_dir(dir).map_err(map_io)?.next().is_none()
        {
            fs::remove_dir(dir).map_err(map_io)?;
        }
        Ok(())
    }

    // ========================================================================
    // Queue
    // ========================================================================

    pub(crate) fn rules(&self) -> Result<Vec<QueueRule>> {
        self.read_json(&self.rules_path())
    }

    /// Add a row to the fan-out table unless it is already there.
    #[instrument(skip(self), fields(provider = %rule.provider, worker = %rule.worker))]
    pub fn add_queue_rule(&self, rule: QueueRule) -> Result<bool> {
        let _lock = self.lock()?;
        let path = self.rules_path();
        let mut rules: Vec<QueueRule> = self.read_json(&path)?;
        if rules.contains(&rule) {
            return Ok(false);
        }
        rules.push(rule);
        self.write_json(&path, &rules)?;
        debug!("Added queue rule");
        Ok(true)
    }

    pub(crate) fn push_job(&self, job: &EnqueueJob) -> Result<Vec<String>> {
        let _lock = self.lock()?;
        let rules = self.rules()?;
        let workers: Vec<String> = matching_workers(&rules, &job.provider, job.changed, job.leaf)
            .into_iter()
            .map(str::to_string)
            .collect();
        if workers.is_empty() {
            return Ok(workers);
        }

        let path = self.queue_path();
        let mut queue: QueueDocument = self.read_json(&path)?;
        for worker in &workers {
            let pending = queue
                .jobs
                .iter()
                .position(|s| s.job.worker == *worker && s.job.record_id == job.record_id);
            match pending {
                Some(i) => {
                    let stored = &mut queue.jobs[i];
                    stored.job.priority = stored.job.priority.min(job.priority);
                }
                None => {
                    queue.seq += 1;
                    let seq = queue.seq;
                    queue.jobs.push(StoredJob {
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
        self.write_json(&path, &queue)?;
        Ok(workers)
    }

    pub(crate) fn take_jobs(&self, worker: &str, count: usize) -> Result<Vec<QueueJob>> {
        let _lock = self.lock()?;
        let path = self.queue_path();
        let mut queue: QueueDocument = self.read_json(&path)?;
        let mut claimed: Vec<usize> = queue.ordered_for(worker).into_iter().take(count).collect();
        if claimed.is_empty() {
            return Ok(Vec::new());
        }

        let jobs: Vec<QueueJob> = claimed.iter().map(|&i| queue.jobs[i].job.clone()).collect();
        claimed.sort_unstable_by(|a, b| b.cmp(a));
        for i in claimed {
            queue.jobs.remove(i);
        }
        self.write_json(&path, &queue)?;
        Ok(jobs)
    }

    pub(crate) fn pending_jobs(&self, worker: &str) -> Result<Vec<QueueJob>> {
        let queue: QueueDocument = self.read_json(&self.queue_path())?;
        Ok(queue
            .ordered_for(worker)
            .into_iter()
            .map(|i| queue.jobs[i].job.clone())
            .collect())
    }

    /// Append a failure to the diagnostics log.
    pub(crate) fn append_failure(&self, failure: &QueueFailure) -> Result<()> {
        let _lock = self.lock()?;
        let line = serde_json::to_string(failure).map_err(Error::serialization)?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.diagnostics_path())
            .map_err(map_io)?;
        writeln!(file, "{}", line).map_err(map_io)?;
        file.sync_data().map_err(map_io)?;
        Ok(())
    }

    pub(crate) fn failures(&self, worker: &str) -> Result<Vec<QueueFailure>> {
        let path = self.diagnostics_path();
        if !path.exists() {
            return Ok(Vec::new());
        }
        let file = File::open(&path).map_err(map_io)?;
        let mut failures = Vec::new();
        for line in BufReader::new(file).lines() {
            let line = line.map_err(map_io)?;
            if line.trim().is_empty() {
                continue;
            }
            let failure: QueueFailure = serde_json::from_str(&line).map_err(|e| corrupt(&path, e))?;
            if failure.job.worker == worker {
                failures.push(failure);
            }
        }
        Ok(failures)
    }
}
