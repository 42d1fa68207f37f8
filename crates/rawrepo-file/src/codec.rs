//! On-disk document shapes.

use base64::Engine;
use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use rawrepo_core::error::StoreError;
use rawrepo_core::{MimeType, QueueJob, RecordVersion};

/// One version of a record as written to `records/<bib>/<agency>.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct StoredVersion {
    /// Base64 of the raw content bytes.
    pub content: String,
    pub mimetype: MimeType,
    pub deleted: bool,
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
    #[serde(default)]
    pub tracking_id: String,
}

impl StoredVersion {
    pub fn encode(version: &RecordVersion) -> Self {
        Self {
            content: STANDARD.encode(&version.content),
            mimetype: version.mimetype,
            deleted: version.deleted,
            created: version.created,
            modified: version.modified,
            tracking_id: version.tracking_id.clone(),
        }
    }

    pub fn decode(&self, path: &str) -> Result<RecordVersion, StoreError> {
        let content = STANDARD
            .decode(&self.content)
            .map_err(|e| StoreError::Corrupt {
                path: path.to_string(),
                message: format!("bad content encoding: {}", e),
            })?;
        Ok(RecordVersion {
            content,
            mimetype: self.mimetype,
            deleted: self.deleted,
            created: self.created,
            modified: self.modified,
            tracking_id: self.tracking_id.clone(),
        })
    }
}

/// A pending job in `queue.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct StoredJob {
    #[serde(flatten)]
    pub job: QueueJob,
    /// Insertion order, breaks ties between equal timestamps.
    pub seq: u64,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub(crate) struct QueueDocument {
    #[serde(default)]
    pub seq: u64,
    #[serde(default)]
    pub jobs: Vec<StoredJob>,
}

impl QueueDocument {
    /// Indexes of a worker's jobs in dequeue order.
    pub fn ordered_for(&self, worker: &str) -> Vec<usize> {
        let mut indexes: Vec<usize> = self
            .jobs
            .iter()
            .enumerate()
            .filter(|(_, stored)| stored.job.worker == worker)
            .map(|(i, _)| i)
            .collect();
        indexes.sort_by_key(|&i| {
            let stored = &self.jobs[i];
            (stored.job.priority, stored.job.queued_at, stored.seq)
        });
        indexes
    }
}

/// Directory name for a bibliographic id.
pub(crate) fn bib_dir_name(bibliographic_record_id: &str) -> String {
    URL_SAFE_NO_PAD.encode(bibliographic_record_id.as_bytes())
}
