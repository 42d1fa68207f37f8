//! Job types exchanged with queue workers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::RecordId;

/// Lower values are more urgent.
pub type Priority = i32;

/// Priority used when a caller doesn't ask for one.
pub const DEFAULT_PRIORITY: Priority = 1000;

/// A claimed or pending unit of work for one worker.
///
/// Serializes to the flat wire shape
/// `{ bibliographic_record_id, agency_id, worker, queued_at, priority }`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueJob {
    #[serde(flatten)]
    pub record_id: RecordId,
    pub worker: String,
    pub queued_at: DateTime<Utc>,
    pub priority: Priority,
}

/// A job a worker gave up on, kept for diagnostics.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueFailure {
    #[serde(flatten)]
    pub job: QueueJob,
    pub error: String,
}

/// A request to notify every worker subscribed to a provider.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnqueueJob {
    pub record_id: RecordId,
    pub provider: String,
    pub changed: bool,
    pub leaf: bool,
    pub priority: Priority,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_shape() {
        let job = QueueJob {
            record_id: RecordId::new("25912233", 870970),
            worker: "solr-sync".to_string(),
            queued_at: "2024-03-01T10:00:00Z".parse().unwrap(),
            priority: 1000,
        };
        let failure = QueueFailure {
            job,
            error: "boom".to_string(),
        };

        let value = serde_json::to_value(&failure).unwrap();
        assert_eq!(value["bibliographic_record_id"], "25912233");
        assert_eq!(value["agency_id"], 870970);
        assert_eq!(value["worker"], "solr-sync");
        assert_eq!(value["priority"], 1000);
        assert_eq!(value["error"], "boom");

        let back: QueueFailure = serde_json::from_value(value).unwrap();
        assert_eq!(back, failure);
    }
}
