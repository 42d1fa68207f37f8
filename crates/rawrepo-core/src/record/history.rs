//! Record history metadata.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::RecordVersion;
use crate::types::{MimeType, RecordId};

/// Describes one saved version of a record, without its content.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordMetaData {
    pub id: RecordId,
    pub deleted: bool,
    pub mimetype: MimeType,
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
    pub tracking_id: String,
}

impl RecordMetaData {
    pub fn of(id: &RecordId, version: &RecordVersion) -> Self {
        Self {
            id: id.clone(),
            deleted: version.deleted,
            mimetype: version.mimetype,
            created: version.created,
            modified: version.modified,
            tracking_id: version.tracking_id.clone(),
        }
    }
}
