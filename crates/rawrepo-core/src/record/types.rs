//! The record value type.

use chrono::{DateTime, Utc};

use crate::Result;
use crate::error::InvalidInputError;
use crate::types::{MimeType, RecordId};

/// A record as held by one agency.
///
/// Records are immutable values; every `with_*` method returns a new value.
/// Content, mimetype and deletion changes also move `modified` forward.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Record {
    id: RecordId,
    content: Vec<u8>,
    mimetype: Option<MimeType>,
    deleted: bool,
    created: DateTime<Utc>,
    modified: DateTime<Utc>,
    tracking_id: String,
    original: bool,
    enrichment_trail: String,
    enriched: bool,
}

/// One persisted state of a record, as kept by a store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordVersion {
    pub content: Vec<u8>,
    pub mimetype: MimeType,
    pub deleted: bool,
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
    pub tracking_id: String,
}

impl Record {
    /// An empty in-memory placeholder that has never been persisted.
    pub fn new(id: RecordId) -> Self {
        let now = Utc::now();
        let enrichment_trail = id.agency_id().to_string();
        Self {
            id,
            content: Vec::new(),
            mimetype: None,
            deleted: false,
            created: now,
            modified: now,
            tracking_id: String::new(),
            original: true,
            enrichment_trail,
            enriched: false,
        }
    }

    /// Rebuild a persisted record from a stored version.
    pub fn from_version(id: RecordId, version: RecordVersion) -> Self {
        let enrichment_trail = id.agency_id().to_string();
        Self {
            id,
            content: version.content,
            mimetype: Some(version.mimetype),
            deleted: version.deleted,
            created: version.created,
            modified: version.modified,
            tracking_id: version.tracking_id,
            original: false,
            enrichment_trail,
            enriched: false,
        }
    }

    /// The persistable state of this record.
    ///
    /// # Errors
    ///
    /// Fails when no mimetype has been set.
    pub fn to_version(&self) -> Result<RecordVersion> {
        let mimetype = self.mimetype.ok_or_else(|| InvalidInputError::MissingMimeType {
            id: self.id.clone(),
        })?;
        Ok(RecordVersion {
            content: self.content.clone(),
            mimetype,
            deleted: self.deleted,
            created: self.created,
            modified: self.modified,
            tracking_id: self.tracking_id.clone(),
        })
    }

    pub fn id(&self) -> &RecordId {
        &self.id
    }

    pub fn content(&self) -> &[u8] {
        &self.content
    }

    /// `None` until a mimetype is assigned to a placeholder.
    pub fn mimetype(&self) -> Option<MimeType> {
        self.mimetype
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted
    }

    pub fn created(&self) -> DateTime<Utc> {
        self.created
    }

    pub fn modified(&self) -> DateTime<Utc> {
        self.modified
    }

    pub fn tracking_id(&self) -> &str {
        &self.tracking_id
    }

    /// True only for a record that has never been persisted.
    pub fn is_original(&self) -> bool {
        self.original
    }

    /// Comma-joined agencies that contributed to this value.
    pub fn enrichment_trail(&self) -> &str {
        &self.enrichment_trail
    }

    /// True when more than one record was merged into this value.
    pub fn is_enriched(&self) -> bool {
        self.enriched
    }

    pub fn with_content(mut self, content: impl Into<Vec<u8>>) -> Self {
        self.content = content.into();
        self.modified = Utc::now();
        self
    }

    pub fn with_mimetype(mut self, mimetype: MimeType) -> Self {
        self.mimetype = Some(mimetype);
        self.modified = Utc::now();
        self
    }

    pub fn with_deleted(mut self, deleted: bool) -> Self {
        self.deleted = deleted;
        self.modified = Utc::now();
        self
    }

    pub fn with_tracking_id(mut self, tracking_id: impl Into<String>) -> Self {
        self.tracking_id = tracking_id.into();
        self
    }

    pub fn with_modified(mut self, modified: DateTime<Utc>) -> Self {
        self.modified = modified;
        self
    }

    /// Backdate the creation time of a record that has not been saved yet.
    ///
    /// # Errors
    ///
    /// Fails once the record has been persisted.
    pub fn with_created(mut self, created: DateTime<Utc>) -> Result<Self> {
        if !self.original {
            return Err(InvalidInputError::CreatedImmutable { id: self.id }.into());
        }
        self.created = created;
        Ok(self)
    }

    /// Mark this value as the product of a merge.
    pub fn with_enrichment_trail(mut self, trail: impl Into<String>, enriched: bool) -> Self {
        self.enrichment_trail = trail.into();
        self.enriched = enriched;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_placeholder() {
        let record = Record::new(RecordId::new("abc", 191919));
        assert!(record.is_original());
        assert!(record.content().is_empty());
        assert_eq!(record.mimetype(), None);
        assert_eq!(record.enrichment_trail(), "191919");
        assert!(!record.is_enriched());
    }

    #[test]
    fn test_unset_mimetype_cannot_persist() {
        let record = Record::new(RecordId::new("abc", 191919)).with_content(b"x".to_vec());
        assert!(record.to_version().is_err());

        let version = record.with_mimetype(MimeType::MarcXchange).to_version().unwrap();
        assert_eq!(version.content, b"x");
    }

    #[test]
    fn test_content_change_touches_modified() {
        let past = Utc::now() - Duration::days(1);
        let record = Record::new(RecordId::new("abc", 1)).with_modified(past);
        assert_eq!(record.modified(), past);

        let record = record.with_content(b"new".to_vec());
        assert!(record.modified() > past);

        let touched = record.modified();
        let record = record.with_tracking_id("track-1");
        assert_eq!(record.modified(), touched);
    }

    #[test]
    fn test_created_fixed_after_persist() {
        let past = Utc::now() - Duration::days(3);
        let record = Record::new(RecordId::new("abc", 1))
            .with_mimetype(MimeType::MarcXchange)
            .with_created(past)
            .unwrap();
        assert_eq!(record.created(), past);

        let stored = Record::from_version(record.id().clone(), record.to_version().unwrap());
        assert!(!stored.is_original());
        assert!(stored.with_created(Utc::now()).is_err());
    }
}
