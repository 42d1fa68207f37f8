//! Error types for rawrepo.
//!
//! One unified error type with an explicit variant per failure kind. A
//! missing record is always recoverable by the caller, while store failures
//! are fatal and propagate untouched.

use std::fmt;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::types::{AgencyId, MimeType, RecordId};

/// The unified error type for rawrepo operations.
#[derive(Debug, Error)]
pub enum Error {
    /// A requested or derived record could not be resolved.
    #[error("not found: {0}")]
    NotFound(#[from] NotFoundError),

    /// A proposed relation topology was rejected.
    #[error("invalid relations: {0}")]
    Validation(#[from] ValidationError),

    /// A merge chain could not be folded.
    #[error("merge error: {0}")]
    Merge(#[from] MergeError),

    /// The underlying persistence layer failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// The queue contract was violated by the caller.
    #[error("queue error: {0}")]
    Queue(#[from] QueueError),

    /// The relation graph loops back on itself.
    #[error("circular relation: {0}")]
    CircularRelation(#[from] CircularRelationError),

    /// Malformed input (ids, mimetypes, rule flags, payloads).
    #[error("invalid input: {0}")]
    InvalidInput(#[from] InvalidInputError),
}

impl Error {
    /// True for the recoverable "nothing there" kind.
    ///
    /// Traversal helpers use this to skip a candidate agency that doesn't
    /// apply while letting every other kind propagate.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }

    /// Wrap an encoding or decoding failure.
    pub fn serialization(err: impl fmt::Display) -> Self {
        Error::InvalidInput(InvalidInputError::Other {
            message: err.to_string(),
        })
    }
}

/// A record or candidate agency could not be resolved.
#[derive(Debug, Error)]
pub enum NotFoundError {
    /// No record stored under this id.
    #[error("record {id} does not exist")]
    Record { id: RecordId },

    /// None of the candidate agencies for a bibliographic id hold it.
    #[error("no agency holds {bibliographic_record_id} on behalf of {agency_id}")]
    NoCandidateAgency {
        bibliographic_record_id: String,
        agency_id: AgencyId,
    },

    /// No version of the record was saved at the given timestamp.
    #[error("record {id} has no version modified at {modified}")]
    HistoricVersion {
        id: RecordId,
        modified: DateTime<Utc>,
    },
}

/// A relation set rejected before it reached the store.
#[derive(Debug, Error)]
#[error("{id}: {violation}")]
pub struct ValidationError {
    /// The record whose outbound relations were being replaced.
    pub id: RecordId,
    /// Why the relation set was rejected.
    pub violation: ValidationViolation,
}

/// The individual topology rules.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationViolation {
    #[error("a record cannot refer to itself")]
    SelfRelation,

    #[error("{mimetype} records cannot have sibling relations")]
    SiblingForbidden { mimetype: MimeType },

    #[error("at most one sibling relation allowed, found {found}")]
    TooManySiblings { found: usize },

    #[error("at most one non-authority parent allowed, found {found}")]
    TooManyParents { found: usize },

    #[error("sibling {target} has unsupported mimetype {mimetype}")]
    InvalidSiblingMimetype { target: RecordId, mimetype: MimeType },

    #[error("parent {target} has unsupported mimetype {mimetype}")]
    InvalidParentMimetype { target: RecordId, mimetype: MimeType },

    #[error("authority records cannot have outbound relations")]
    AuthorityRelations,

    #[error("an enrichment with a sibling may only have authority parents, found {target}")]
    ParentBesideSibling { target: RecordId },
}

/// Merge chain failures.
#[derive(Debug, Error)]
pub enum MergeError {
    /// The merger cannot combine these mimetypes.
    #[error("cannot merge {enrichment} onto {base}")]
    Incompatible { base: MimeType, enrichment: MimeType },

    /// The payload merge itself failed.
    #[error("content merge failed: {message}")]
    Content { message: String },
}

/// Persistence failures.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Filesystem or device IO failed.
    #[error("IO error: {message}")]
    Io { message: String },

    /// A stored document could not be decoded.
    #[error("corrupt document {path}: {message}")]
    Corrupt { path: String, message: String },

    /// An advisory lock could not be taken or released.
    #[error("lock error: {message}")]
    Lock { message: String },
}

/// Queue contract violations.
#[derive(Debug, Error)]
pub enum QueueError {
    /// `queue_fail` was called with a blank reason.
    #[error("failure reason must not be empty")]
    EmptyErrorMessage,

    /// No fan-out rules exist for the provider.
    #[error("unknown provider: {provider}")]
    UnknownProvider { provider: String },

    /// Bulk dequeue asked for zero jobs.
    #[error("job count must be positive")]
    InvalidCount,
}

/// A relation path that returns to a record already on it.
#[derive(Debug, Error)]
pub struct CircularRelationError {
    /// The descent, ending with the record that closed the loop.
    pub path: Vec<RecordId>,
}

impl fmt::Display for CircularRelationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, id) in self.path.iter().enumerate() {
            if i > 0 {
                write!(f, " -> ")?;
            }
            write!(f, "{}", id)?;
        }
        Ok(())
    }
}

/// Input validation errors.
#[derive(Debug, Error)]
pub enum InvalidInputError {
    /// A record id string didn't parse.
    #[error("invalid record id '{value}': {reason}")]
    RecordId { value: String, reason: String },

    /// A mimetype string is not one of the known types.
    #[error("unknown mimetype '{value}'")]
    MimeType { value: String },

    /// A queue rule flag is not one of Y, N or A.
    #[error("invalid rule flag '{value}', expected Y, N or A")]
    RuleFlag { value: String },

    /// Records must carry a mimetype before they are saved.
    #[error("record {id} has no mimetype")]
    MissingMimeType { id: RecordId },

    /// `created` is fixed once a record has been persisted.
    #[error("created timestamp of {id} is immutable once persisted")]
    CreatedImmutable { id: RecordId },

    /// Generic input error.
    #[error("{message}")]
    Other { message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn circular_path_display() {
        let err = CircularRelationError {
            path: vec![
                RecordId::new("a", 870970),
                RecordId::new("b", 870970),
                RecordId::new("a", 870970),
            ],
        };
        assert_eq!(err.to_string(), "a:870970 -> b:870970 -> a:870970");
    }

    #[test]
    fn not_found_is_recoverable() {
        let err: Error = NotFoundError::Record {
            id: RecordId::new("x", 1),
        }
        .into();
        assert!(err.is_not_found());

        let err: Error = QueueError::EmptyErrorMessage.into();
        assert!(!err.is_not_found());
    }
}
