//! rawrepo-core - Core types and traits for the rawrepo record repository.
//!
//! Records are keyed by `(bibliographic_record_id, agency_id)` and linked by
//! directed relations. Same-work relations are enrichment siblings and
//! everything else is a parent link. This crate holds the data model, the
//! error type and the collaborator traits; the engine lives in `rawrepo`.

pub mod error;
pub mod hints;
pub mod memory;
pub mod queue;
pub mod record;
pub mod traits;
pub mod types;

pub use error::Error;
pub use hints::StaticRelationHints;
pub use memory::MemoryStore;
pub use queue::{
    DEFAULT_PRIORITY, EnqueueJob, Priority, QueueFailure, QueueJob, QueueRule, RuleFlag,
};
pub use record::{Record, RecordMetaData, RecordVersion, Relation};
pub use traits::{FieldExpander, RecordMerger, RecordStore, RelationHints};
pub use types::{AUTHORITY_AGENCY, AgencyId, COMMON_AGENCY, MimeType, RecordId};

/// Result type alias using the crate's Error type.
pub type Result<T> = std::result::Result<T, Error>;
