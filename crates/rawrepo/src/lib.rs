//! rawrepo - Relation graph, merge and change propagation engine.
//!
//! [`RawRepo`] bundles a [`RecordStore`], a [`RelationHints`] policy and a
//! [`RecordMerger`] into one engine. It exposes:
//!
//! - record lifecycle and history,
//! - relation traversal and validated relation replacement,
//! - merged views and record collections,
//! - authority expansion,
//! - change propagation into the worker queue.
//!
//! # Example
//!
//! ```no_run
//! use rawrepo::{FieldOverlayMerger, RawRepo};
//! use rawrepo_core::{MemoryStore, RecordId, StaticRelationHints};
//!
//! # async fn example() -> rawrepo_core::Result<()> {
//! let repo = RawRepo::new(
//!     MemoryStore::new(),
//!     StaticRelationHints::fallback(),
//!     FieldOverlayMerger::default(),
//! );
//! let jobs = repo
//!     .changed_record("update", &RecordId::new("25912233", 870970), None)
//!     .await?;
//! println!("queued {} jobs", jobs.len());
//! # Ok(())
//! # }
//! ```

mod cache;
mod config;
mod expand;
mod graph;
mod hints;
mod merge;
mod merger;
mod propagate;
mod queue;
mod repo;
mod validate;

pub use config::EngineConfig;
pub use hints::CachedRelationHints;
pub use merger::FieldOverlayMerger;
pub use repo::RawRepo;
pub use validate::check_relations;

pub use rawrepo_core::{
    Error, FieldExpander, MemoryStore, MimeType, Record, RecordId, RecordMerger, RecordMetaData,
    RecordStore, RelationHints, Result, StaticRelationHints,
};
