//! Traits for the collaborators the engine is built from.

mod expander;
mod hints;
mod merger;
mod store;

pub use expander::FieldExpander;
pub use hints::RelationHints;
pub use merger::{RecordMerger, can_merge_mimetypes, merged_mimetype_of};
pub use store::RecordStore;
