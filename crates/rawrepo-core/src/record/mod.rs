//! Record and relation data model.

mod history;
mod relation;
mod types;

pub use history::RecordMetaData;
pub use relation::Relation;
pub use types::{Record, RecordVersion};
