//! Directed relation edges.

use serde::{Deserialize, Serialize};

use crate::types::RecordId;

/// A directed edge between two records.
///
/// Same-work edges are sibling (enrichment) links; all others are parent
/// links pointing up the hierarchy or at an authority record.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Relation {
    pub from: RecordId,
    pub to: RecordId,
}

impl Relation {
    pub fn new(from: RecordId, to: RecordId) -> Self {
        Self { from, to }
    }

    pub fn is_sibling(&self) -> bool {
        self.from.same_work(&self.to)
    }
}
