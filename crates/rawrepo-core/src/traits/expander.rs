//! Authority field expansion contract.

use std::collections::BTreeMap;

use crate::Result;
use crate::record::Record;

/// Inlines authority data into a record's content.
pub trait FieldExpander: Send + Sync {
    /// `authorities` is keyed by the authority's bibliographic id. With
    /// `keep_authority_fields` set the linking subfields stay in place.
    fn expand(
        &self,
        content: &[u8],
        authorities: &BTreeMap<String, Record>,
        keep_authority_fields: bool,
    ) -> Result<Vec<u8>>;
}
