//! Record merge contract.

use crate::Result;
use crate::error::MergeError;
use crate::types::MimeType;

/// Folds an enrichment onto a base record.
///
/// The content format is the merger's business; the engine only decides the
/// order in which records are folded.
pub trait RecordMerger: Send + Sync {
    fn can_merge(&self, base: MimeType, enrichment: MimeType) -> bool {
        can_merge_mimetypes(base, enrichment)
    }

    fn merged_mimetype(&self, base: MimeType, enrichment: MimeType) -> Result<MimeType> {
        merged_mimetype_of(base, enrichment)
    }

    /// Merge `enrichment` onto `base`. `is_final` is set when the enrichment
    /// belongs to the agency the merge was requested for.
    fn merge(&self, base: &[u8], enrichment: &[u8], is_final: bool) -> Result<Vec<u8>>;

    /// Identity and parameters of this merger, used in cache keys.
    fn cache_key(&self) -> String;
}

/// Enrichments merge onto any known content type.
pub fn can_merge_mimetypes(base: MimeType, enrichment: MimeType) -> bool {
    enrichment == MimeType::Enrichment && base.is_base_content()
}

/// A merge keeps the base content type.
pub fn merged_mimetype_of(base: MimeType, enrichment: MimeType) -> Result<MimeType> {
    if can_merge_mimetypes(base, enrichment) {
        Ok(base)
    } else {
        Err(MergeError::Incompatible { base, enrichment }.into())
    }
}
