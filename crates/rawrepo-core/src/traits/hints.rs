//! Agency relation policy.

use async_trait::async_trait;

use crate::Result;
use crate::types::AgencyId;

/// Answers where an agency looks for records it doesn't hold itself.
#[async_trait]
pub trait RelationHints: Send + Sync {
    /// Whether the agency enriches a shared cataloguing agency.
    async fn uses_common_agency(&self, agency_id: AgencyId) -> Result<bool>;

    /// Candidate agencies to search, most preferred first.
    async fn agency_priority(&self, agency_id: AgencyId) -> Result<Vec<AgencyId>>;
}
