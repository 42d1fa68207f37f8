//! Record identifier type.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::AgencyId;
use crate::error::{Error, InvalidInputError};

/// Identifies a record within one agency's namespace.
///
/// Format: `<bibliographic_record_id>:<agency_id>`
///
/// # Example
///
/// ```
/// use rawrepo_core::RecordId;
///
/// let id: RecordId = "25912233:870970".parse().unwrap();
/// assert_eq!(id.bibliographic_record_id(), "25912233");
/// assert_eq!(id.agency_id(), 870970);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RecordId {
    bibliographic_record_id: String,
    agency_id: AgencyId,
}

impl RecordId {
    /// Create a record id from its parts.
    pub fn new(bibliographic_record_id: impl Into<String>, agency_id: AgencyId) -> Self {
        Self {
            bibliographic_record_id: bibliographic_record_id.into(),
            agency_id,
        }
    }

    /// The agency-local identifier of the work.
    pub fn bibliographic_record_id(&self) -> &str {
        &self.bibliographic_record_id
    }

    /// The owning agency.
    pub fn agency_id(&self) -> AgencyId {
        self.agency_id
    }

    /// The same work as held by another agency.
    pub fn with_agency(&self, agency_id: AgencyId) -> Self {
        Self::new(self.bibliographic_record_id.clone(), agency_id)
    }

    /// True when both ids name the same work (a sibling edge).
    pub fn same_work(&self, other: &RecordId) -> bool {
        self.bibliographic_record_id == other.bibliographic_record_id
    }

    fn parse(s: &str) -> Result<Self, Error> {
        let (bib, agency) = s.rsplit_once(':').ok_or_else(|| InvalidInputError::RecordId {
            value: s.to_string(),
            reason: "must have format '<bibliographic_record_id>:<agency_id>'".to_string(),
        })?;

        if bib.is_empty() {
            return Err(InvalidInputError::RecordId {
                value: s.to_string(),
                reason: "bibliographic record id is empty".to_string(),
            }
            .into());
        }

        let agency_id = agency.parse().map_err(|_| InvalidInputError::RecordId {
            value: s.to_string(),
            reason: format!("invalid agency id: {}", agency),
        })?;

        Ok(Self::new(bib, agency_id))
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.bibliographic_record_id, self.agency_id)
    }
}

impl FromStr for RecordId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
