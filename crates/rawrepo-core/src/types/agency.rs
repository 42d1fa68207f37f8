//! Agency identifiers and the reserved agencies.

/// A library or cataloging authority.
pub type AgencyId = u32;

/// The shared national catalogue most agencies enrich.
pub const COMMON_AGENCY: AgencyId = 870970;

/// The agency owning authority (vocabulary) records.
pub const AUTHORITY_AGENCY: AgencyId = 870979;

/// Common catalogue for school libraries.
pub const SCHOOL_COMMON_AGENCY: AgencyId = 300000;

/// Agencies whose records carry authority links themselves.
pub const DIRECT_AUTHORITY_AGENCIES: [AgencyId; 3] = [870970, 870971, 870974];

/// School libraries live in 300001..=399999 and enrich [`SCHOOL_COMMON_AGENCY`].
pub fn is_school_agency(agency_id: AgencyId) -> bool {
    (300001..=399999).contains(&agency_id)
}
