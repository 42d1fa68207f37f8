//! Identifier and tag types.

mod agency;
mod mimetype;
mod record_id;

pub use agency::{
    AUTHORITY_AGENCY, AgencyId, COMMON_AGENCY, DIRECT_AUTHORITY_AGENCIES, SCHOOL_COMMON_AGENCY,
    is_school_agency,
};
pub use mimetype::MimeType;
pub use record_id::RecordId;
