//! Engine configuration.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use rawrepo_core::types::{AUTHORITY_AGENCY, AgencyId, DIRECT_AUTHORITY_AGENCIES};
use rawrepo_core::{DEFAULT_PRIORITY, Priority};

/// Tunables for [`RawRepo`](crate::RawRepo).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Priority for `changed_record` calls that don't name one.
    pub default_priority: Priority,
    /// Owner of authority records; skipped by collections unless asked for.
    pub authority_agency: AgencyId,
    /// Agencies whose records link to authority records themselves.
    pub expandable_agencies: BTreeSet<AgencyId>,
    /// Memoize merged records until the next enqueue touches them.
    pub cache_merges: bool,
    /// Works whose merged views are memoized at once.
    pub merge_cache_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_priority: DEFAULT_PRIORITY,
            authority_agency: AUTHORITY_AGENCY,
            expandable_agencies: DIRECT_AUTHORITY_AGENCIES.into_iter().collect(),
            cache_merges: true,
            merge_cache_capacity: 10_000,
        }
    }
}
