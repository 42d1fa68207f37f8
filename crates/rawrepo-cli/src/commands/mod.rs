//! Subcommand implementations.

pub mod changed;
pub mod collection;
pub mod merged;
pub mod queue;
pub mod record;
pub mod relations;

use anyhow::{Context, Result};

use rawrepo_core::RecordId;

/// Parse a `bib:agency` record id argument.
pub(crate) fn parse_id(value: &str) -> Result<RecordId> {
    value
        .parse()
        .with_context(|| format!("Invalid record id '{}', expected bib:agency", value))
}
