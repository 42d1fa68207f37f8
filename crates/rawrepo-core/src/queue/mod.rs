//! Queue jobs and provider fan-out rules.

mod job;
mod rule;

pub use job::{DEFAULT_PRIORITY, EnqueueJob, Priority, QueueFailure, QueueJob};
pub use rule::{QueueRule, RuleFlag, matching_workers};
