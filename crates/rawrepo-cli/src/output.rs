//! Output formatting helpers.

use anyhow::Result;
use chrono::{DateTime, Utc};
use colored::Colorize;
use serde::Serialize;

use rawrepo_core::{EnqueueJob, Record};

/// Print a success message.
pub fn success(msg: &str) {
    eprintln!("{} {}", "✓".green(), msg);
}

/// Print a labeled field.
pub fn field(label: &str, value: &str) {
    println!("{}: {}", label.dimmed(), value);
}

/// Print a value as compact JSON.
pub fn json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string(value)?;
    println!("{}", json);
    Ok(())
}

/// Print a value as pretty-printed JSON.
pub fn json_pretty<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    println!("{}", json);
    Ok(())
}

/// A record as shown to users, content decoded lossily as UTF-8.
#[derive(Debug, Serialize)]
pub struct RecordView {
    pub bibliographic_record_id: String,
    pub agency_id: u32,
    pub mimetype: Option<String>,
    pub deleted: bool,
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
    pub tracking_id: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub enrichment_trail: String,
    pub content: String,
}

impl From<&Record> for RecordView {
    fn from(record: &Record) -> Self {
        Self {
            bibliographic_record_id: record.id().bibliographic_record_id().to_string(),
            agency_id: record.id().agency_id(),
            mimetype: record.mimetype().map(|m| m.to_string()),
            deleted: record.is_deleted(),
            created: record.created(),
            modified: record.modified(),
            tracking_id: record.tracking_id().to_string(),
            enrichment_trail: record.enrichment_trail().to_string(),
            content: String::from_utf8_lossy(record.content()).into_owned(),
        }
    }
}

/// `agency:bib:CL`, with `-` for a flag that is off.
pub fn job_line(job: &EnqueueJob) -> String {
    format!(
        "{}:{}:{}{}",
        job.record_id.agency_id(),
        job.record_id.bibliographic_record_id(),
        if job.changed { 'C' } else { '-' },
        if job.leaf { 'L' } else { '-' },
    )
}
