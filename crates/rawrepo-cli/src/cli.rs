//! CLI argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::commands::{changed, collection, merged, queue, record, relations};

/// Inspect and maintain a file-backed bibliographic record repository.
#[derive(Parser, Debug)]
#[command(name = "rawrepo")]
#[command(author, version = env!("RAWREPO_VERSION"), about, long_about = None)]
pub struct Cli {
    /// Repository directory (defaults to $RAWREPO_ROOT, then the user data dir)
    #[arg(long, global = true)]
    pub root: Option<PathBuf>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Output logs as JSON
    #[arg(long, global = true)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Store, read and remove records
    Record(record::RecordCommand),

    /// Read and replace relations
    Relations(relations::RelationsCommand),

    /// Propagate a change to the queue
    Changed(changed::ChangedArgs),

    /// Show the merged record an agency sees
    Merged(merged::MergedArgs),

    /// Show a merged record with all of its ancestors
    Collection(collection::CollectionArgs),

    /// Queue rules, pending jobs and failures
    Queue(queue::QueueCommand),
}
