//! Merged record command implementation.

use std::io::{self, Write};

use anyhow::{Context as _, Result};
use clap::Args;

use crate::context::Context;
use crate::output::{self, RecordView};

#[derive(Args, Debug)]
pub struct MergedArgs {
    /// Bibliographic record id
    pub bib: String,

    /// Agency asking for the record
    pub agency: u32,

    /// Allow deleted records in the chain
    #[arg(long)]
    pub deleted: bool,

    /// Write only the merged content
    #[arg(long)]
    pub raw: bool,
}

pub async fn run(args: MergedArgs, ctx: &Context) -> Result<()> {
    let engine = ctx.engine()?;
    let record = engine
        .fetch_merged_record(&args.bib, args.agency, args.deleted)
        .await
        .context("Failed to merge record")?;

    if args.raw {
        io::stdout()
            .write_all(record.content())
            .context("Failed to write content")?;
        return Ok(());
    }
    output::json_pretty(&RecordView::from(&record))
}
