//! Record collection command implementation.

use std::collections::BTreeMap;

use anyhow::{Context as _, Result};
use clap::Args;

use crate::context::Context;
use crate::output::{self, RecordView};

#[derive(Args, Debug)]
pub struct CollectionArgs {
    /// Bibliographic record id
    pub bib: String,

    /// Agency asking for the collection
    pub agency: u32,

    /// Include authority records
    #[arg(long)]
    pub authority: bool,
}

pub async fn run(args: CollectionArgs, ctx: &Context) -> Result<()> {
    let engine = ctx.engine()?;
    let collection = engine
        .fetch_record_collection(&args.bib, args.agency, args.authority)
        .await
        .context("Failed to collect records")?;

    let views: BTreeMap<&str, RecordView> = collection
        .iter()
        .map(|(bib, record)| (bib.as_str(), RecordView::from(record)))
        .collect();
    output::json_pretty(&views)
}
