//! Record subcommand implementations.

use std::io::{self, Read, Write};

use anyhow::{Context as _, Result, bail};
use clap::{Args, Subcommand};

use rawrepo_core::MimeType;

use crate::commands::parse_id;
use crate::context::Context;
use crate::output::{self, RecordView};

#[derive(Args, Debug)]
pub struct RecordCommand {
    #[command(subcommand)]
    pub command: RecordSubcommand,
}

#[derive(Subcommand, Debug)]
pub enum RecordSubcommand {
    /// Store a new version of a record
    Put(PutArgs),

    /// Show the stored record of one agency
    Get(GetArgs),

    /// List every saved version of a record
    History(HistoryArgs),

    /// Replace a record with an empty, deleted version
    Delete(IdArgs),

    /// Remove a record and its history entirely
    Purge(IdArgs),
}

#[derive(Args, Debug)]
pub struct PutArgs {
    /// Record id (bib:agency)
    pub id: String,

    /// Content mimetype, e.g. text/marcxchange
    #[arg(long, short = 'm')]
    pub mimetype: String,

    /// File with the record content (use - for stdin)
    #[arg(long)]
    pub file: String,

    /// Tracking id of the change
    #[arg(long)]
    pub tracking_id: Option<String>,
}

#[derive(Args, Debug)]
pub struct GetArgs {
    /// Record id (bib:agency)
    pub id: String,

    /// Write only the content
    #[arg(long)]
    pub raw: bool,
}

#[derive(Args, Debug)]
pub struct HistoryArgs {
    /// Record id (bib:agency)
    pub id: String,

    /// Also show the content of each version
    #[arg(long)]
    pub content: bool,
}

#[derive(Args, Debug)]
pub struct IdArgs {
    /// Record id (bib:agency)
    pub id: String,
}

pub async fn handle(cmd: RecordCommand, ctx: &Context) -> Result<()> {
    match cmd.command {
        RecordSubcommand::Put(args) => put(args, ctx).await,
        RecordSubcommand::Get(args) => get(args, ctx).await,
        RecordSubcommand::History(args) => history(args, ctx).await,
        RecordSubcommand::Delete(args) => delete(args, ctx).await,
        RecordSubcommand::Purge(args) => purge(args, ctx).await,
    }
}

fn read_content(path: &str) -> Result<Vec<u8>> {
    if path == "-" {
        let mut buf = Vec::new();
        io::stdin()
            .read_to_end(&mut buf)
            .context("Failed to read from stdin")?;
        Ok(buf)
    } else {
        std::fs::read(path).with_context(|| format!("Failed to read {}", path))
    }
}

async fn put(args: PutArgs, ctx: &Context) -> Result<()> {
    let id = parse_id(&args.id)?;
    let mimetype: MimeType = args.mimetype.parse().context("Invalid mimetype")?;
    let content = read_content(&args.file)?;

    let engine = ctx.engine()?;
    let mut record = engine
        .fetch_record(id.bibliographic_record_id(), id.agency_id())
        .await
        .context("Failed to load record")?
        .with_content(content)
        .with_mimetype(mimetype)
        .with_deleted(false);
    if let Some(tracking_id) = args.tracking_id {
        record = record.with_tracking_id(tracking_id);
    }

    let saved = engine.save_record(&record).await.context("Failed to save record")?;
    output::success(&format!("Saved {}", saved.id()));
    Ok(())
}

async fn get(args: GetArgs, ctx: &Context) -> Result<()> {
    let id = parse_id(&args.id)?;
    let engine = ctx.engine()?;

    if !engine
        .record_exists_maybe_deleted(id.bibliographic_record_id(), id.agency_id())
        .await?
    {
        bail!("Record {} not found", id);
    }
    let record = engine
        .fetch_record(id.bibliographic_record_id(), id.agency_id())
        .await
        .context("Failed to load record")?;

    if args.raw {
        io::stdout()
            .write_all(record.content())
            .context("Failed to write content")?;
        return Ok(());
    }
    output::json_pretty(&RecordView::from(&record))
}

async fn history(args: HistoryArgs, ctx: &Context) -> Result<()> {
    let id = parse_id(&args.id)?;
    let engine = ctx.engine()?;

    let versions = engine
        .get_record_history(&id)
        .await
        .context("Failed to load history")?;
    if versions.is_empty() {
        bail!("Record {} not found", id);
    }

    for meta in &versions {
        if args.content {
            let record = engine.get_historic_record(meta).await?;
            output::json(&RecordView::from(&record))?;
        } else {
            output::json(meta)?;
        }
    }
    Ok(())
}

async fn delete(args: IdArgs, ctx: &Context) -> Result<()> {
    let id = parse_id(&args.id)?;
    let engine = ctx.engine()?;
    engine.delete_record(&id).await.context("Failed to delete record")?;
    output::success(&format!("Deleted {}", id));
    Ok(())
}

async fn purge(args: IdArgs, ctx: &Context) -> Result<()> {
    let id = parse_id(&args.id)?;
    let engine = ctx.engine()?;
    engine.purge_record(&id).await.context("Failed to purge record")?;
    output::success(&format!("Purged {}", id));
    Ok(())
}
