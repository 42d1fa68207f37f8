//! Change propagation command implementation.

use anyhow::{Context as _, Result};
use clap::Args;
use colored::Colorize;

use crate::commands::parse_id;
use crate::context::Context;
use crate::output;

#[derive(Args, Debug)]
pub struct ChangedArgs {
    /// Record that changed (bib:agency)
    pub id: String,

    /// Provider whose queue rules receive the jobs
    #[arg(long)]
    pub provider: String,

    /// Job priority, lower is more urgent
    #[arg(long)]
    pub priority: Option<i32>,

    /// Show the jobs without enqueuing them
    #[arg(long)]
    pub dry_run: bool,

    /// Print jobs as JSON
    #[arg(long)]
    pub json: bool,
}

pub async fn run(args: ChangedArgs, ctx: &Context) -> Result<()> {
    let id = parse_id(&args.id)?;
    let engine = ctx.engine()?;

    let jobs = if args.dry_run {
        engine
            .plan_changed_record(&args.provider, &id, args.priority)
            .await
            .context("Failed to plan change")?
    } else {
        engine
            .changed_record(&args.provider, &id, args.priority)
            .await
            .context("Failed to propagate change")?
    };

    for job in &jobs {
        if args.json {
            output::json(job)?;
        } else {
            println!("{}", output::job_line(job));
        }
    }

    if args.dry_run {
        eprintln!("{}", format!("{} jobs planned, nothing enqueued.", jobs.len()).dimmed());
    } else {
        output::success(&format!("Enqueued {} jobs", jobs.len()));
    }
    Ok(())
}
