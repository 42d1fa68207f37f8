//! Queue subcommand implementations.

use anyhow::{Context as _, Result};
use clap::{Args, Subcommand};
use colored::Colorize;

use rawrepo_core::{QueueJob, QueueRule, RuleFlag};

use crate::context::Context;
use crate::output;

#[derive(Args, Debug)]
pub struct QueueCommand {
    #[command(subcommand)]
    pub command: QueueSubcommand,
}

#[derive(Subcommand, Debug)]
pub enum QueueSubcommand {
    /// Subscribe a worker to a provider's jobs
    RuleAdd(RuleAddArgs),

    /// List the fan-out table
    Rules,

    /// List a worker's pending jobs in claim order
    List(WorkerArgs),

    /// Claim jobs for a worker, one JSON line each
    Take(TakeArgs),

    /// Report a claimed job as failed
    Fail(FailArgs),

    /// List a worker's failed jobs
    Failures(WorkerArgs),
}

#[derive(Args, Debug)]
pub struct RuleAddArgs {
    /// Provider name used by `changed`
    pub provider: String,

    /// Worker receiving the jobs
    pub worker: String,

    /// Match on the changed flag: Y, N or A
    #[arg(long, default_value = "A")]
    pub changed: String,

    /// Match on the leaf flag: Y, N or A
    #[arg(long, default_value = "A")]
    pub leaf: String,
}

#[derive(Args, Debug)]
pub struct WorkerArgs {
    /// Worker name
    pub worker: String,
}

#[derive(Args, Debug)]
pub struct TakeArgs {
    /// Worker name
    pub worker: String,

    /// Number of jobs to claim
    #[arg(long, short = 'n', default_value_t = 1)]
    pub count: usize,
}

#[derive(Args, Debug)]
pub struct FailArgs {
    /// The job as printed by `take`
    #[arg(long)]
    pub job: String,

    /// Why the job failed
    #[arg(long)]
    pub error: String,
}

pub async fn handle(cmd: QueueCommand, ctx: &Context) -> Result<()> {
    match cmd.command {
        QueueSubcommand::RuleAdd(args) => rule_add(args, ctx),
        QueueSubcommand::Rules => rules(ctx).await,
        QueueSubcommand::List(args) => list(args, ctx).await,
        QueueSubcommand::Take(args) => take(args, ctx).await,
        QueueSubcommand::Fail(args) => fail(args, ctx).await,
        QueueSubcommand::Failures(args) => failures(args, ctx).await,
    }
}

fn rule_add(args: RuleAddArgs, ctx: &Context) -> Result<()> {
    let changed: RuleFlag = args.changed.parse().context("Invalid --changed flag")?;
    let leaf: RuleFlag = args.leaf.parse().context("Invalid --leaf flag")?;
    let rule = QueueRule::new(args.provider, args.worker, changed, leaf);

    let added = ctx
        .store()
        .add_queue_rule(rule.clone())
        .context("Failed to add queue rule")?;
    if added {
        output::success(&format!("Added rule: {}", rule.describe()));
    } else {
        eprintln!("{}", "Rule already present.".dimmed());
    }
    Ok(())
}

async fn rules(ctx: &Context) -> Result<()> {
    let engine = ctx.engine()?;
    let rules = engine.queue_rules().await.context("Failed to read queue rules")?;
    if rules.is_empty() {
        eprintln!("{}", "No queue rules.".dimmed());
        return Ok(());
    }
    for rule in &rules {
        output::field(
            &rule.provider,
            &format!("{} (changed={}, leaf={})", rule.describe(), rule.changed, rule.leaf),
        );
    }
    Ok(())
}

async fn list(args: WorkerArgs, ctx: &Context) -> Result<()> {
    let engine = ctx.engine()?;
    let jobs = engine
        .list_queue(&args.worker)
        .await
        .context("Failed to read queue")?;
    if jobs.is_empty() {
        eprintln!("{}", "No pending jobs.".dimmed());
    }
    for job in &jobs {
        output::json(job)?;
    }
    Ok(())
}

async fn take(args: TakeArgs, ctx: &Context) -> Result<()> {
    let engine = ctx.engine()?;
    let jobs = engine
        .dequeue_n(&args.worker, args.count)
        .await
        .context("Failed to dequeue")?;
    for job in &jobs {
        output::json(job)?;
    }
    Ok(())
}

async fn fail(args: FailArgs, ctx: &Context) -> Result<()> {
    let job: QueueJob = serde_json::from_str(&args.job).context("Invalid job JSON")?;
    let engine = ctx.engine()?;
    let record = job.record_id.clone();
    engine
        .queue_fail(job, &args.error)
        .await
        .context("Failed to record job failure")?;
    output::success(&format!("Recorded failure for {}", record));
    Ok(())
}

async fn failures(args: WorkerArgs, ctx: &Context) -> Result<()> {
    let engine = ctx.engine()?;
    let failures = engine
        .queue_failures(&args.worker)
        .await
        .context("Failed to read failures")?;
    for failure in &failures {
        output::json(failure)?;
    }
    Ok(())
}
