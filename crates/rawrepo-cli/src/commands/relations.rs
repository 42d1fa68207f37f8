//! Relations subcommand implementations.

use std::collections::BTreeSet;

use anyhow::{Context as _, Result};
use clap::{Args, Subcommand, ValueEnum};

use crate::commands::parse_id;
use crate::context::Context;
use crate::output;

#[derive(Args, Debug)]
pub struct RelationsCommand {
    #[command(subcommand)]
    pub command: RelationsSubcommand,
}

#[derive(Subcommand, Debug)]
pub enum RelationsSubcommand {
    /// Replace every outbound relation of a record
    Set(SetArgs),

    /// List relations of a record
    Get(GetArgs),
}

#[derive(Args, Debug)]
pub struct SetArgs {
    /// Record id (bib:agency)
    pub id: String,

    /// Targets (bib:agency); none clears the relations
    pub refers: Vec<String>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum Direction {
    /// Every outbound edge
    From,
    /// Records this one points up to
    Parents,
    /// Records pointing up to this one
    Children,
    /// Enrichments of this record
    SiblingsToMe,
    /// The record this one enriches
    SiblingsFromMe,
}

#[derive(Args, Debug)]
pub struct GetArgs {
    /// Record id (bib:agency)
    pub id: String,

    /// Which edges to list
    #[arg(long, value_enum, default_value = "from")]
    pub direction: Direction,
}

pub async fn handle(cmd: RelationsCommand, ctx: &Context) -> Result<()> {
    match cmd.command {
        RelationsSubcommand::Set(args) => set(args, ctx).await,
        RelationsSubcommand::Get(args) => get(args, ctx).await,
    }
}

async fn set(args: SetArgs, ctx: &Context) -> Result<()> {
    let id = parse_id(&args.id)?;
    let refers = args
        .refers
        .iter()
        .map(|value| parse_id(value))
        .collect::<Result<BTreeSet<_>>>()?;

    let engine = ctx.engine()?;
    engine
        .set_relations_from(&id, &refers)
        .await
        .context("Failed to set relations")?;
    output::success(&format!("Set {} relations on {}", refers.len(), id));
    Ok(())
}

async fn get(args: GetArgs, ctx: &Context) -> Result<()> {
    let id = parse_id(&args.id)?;
    let engine = ctx.engine()?;

    let related = match args.direction {
        Direction::From => engine.get_relations_from(&id).await,
        Direction::Parents => engine.get_relations_parents(&id).await,
        Direction::Children => engine.get_relations_children(&id).await,
        Direction::SiblingsToMe => engine.get_relations_siblings_to_me(&id).await,
        Direction::SiblingsFromMe => engine.get_relations_siblings_from_me(&id).await,
    }
    .context("Failed to read relations")?;

    for target in related {
        println!("{}", target);
    }
    Ok(())
}
