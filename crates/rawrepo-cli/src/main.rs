//! rawrepo - Command line access to a file-backed record repository.
//!
//! Stores records, edits relations, shows merged views and drives the
//! worker queue of a repository directory, mainly for inspection and
//! scripted imports.

mod cli;
mod commands;
mod context;
mod output;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use cli::{Cli, Commands};
use commands::{changed, collection, merged, queue, record, relations};
use context::Context;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose, cli.json_logs);

    let ctx = Context::resolve(cli.root)?;
    match cli.command {
        Commands::Record(cmd) => record::handle(cmd, &ctx).await,
        Commands::Relations(cmd) => relations::handle(cmd, &ctx).await,
        Commands::Changed(args) => changed::run(args, &ctx).await,
        Commands::Merged(args) => merged::run(args, &ctx).await,
        Commands::Collection(args) => collection::run(args, &ctx).await,
        Commands::Queue(cmd) => queue::handle(cmd, &ctx).await,
    }
}

fn init_logging(verbosity: u8, json: bool) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    // Logs go to stderr so command output stays pipeable.
    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .init();
    }
}
