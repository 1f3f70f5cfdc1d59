mod cli;
mod commands;
mod commentary;
mod engine;
mod integrity;
mod leaf_audit;
mod line_compare;
mod model;
mod outline;
mod reference;
mod title;
mod util;

use anyhow::Result;
use clap::Parser;
use tracing::error;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands};

fn main() {
    init_tracing();

    if let Err(err) = run() {
        error!(error = %err, "command failed");
        for cause in err.chain().skip(1) {
            error!(cause = %cause, "caused by");
        }
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Leaves(args) => commands::leaves::run(args),
        Commands::Lines(args) => commands::lines::run(args),
        Commands::Integrity(args) => commands::integrity::run(args),
        Commands::All(args) => commands::all::run(args),
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
