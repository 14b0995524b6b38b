//! Zipsift CLI - Command-line utility for staged, content-validated ZIP
//! extraction.

mod cli;
mod commands;
mod error;
mod logger;
mod output;
mod progress;

use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();

    logger::init(cli.verbose, cli.quiet, cli.json);
    let formatter = output::create_formatter(cli.json, cli.verbose, cli.quiet);

    match &cli.command {
        cli::Commands::Extract(args) => {
            let show_progress = !cli.quiet && !cli.json;
            commands::extract::execute(args, &*formatter, show_progress)
        }
        cli::Commands::List(args) => commands::list::execute(args, &*formatter),
    }
}
