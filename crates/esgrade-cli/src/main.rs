//! esgrade CLI: the `esgrade` command.

mod cli;
mod commands;
mod support;

use clap::Parser;
use cli::{Cli, Commands};

fn main() {
    let cli = Cli::parse();
    support::init_tracing(cli.log_level.as_deref());

    match cli.command {
        Commands::Score {
            candidate,
            expected,
            source_text,
            config,
            tolerance,
            similarity_threshold,
            min_score,
            json,
        } => commands::score::run(commands::score::Args {
            candidate,
            expected,
            source_text,
            config,
            tolerance,
            similarity_threshold,
            min_score,
            json,
        }),

        Commands::Validate { input, json } => commands::validate::run(input, json),

        Commands::Policies { tags, json } => commands::policies::run(tags, json),

        Commands::Run {
            data,
            expected,
            extractor_cmd,
            extractor_args,
            extractor_timeout,
            null_baseline,
            jobs,
            config,
            json,
        } => commands::run::run(commands::run::Args {
            data,
            expected,
            extractor_cmd,
            extractor_args,
            extractor_timeout,
            null_baseline,
            jobs,
            config,
            json,
        }),
    }
}
