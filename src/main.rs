mod cli;
mod commands;

use clap::Parser;
use cli::cmd_enums::{Cli, Commands};
use commands::provision::ProvisionArgs;
use serverbox::{log_error, logger};
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse();
    logger::init(cli.debug);

    let result = match cli.command {
        Commands::Config { action } => commands::config::run(action),
        Commands::Versions { refresh, clear_cache } => commands::versions::run(refresh, clear_cache),
        Commands::Provision {
            base,
            config,
            project,
            instance,
            dry_run,
        } => commands::provision::run(ProvisionArgs {
            base,
            config,
            project,
            instance,
            dry_run,
        }),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log_error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}
