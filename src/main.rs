mod agents;
mod cli;
mod config;
mod dockerfile;
mod error;
mod registry;
mod repository;
mod utils;
mod version;
mod workflow;

use clap::Parser;
use cli::{Cli, Commands};
use colored::Colorize;
use config::UpdaterConfig;
use std::process;
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = UpdaterConfig::new(&cli.path, cli.ignore, cli.sha_pinning, cli.mode).and_then(
        |config| match cli.command {
            Commands::Update {
                interactive,
                same_major,
            } => workflow::execute_update(&config, interactive, same_major),
            Commands::Check { same_major } => workflow::execute_check(&config, same_major),
            Commands::List => workflow::execute_list(&config),
        },
    );

    if let Err(e) = result {
        eprintln!("{} {}", "Error:".red().bold(), e);
        process::exit(1);
    }
}

/// Logs go to stderr; `RUST_LOG` wins over `--verbose`.
fn init_logging(verbose: bool) {
    let default = if verbose { "dockup=debug" } else { "dockup=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
