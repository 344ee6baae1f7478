//! repofig CLI entry point.
//!
//! Reads the logging section of the project config, sets up tracing, then
//! dispatches to the selected subcommand via [`Cli::run`].

mod cli;
mod logging;

use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use repofig_core::{CONFIG_FILE, LoggingConfig, load_project_config};

use crate::cli::Cli;

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // A broken config is reported by Project::open once tracing is up.
    let logging_config = load_project_config(&cli.repo.join(CONFIG_FILE))
        .map(|config| config.logging)
        .unwrap_or_else(|_| LoggingConfig::default());

    if logging_config.file {
        logging::cleanup_old_logs(&cli.repo, logging_config.retention_days);
    }
    let _guard = logging::init_tracing(&cli.repo, cli.verbose, logging_config.file)?;

    cli.run()
}
