//! `warden` - decide which shell commands an agent may run.

mod cli;
mod commands;
mod terminal_ui;

use std::process::ExitCode;

use clap::Parser;
use console::style;
use warden_core::paths::resolve_project;
use warden_core::WardenContext;

use crate::cli::{Cli, Command};
use crate::commands::CliError;

const EXIT_DENIED: u8 = 1;
const EXIT_ERROR: u8 = 2;

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => code,
        Err(err) => {
            log::error!("{err}");
            eprintln!("{} {err}", style("error:").red().bold());
            ExitCode::from(EXIT_ERROR)
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode, CliError> {
    let mut builder = WardenContext::builder();
    if let Some(dir) = cli.config_dir {
        builder = builder.config_dir(dir);
    }
    let ctx = builder
        .project(resolve_project(cli.project))
        .decision_log(matches!(cli.command, Command::Check(_)))
        .build()
        .map_err(CliError::Usage)?;

    match cli.command {
        Command::Check(args) => {
            let decision = commands::check(&ctx, args)?;
            Ok(if decision.is_approved() {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(EXIT_DENIED)
            })
        }
        Command::Approvals(command) => {
            commands::approvals(&ctx, command)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}
