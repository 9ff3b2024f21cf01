//! Entry point: parses arguments, dispatches to a subcommand, and maps the
//! result to a process exit code (spec.md §6/§7).

mod cli_util;
mod command_error;
mod commands;
mod ui;

use std::process::ExitCode;

use clap::Parser;

use sod_lib::SodError;

use crate::ui::Ui;

#[derive(Parser, Debug)]
#[command(name = "sod", about = "Digest-tracking revision control for large, mostly-immutable file collections")]
struct Cli {
    /// Enable verbose tracing output (equivalent to SOD_DEBUG=1).
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: commands::Command,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    ui::init_tracing(cli.debug);
    let mut ui = Ui::new();

    let cwd = match std::env::current_dir() {
        Ok(cwd) => cwd,
        Err(source) => {
            let error = SodError::IoFailure { path: ".".into(), source };
            let code = command_error::report(&mut ui, &error);
            return ExitCode::from(code as u8);
        }
    };

    match commands::dispatch(&cli.command, &cwd, &mut ui) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => ExitCode::from(command_error::report(&mut ui, &error) as u8),
    }
}
