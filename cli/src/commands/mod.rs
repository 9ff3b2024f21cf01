//! Subcommand dispatch. Grounded on the template's own `Command` enum +
//! `run_command` match, trimmed to sod's ten subcommands.

use std::path::Path;

use clap::Subcommand;

use sod_lib::SodError;

use crate::ui::Ui;

pub mod add;
pub mod aux;
pub mod commit;
pub mod config;
pub mod diff;
pub mod init;
pub mod log;
pub mod reset;
pub mod restore;
pub mod status;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create a new, empty repository.
    Init(init::InitArgs),
    /// Show staged and unstaged changes against the working tree.
    Status(status::StatusArgs),
    /// Stage matching paths.
    Add(add::AddArgs),
    /// Unstage matching paths, reverting them to HEAD.
    Reset(reset::ResetArgs),
    /// Commit the staged changes.
    Commit(commit::CommitArgs),
    /// Show commit history.
    Log(log::LogArgs),
    /// Show the diff between two trees.
    Diff(diff::DiffArgs),
    /// Restore paths from an auxiliary snapshot.
    Restore(restore::RestoreArgs),
    /// Inspect or change repository configuration.
    Config(config::ConfigArgs),
    /// Manage auxiliary snapshot stores.
    Aux(aux::AuxArgs),
}

#[tracing::instrument(skip(cwd, ui))]
pub fn dispatch(command: &Command, cwd: &Path, ui: &mut Ui) -> Result<(), SodError> {
    match command {
        Command::Init(args) => init::run(args, cwd, ui),
        Command::Status(args) => status::run(args, cwd, ui),
        Command::Add(args) => add::run(args, cwd, ui),
        Command::Reset(args) => reset::run(args, cwd, ui),
        Command::Commit(args) => commit::run(args, cwd, ui),
        Command::Log(args) => log::run(args, cwd, ui),
        Command::Diff(args) => diff::run(args, cwd, ui),
        Command::Restore(args) => restore::run(args, cwd, ui),
        Command::Config(args) => config::run(args, cwd, ui),
        Command::Aux(args) => aux::run(args, cwd, ui),
    }
}
