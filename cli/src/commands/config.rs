use std::path::Path;

use clap::Args;
use clap::Subcommand;

use sod_lib::SodError;

use crate::cli_util::discover_repo;
use crate::ui::Ui;

#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Print the value of a single key.
    Get { key: String },
    /// Set a key to a value.
    Set { key: String, value: String },
    /// Print every configured key.
    List,
}

pub fn run(args: &ConfigArgs, cwd: &Path, ui: &mut Ui) -> Result<(), SodError> {
    let mut repo = discover_repo(cwd)?;
    match &args.action {
        ConfigAction::Get { key } => match repo.config.get(key)? {
            Some(value) => ui.writeln_stdout(&value),
            None => return Err(SodError::BadArgument(format!("key `{key}` is not set"))),
        },
        ConfigAction::Set { key, value } => {
            repo.config.set(key, value)?;
            repo.save_config()?;
        }
        ConfigAction::List => {
            for (key, value) in repo.config.as_map() {
                ui.writeln_stdout(&format!("{key}={value}"));
            }
        }
    }
    Ok(())
}
