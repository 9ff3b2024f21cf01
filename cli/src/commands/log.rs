use std::path::Path;

use clap::Args;

use sod_lib::SodError;
use sod_lib::log::walk;

use crate::cli_util::discover_repo;
use crate::cli_util::load_aux_caches;
use crate::ui::Ui;

#[derive(Args, Debug)]
pub struct LogArgs {}

pub fn run(_args: &LogArgs, cwd: &Path, ui: &mut Ui) -> Result<(), SodError> {
    let repo = discover_repo(cwd)?;
    let head = repo.head()?;
    let aux_caches = load_aux_caches(&repo)?;

    let entries = walk(&repo.store, head, &aux_caches)?;
    for entry in &entries {
        let mut line = format!("{} {}", entry.commit_id.hex(), entry.commit.message);
        if !entry.aux_matches.is_empty() {
            line.push_str(&format!(" [{}]", entry.aux_matches.join(", ")));
        }
        ui.writeln_stdout(&line);
    }
    Ok(())
}
