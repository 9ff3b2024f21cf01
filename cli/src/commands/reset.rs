use std::path::Path;

use clap::Args;

use sod_lib::SodError;

use crate::cli_util::compile_patterns;
use crate::cli_util::discover_repo;
use crate::ui::Ui;

#[derive(Args, Debug)]
pub struct ResetArgs {
    /// Glob patterns selecting which staged paths to revert to HEAD.
    pub patterns: Vec<String>,
}

pub fn run(args: &ResetArgs, cwd: &Path, ui: &mut Ui) -> Result<(), SodError> {
    let mut repo = discover_repo(cwd)?;
    let patterns = compile_patterns(&args.patterns)?;

    let matched = repo.index.reset(&patterns);
    if matched == 0 {
        return Err(SodError::NoMatch(args.patterns.join(" ")));
    }

    repo.save_index()?;
    ui.writeln_stdout(&format!("unstaged {matched} path(s)"));
    Ok(())
}
