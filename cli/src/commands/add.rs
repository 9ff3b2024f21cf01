use std::path::Path;

use clap::Args;

use sod_lib::SodError;

use crate::cli_util::compile_patterns;
use crate::cli_util::discover_repo;
use crate::cli_util::head_flat_tree;
use crate::cli_util::scan_working_tree;
use crate::ui::Ui;

#[derive(Args, Debug)]
pub struct AddArgs {
    /// Glob patterns selecting which paths to stage (spec.md §4.B).
    pub patterns: Vec<String>,
}

pub fn run(args: &AddArgs, cwd: &Path, ui: &mut Ui) -> Result<(), SodError> {
    let mut repo = discover_repo(cwd)?;
    let root = repo.root().to_path_buf();
    let patterns = compile_patterns(&args.patterns)?;

    let head_flat = head_flat_tree(&repo)?;
    let working_flat = scan_working_tree(&repo, &root)?;

    let matched = repo.index.add(&patterns, &head_flat, &working_flat);
    if matched == 0 {
        return Err(SodError::NoMatch(args.patterns.join(" ")));
    }

    repo.save_index()?;
    repo.save_digest_cache()?;
    ui.writeln_stdout(&format!("staged {matched} path(s)"));
    Ok(())
}
