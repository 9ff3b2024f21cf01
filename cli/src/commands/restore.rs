use std::path::Path;

use clap::Args;

use sod_lib::SodError;
use sod_lib::object_id::CommitId;
use sod_lib::restore::RestoreOutcome;
use sod_lib::restore::restore_one;
use sod_lib::tree_builder::flatten_tree;

use crate::cli_util::compile_patterns;
use crate::cli_util::discover_repo;
use crate::cli_util::load_aux_caches;
use crate::cli_util::matching_paths;
use crate::ui::Ui;

#[derive(Args, Debug)]
pub struct RestoreArgs {
    /// Restore from a specific commit instead of the most recent one that has the path.
    #[arg(long = "at")]
    pub at: Option<String>,
    /// Glob patterns selecting which paths to restore.
    pub patterns: Vec<String>,
}

pub fn run(args: &RestoreArgs, cwd: &Path, ui: &mut Ui) -> Result<(), SodError> {
    let repo = discover_repo(cwd)?;
    let root = repo.root().to_path_buf();

    let head = repo.head()?.ok_or_else(|| SodError::BadArgument("repository has no commits yet".to_string()))?;
    let at = args
        .at
        .as_ref()
        .map(|hex| {
            CommitId::try_from_hex(hex).ok_or_else(|| SodError::BadArgument(format!("`{hex}` is not a commit digest")))
        })
        .transpose()?;

    let target_commit_id = at.clone().unwrap_or_else(|| head.clone());
    let target_commit = repo.store.read_commit(&target_commit_id)?;
    let target_flat = flatten_tree(&repo.store, &target_commit.tree_id)?;

    let patterns = compile_patterns(&args.patterns)?;
    let paths = matching_paths(&target_flat, &patterns);
    if paths.is_empty() {
        return Err(SodError::NoMatch(args.patterns.join(" ")));
    }

    let caches = load_aux_caches(&repo)?;
    for path in paths {
        let outcome = restore_one(&repo.store, &head, at.as_ref(), repo.aux_registry.stores(), &caches, &root, path)?;
        match outcome {
            RestoreOutcome::Restored => ui.writeln_stdout(&format!("restored {path}")),
            RestoreOutcome::AlreadyUpToDate => ui.writeln_stdout(&format!("up to date {path}")),
        }
    }
    Ok(())
}
