use std::path::Path;

use clap::Args;

use sod_lib::SodError;
use sod_lib::commit_engine::CommitOutcome;
use sod_lib::commit_engine::build_commit;
use sod_lib::commit_engine::introduces_new_content;
use sod_lib::commit_engine::run_snapshot_hook;

use crate::cli_util::discover_repo;
use crate::cli_util::head_flat_tree;
use crate::cli_util::staged_flat_tree;
use crate::ui::Ui;

#[derive(Args, Debug)]
pub struct CommitArgs {
    /// Commit message.
    #[arg(short = 'm', long = "message")]
    pub message: String,
}

pub fn run(args: &CommitArgs, cwd: &Path, ui: &mut Ui) -> Result<(), SodError> {
    let mut repo = discover_repo(cwd)?;

    let head_id = repo.head()?;
    let head_flat = head_flat_tree(&repo)?;
    let staged = staged_flat_tree(&repo)?;
    let author_name = repo.config.author_name();

    let commit = build_commit(&repo.store, head_id.as_ref(), &staged, args.message.clone(), author_name)?;
    let commit_id = repo.store.write_commit(&commit)?;
    repo.set_head(&commit_id)?;
    repo.index.clear();
    repo.save_index()?;

    // Only a commit that actually introduces new content runs the external
    // snapshot hook; a pure rename has nothing new to back up (spec.md §4.H).
    let hook_invoked = introduces_new_content(&head_flat, &staged);
    let hook_warning = hook_invoked.then(|| run_snapshot_hook(&repo.config, &commit_id)).flatten();
    let outcome = CommitOutcome { commit_id, hook_invoked, hook_warning };

    ui.writeln_stdout(&format!("committed {}", outcome.commit_id.hex()));
    if let Some(warning) = &outcome.hook_warning {
        ui.warn(warning);
    }
    Ok(())
}
