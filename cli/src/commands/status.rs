use std::path::Path;

use clap::Args;

use sod_lib::SodError;
use sod_lib::diff::DiffEntry;
use sod_lib::diff::DiffFilter;
use sod_lib::diff::DiffOptions;
use sod_lib::diff::diff;
use sod_lib::scanner::ScanOptions;
use sod_lib::scanner::scan;
use sod_lib::tree_builder::FlatTree;

use crate::cli_util::discover_repo;
use crate::cli_util::head_flat_tree;
use crate::ui::Ui;

#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Bypass the digest cache and rehash every file (spec.md §4.D).
    #[arg(long)]
    pub rehash: bool,
    /// Also descend into directories the ignore rules would otherwise skip.
    #[arg(long)]
    pub ignored: bool,
}

pub fn run(args: &StatusArgs, cwd: &Path, ui: &mut Ui) -> Result<(), SodError> {
    let repo = discover_repo(cwd)?;
    let root = repo.root().to_path_buf();

    let head_flat = head_flat_tree(&repo)?;
    let staged_flat = repo.index.staged_flat(&head_flat);

    let options = ScanOptions { patterns: &[], include_ignored: args.ignored, rehash: args.rehash };
    let scan_output = scan(&root, &repo.digest_cache, &options)?;
    let working_flat: FlatTree =
        scan_output.files.iter().map(|f| (f.path.clone(), (f.digest.clone(), f.mode))).collect();

    let diff_options =
        || DiffOptions { filter: DiffFilter::all(), rename_limit: repo.config.diff.rename_limit };
    let staged_vs_head = diff(&head_flat, &staged_flat, &diff_options());
    let working_vs_staged = diff(&staged_flat, &working_flat, &diff_options());

    if staged_vs_head.is_empty() && working_vs_staged.is_empty() {
        ui.writeln_stdout("clean");
    } else {
        if !staged_vs_head.is_empty() {
            ui.writeln_stdout("staged changes:");
            for entry in &staged_vs_head {
                ui.writeln_stdout(&format!("  {}", render_entry(entry)));
            }
        }
        if !working_vs_staged.is_empty() {
            ui.writeln_stdout("unstaged changes:");
            for entry in &working_vs_staged {
                ui.writeln_stdout(&format!("  {}", render_entry(entry)));
            }
        }
    }
    for error in &scan_output.errors {
        ui.warn(&format!("{}: {}", error.path, error.message));
    }

    repo.save_digest_cache()?;
    Ok(())
}

fn render_entry(entry: &DiffEntry) -> String {
    match &entry.new_path {
        Some(new_path) => format!("{} {} -> {}", entry.status.letter(), entry.old_path, new_path),
        None => format!("{} {}", entry.status.letter(), entry.old_path),
    }
}
