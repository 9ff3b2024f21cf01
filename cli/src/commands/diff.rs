use std::path::Path;

use clap::Args;

use sod_lib::SodError;
use sod_lib::digest::abbreviate;
use sod_lib::diff::DiffFilter;
use sod_lib::diff::DiffOptions;
use sod_lib::diff::RawFormat;
use sod_lib::diff::diff;
use sod_lib::diff::render_raw;

use crate::cli_util::TreeRef;
use crate::cli_util::discover_repo;
use crate::cli_util::parse_tree_ref;
use crate::cli_util::resolve_flat_tree;
use crate::ui::Ui;

#[derive(Args, Debug)]
pub struct DiffArgs {
    /// Abbreviate digests to the shortest unambiguous prefix (default).
    #[arg(long)]
    pub abbrev: bool,
    /// Print full digests instead of abbreviating them.
    #[arg(long = "no-abbrev")]
    pub no_abbrev: bool,
    /// Machine-readable tab-separated output.
    #[arg(long)]
    pub raw: bool,
    /// Machine-readable NUL-separated output; implies `--raw`.
    #[arg(long = "null-terminated")]
    pub null_terminated: bool,
    /// Restrict to these status letters, e.g. `AD` (spec.md §4.G).
    #[arg(long)]
    pub filter: Option<String>,
    /// Maximum number of rename pairs considered.
    #[arg(long = "rename-limit")]
    pub rename_limit: Option<u32>,
    /// Left-hand tree (defaults to HEAD).
    pub old: Option<String>,
    /// Right-hand tree (defaults to STAGED).
    pub new: Option<String>,
}

pub fn run(args: &DiffArgs, cwd: &Path, ui: &mut Ui) -> Result<(), SodError> {
    let repo = discover_repo(cwd)?;
    let root = repo.root().to_path_buf();

    let old_ref = match &args.old {
        Some(raw) => parse_tree_ref(raw)?,
        None => TreeRef::Head,
    };
    let new_ref = match &args.new {
        Some(raw) => parse_tree_ref(raw)?,
        None => TreeRef::Staged,
    };
    let old_tree = resolve_flat_tree(&repo, &root, &old_ref)?;
    let new_tree = resolve_flat_tree(&repo, &root, &new_ref)?;

    let filter = match &args.filter {
        Some(letters) => DiffFilter::parse(letters)?,
        None => DiffFilter::all(),
    };
    let rename_limit = args.rename_limit.unwrap_or(repo.config.diff.rename_limit);
    let options = DiffOptions { filter, rename_limit };
    let entries = diff(&old_tree, &new_tree, &options);

    let raw = args.raw || args.null_terminated;
    if raw {
        let format = if args.null_terminated { RawFormat::null_terminated() } else { RawFormat::tab_newline() };
        let mut out = Vec::new();
        for entry in &entries {
            render_raw(entry, &format, &mut out);
        }
        ui.write_stdout_bytes(&out);
        return Ok(());
    }

    let abbrev = args.abbrev || !args.no_abbrev;
    let pool: Vec<_> =
        old_tree.values().chain(new_tree.values()).map(|(digest, _)| digest.clone()).collect();
    for entry in &entries {
        let digest_text = if abbrev {
            abbreviate(&entry.old_digest, pool.clone(), 10)
        } else {
            entry.old_digest.hex()
        };
        let line = match &entry.new_path {
            Some(new_path) => format!("{} {} {} -> {}", entry.status.letter(), digest_text, entry.old_path, new_path),
            None => format!("{} {} {}", entry.status.letter(), digest_text, entry.old_path),
        };
        ui.writeln_stdout(&line);
    }
    Ok(())
}
