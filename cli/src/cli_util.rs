//! Shared helpers for command handlers. Grounded on the template's own
//! `CommandHelper`, trimmed down: sod always talks to one synchronous,
//! single-backend repository, so there is no workspace-of-workspaces or
//! backend-selection machinery to carry over.

use std::collections::BTreeMap;
use std::path::Path;

use sod_lib::Repo;
use sod_lib::SodError;
use sod_lib::aux::SnapshotCache;
use sod_lib::object_id::CommitId;
use sod_lib::pattern::Pattern;
use sod_lib::repo_path::RepoPathBuf;
use sod_lib::tree_builder::FlatTree;
use sod_lib::tree_builder::flatten_tree;

/// Opens the repository containing `start`, searching upward (spec.md
/// §4's repository-discovery convention, shared by every subcommand except
/// `init`).
pub fn discover_repo(start: &Path) -> Result<Repo, SodError> {
    Ok(Repo::discover(start)?)
}

/// Compiles every raw pattern argument, surfacing a bad glob as
/// `SodError::BadArgument` rather than a panic.
pub fn compile_patterns(raw: &[String]) -> Result<Vec<Pattern>, SodError> {
    raw.iter().map(|s| Ok(Pattern::compile(s)?)).collect()
}

/// The tree references a `diff`/`restore` argument can name: a specific
/// commit, the current HEAD, the current staging area, or a fresh scan of
/// the working tree.
pub enum TreeRef {
    Commit(CommitId),
    Head,
    Staged,
    Working,
}

/// Parses one `diff` positional argument: the literals `HEAD`/`STAGED`/
/// `WORKING`, or a full hex commit digest.
pub fn parse_tree_ref(raw: &str) -> Result<TreeRef, SodError> {
    match raw {
        "HEAD" => Ok(TreeRef::Head),
        "STAGED" => Ok(TreeRef::Staged),
        "WORKING" => Ok(TreeRef::Working),
        hex => CommitId::try_from_hex(hex)
            .map(TreeRef::Commit)
            .ok_or_else(|| SodError::BadArgument(format!("`{hex}` is not a commit digest, HEAD, STAGED, or WORKING"))),
    }
}

/// Materializes a [`TreeRef`] into a flat path→(digest, mode) map.
pub fn resolve_flat_tree(repo: &Repo, root: &Path, tree_ref: &TreeRef) -> Result<FlatTree, SodError> {
    match tree_ref {
        TreeRef::Commit(id) => {
            let commit = repo.store.read_commit(id)?;
            Ok(flatten_tree(&repo.store, &commit.tree_id)?)
        }
        TreeRef::Head => head_flat_tree(repo),
        TreeRef::Staged => staged_flat_tree(repo),
        TreeRef::Working => scan_working_tree(repo, root),
    }
}

/// Loads every registered auxiliary store's cached snapshot list, keyed by
/// store name — the shape both `log` and `restore` need to annotate/locate
/// against (spec.md §4.I, §4.K).
pub fn load_aux_caches(repo: &Repo) -> Result<BTreeMap<String, Vec<SnapshotCache>>, SodError> {
    let mut caches = BTreeMap::new();
    for store in repo.aux_registry.stores() {
        let cache_dir = repo.aux_cache_dir(&store.name);
        caches.insert(store.name.clone(), sod_lib::aux::load_cache(&cache_dir)?);
    }
    Ok(caches)
}

/// STAGED = HEAD with every recorded override applied.
pub fn staged_flat_tree(repo: &Repo) -> Result<FlatTree, SodError> {
    let head_flat = head_flat_tree(repo)?;
    Ok(repo.index.staged_flat(&head_flat))
}

/// HEAD's flattened tree, or the empty tree on an unborn repository.
pub fn head_flat_tree(repo: &Repo) -> Result<FlatTree, SodError> {
    match repo.head()? {
        Some(id) => {
            let commit = repo.store.read_commit(&id)?;
            Ok(flatten_tree(&repo.store, &commit.tree_id)?)
        }
        None => Ok(FlatTree::new()),
    }
}

/// Scans the live working tree rooted at `root`, consulting the digest
/// cache so unchanged files are never rehashed.
pub fn scan_working_tree(repo: &Repo, root: &Path) -> Result<FlatTree, SodError> {
    use sod_lib::scanner::ScanOptions;
    use sod_lib::scanner::scan;

    let options = ScanOptions { patterns: &[], include_ignored: false, rehash: false };
    let output = scan(root, &repo.digest_cache, &options)?;
    Ok(output
        .files
        .into_iter()
        .map(|file| (file.path, (file.digest, file.mode)))
        .collect())
}

/// Every path in `tree` matched by at least one of `patterns`, or every
/// path if `patterns` is empty (sod's "no patterns means everything"
/// convention, matching [`Pattern::matches`]'s directory-expansion rule).
pub fn matching_paths<'a>(tree: &'a FlatTree, patterns: &[Pattern]) -> Vec<&'a RepoPathBuf> {
    tree.keys()
        .filter(|path| patterns.is_empty() || patterns.iter().any(|p| p.matches(path)))
        .collect()
}
