//! The differ (module G): tree-vs-tree diff with greedy digest-based
//! rename/copy pairing and letter-based filtering. Grounded on the
//! template's merge-join idiom for comparing two path-keyed maps (see
//! `local_working_copy.rs`'s `FileStatesMap::merge_in`), adapted to a
//! two-tree status-letter diff since rename detection here is digest-only
//! (spec.md's Design Notes: "Rename detection is digest-only, not
//! similarity-based").

use std::collections::BTreeSet;
use std::collections::HashSet;

use thiserror::Error;

use crate::digest::Digest;
use crate::repo_path::RepoPathBuf;
use crate::tree::ModeBits;
use crate::tree_builder::FlatTree;

#[derive(Debug, Error)]
pub enum DiffError {
    #[error("invalid filter letter `{0}`, expected one of A C D M R (case-insensitive)")]
    InvalidFilterLetter(char),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Added,
    Deleted,
    Modified,
    Renamed,
    Copied,
}

impl Status {
    pub fn letter(self) -> char {
        match self {
            Self::Added => 'A',
            Self::Deleted => 'D',
            Self::Modified => 'M',
            Self::Renamed => 'R',
            Self::Copied => 'C',
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffEntry {
    pub status: Status,
    pub old_digest: Digest,
    pub old_path: RepoPathBuf,
    pub new_path: Option<RepoPathBuf>,
}

const ALL_KINDS: [char; 5] = ['A', 'C', 'D', 'M', 'R'];

/// `--filter LETTERS`: uppercase letters request kinds (an OR across
/// whichever kinds are named; naming none requests all five), lowercase
/// letters exclude kinds from that set. This is the documented resolution
/// of spec.md's open question on combining lowercase filter letters — see
/// DESIGN.md.
#[derive(Debug, Clone)]
pub struct DiffFilter {
    wants_copies: bool,
    allowed: BTreeSet<char>,
}

impl DiffFilter {
    pub fn parse(letters: &str) -> Result<Self, DiffError> {
        let mut requested = BTreeSet::new();
        let mut excluded = BTreeSet::new();
        let mut wants_copies = false;
        for c in letters.chars() {
            let upper = c.to_ascii_uppercase();
            if !matches!(upper, 'A' | 'C' | 'D' | 'M' | 'R') {
                return Err(DiffError::InvalidFilterLetter(c));
            }
            if upper == 'C' {
                wants_copies = true;
            }
            if c.is_ascii_uppercase() {
                requested.insert(upper);
            } else {
                excluded.insert(upper);
            }
        }
        let base: BTreeSet<char> = if requested.is_empty() { ALL_KINDS.into_iter().collect() } else { requested };
        let allowed = base.difference(&excluded).copied().collect();
        Ok(Self { wants_copies, allowed })
    }

    pub fn all() -> Self {
        Self { wants_copies: false, allowed: ALL_KINDS.into_iter().collect() }
    }

    /// Copy detection is opt-in: it only runs when `C` (either case)
    /// appears in the filter (spec.md §9 open question, resolved in
    /// DESIGN.md).
    pub fn wants_copies(&self) -> bool {
        self.wants_copies
    }

    pub fn passes(&self, status: Status) -> bool {
        self.allowed.contains(&status.letter())
    }
}

pub struct DiffOptions {
    pub filter: DiffFilter,
    pub rename_limit: u32,
}

fn shared_prefix_len(a: &RepoPathBuf, b: &RepoPathBuf) -> usize {
    a.components().zip(b.components()).take_while(|(x, y)| x == y).count()
}

/// Computes `diff(tree_a, tree_b)`, applying rename/copy pairing and the
/// filter. Output is sorted for deterministic rendering.
#[tracing::instrument(skip_all, fields(a_len = tree_a.len(), b_len = tree_b.len()))]
pub fn diff(tree_a: &FlatTree, tree_b: &FlatTree, options: &DiffOptions) -> Vec<DiffEntry> {
    let mut added = Vec::new();
    let mut deleted = Vec::new();
    let mut modified = Vec::new();
    let mut common = BTreeSet::new();

    let all_paths: BTreeSet<&RepoPathBuf> = tree_a.keys().chain(tree_b.keys()).collect();
    for path in all_paths {
        match (tree_a.get(path), tree_b.get(path)) {
            (None, Some(_)) => added.push(path.clone()),
            (Some(_), None) => deleted.push(path.clone()),
            (Some(a), Some(b)) => {
                common.insert(path.clone());
                if a != b {
                    modified.push(path.clone());
                }
            }
            (None, None) => unreachable!("path came from one of the two maps"),
        }
    }

    let mut paired_additions = HashSet::new();
    let mut paired_deletions = HashSet::new();
    let mut entries = Vec::new();

    // Greedy rename pairing: candidates where digest and mode match exactly.
    let mut candidates: Vec<(RepoPathBuf, RepoPathBuf, usize)> = Vec::new();
    for old in &deleted {
        let (old_digest, old_mode) = &tree_a[old];
        for new in &added {
            let (new_digest, new_mode) = &tree_b[new];
            if old_digest == new_digest && old_mode == new_mode {
                candidates.push((old.clone(), new.clone(), shared_prefix_len(old, new)));
            }
        }
    }
    // Tie-break: longest shared directory prefix wins, then byte order of the
    // new path (spec.md §4.G).
    candidates.sort_by(|a, b| b.2.cmp(&a.2).then_with(|| a.1.as_bytes().cmp(b.1.as_bytes())));

    let mut pairs_attempted = 0u32;
    for (old, new, _) in candidates {
        if paired_deletions.contains(&old) || paired_additions.contains(&new) {
            continue;
        }
        if pairs_attempted >= options.rename_limit {
            break;
        }
        pairs_attempted += 1;
        paired_deletions.insert(old.clone());
        paired_additions.insert(new.clone());
        let old_digest = tree_a[&old].0.clone();
        entries.push(DiffEntry {
            status: Status::Renamed,
            old_digest,
            old_path: old,
            new_path: Some(new),
        });
    }

    // Copy detection only considers additions left unpaired by the rename
    // pass, and only runs when requested (spec.md: disabled by default).
    if options.filter.wants_copies() {
        for new in &added {
            if paired_additions.contains(new) {
                continue;
            }
            let (new_digest, new_mode) = &tree_b[new];
            let source: Option<&RepoPathBuf> = common
                .iter()
                .filter(|candidate: &&RepoPathBuf| tree_a[*candidate] == (new_digest.clone(), *new_mode))
                .min_by(|a: &&RepoPathBuf, b: &&RepoPathBuf| {
                    shared_prefix_len(b, new).cmp(&shared_prefix_len(a, new)).then(a.as_bytes().cmp(b.as_bytes()))
                });
            // (`a`/`b` above are `&&RepoPathBuf`; `RepoPathBuf` methods auto-deref
            // through both references, so `shared_prefix_len`/`as_bytes` apply directly.)
            if let Some(source) = source {
                paired_additions.insert(new.clone());
                entries.push(DiffEntry {
                    status: Status::Copied,
                    old_digest: new_digest.clone(),
                    old_path: source.clone(),
                    new_path: Some(new.clone()),
                });
            }
        }
    }

    for path in &added {
        if paired_additions.contains(path) {
            continue;
        }
        entries.push(DiffEntry {
            status: Status::Added,
            old_digest: Digest::zero(tree_b[path].0.as_bytes().len()),
            old_path: path.clone(),
            new_path: None,
        });
    }
    for path in &deleted {
        if paired_deletions.contains(path) {
            continue;
        }
        entries.push(DiffEntry {
            status: Status::Deleted,
            old_digest: tree_a[path].0.clone(),
            old_path: path.clone(),
            new_path: None,
        });
    }
    for path in &modified {
        entries.push(DiffEntry {
            status: Status::Modified,
            old_digest: tree_a[path].0.clone(),
            old_path: path.clone(),
            new_path: None,
        });
    }

    entries.retain(|entry| options.filter.passes(entry.status));
    entries.sort_by(|a, b| {
        a.old_path
            .as_bytes()
            .cmp(b.old_path.as_bytes())
            .then_with(|| a.new_path.as_ref().map(RepoPathBuf::as_bytes).cmp(&b.new_path.as_ref().map(RepoPathBuf::as_bytes)))
    });
    entries
}

/// Raw diff record separators (spec.md §4.G/§6).
pub struct RawFormat {
    pub field_sep: u8,
    pub record_term: u8,
}

impl RawFormat {
    pub fn tab_newline() -> Self {
        Self { field_sep: b'\t', record_term: b'\n' }
    }

    pub fn null_terminated() -> Self {
        Self { field_sep: 0, record_term: 0 }
    }
}

/// Renders one diff entry in raw format: `STATUS OLD_DIGEST SEP OLD_PATH
/// [SEP NEW_PATH] TERM`.
pub fn render_raw(entry: &DiffEntry, format: &RawFormat, out: &mut Vec<u8>) {
    out.push(entry.status.letter() as u8);
    out.push(b' ');
    out.extend_from_slice(entry.old_digest.hex().as_bytes());
    out.push(format.field_sep);
    out.extend_from_slice(entry.old_path.as_bytes());
    if let Some(new_path) = &entry.new_path {
        out.push(format.field_sep);
        out.extend_from_slice(new_path.as_bytes());
    }
    out.push(format.record_term);
}
