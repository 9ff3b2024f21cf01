//! The staging index (module F): the delta between HEAD and STAGED,
//! persisted at `.sod/index`. Grounded on the template's `TreeBuilder`
//! `Override` enum (tombstone vs replace), kept as a flat, directly
//! persisted map rather than a lazily-populated tree overlay, since sod's
//! staging area is small relative to a full scan.

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::digest::Digest;
use crate::file_util::persist_temp_file;
use crate::pattern::Pattern;
use crate::repo_path::RepoPathBuf;
use crate::tree::ModeBits;
use crate::tree_builder::FlatTree;

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("I/O error on index file: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed index file: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// What STAGED records for one path relative to HEAD.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Override {
    /// The path is staged for deletion.
    Tombstone,
    /// The path is staged with this content.
    Replace(Digest, ModeBits),
}

/// The persisted STAGED delta: every path whose staged state differs from
/// HEAD. A path absent from `overrides` is implicitly unchanged (STAGED
/// value equals HEAD's).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Index {
    overrides: BTreeMap<RepoPathBuf, Override>,
}

impl Index {
    pub fn load(path: &Path) -> Result<Self, IndexError> {
        match fs::read(path) {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(source) => Err(source.into()),
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), IndexError> {
        let dir = path.parent().expect("index path always has a parent");
        fs::create_dir_all(dir)?;
        let bytes = serde_json::to_vec(&self.overrides)?;
        let mut temp_file = tempfile::NamedTempFile::new_in(dir)?;
        std::io::Write::write_all(&mut temp_file, &bytes)?;
        persist_temp_file(temp_file, path)?;
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.overrides.is_empty()
    }

    /// STAGED = HEAD with every override applied.
    pub fn staged_flat(&self, head_flat: &FlatTree) -> FlatTree {
        let mut staged = head_flat.clone();
        for (path, over) in &self.overrides {
            match over {
                Override::Tombstone => {
                    staged.remove(path);
                }
                Override::Replace(digest, mode) => {
                    staged.insert(path.clone(), (digest.clone(), *mode));
                }
            }
        }
        staged
    }

    /// Applies `patterns` to the union of working-tree paths and currently
    /// tracked (STAGED) paths, transcribing each matched path's WORKING
    /// state vs HEAD into STAGED (spec.md §4.F). Returns the number of
    /// paths matched, so callers can raise `NoMatch` on zero.
    pub fn add(&mut self, patterns: &[Pattern], head_flat: &FlatTree, working_flat: &FlatTree) -> usize {
        let staged_before = self.staged_flat(head_flat);
        let candidates: BTreeSet<&RepoPathBuf> =
            working_flat.keys().chain(staged_before.keys()).collect();

        let mut matched = 0;
        for path in candidates {
            if !patterns.iter().any(|p| p.matches(path)) {
                continue;
            }
            matched += 1;
            match working_flat.get(path) {
                Some((digest, mode)) => {
                    if head_flat.get(path) == Some(&(digest.clone(), *mode)) {
                        self.overrides.remove(path);
                    } else {
                        self.overrides.insert(path.clone(), Override::Replace(digest.clone(), *mode));
                    }
                }
                None => {
                    if head_flat.contains_key(path) {
                        self.overrides.insert(path.clone(), Override::Tombstone);
                    } else {
                        self.overrides.remove(path);
                    }
                }
            }
        }
        matched
    }

    /// Reverts every matched STAGED path back to its HEAD state (spec.md
    /// §4.F). Returns the number of paths matched.
    pub fn reset(&mut self, patterns: &[Pattern]) -> usize {
        let matched: Vec<RepoPathBuf> = self
            .overrides
            .keys()
            .filter(|path| patterns.iter().any(|p| p.matches(path)))
            .cloned()
            .collect();
        for path in &matched {
            self.overrides.remove(path);
        }
        matched.len()
    }

    /// Clears the staged delta entirely. Used by the commit engine once
    /// STAGED has been committed, since the new HEAD now equals STAGED.
    pub fn clear(&mut self) {
        self.overrides.clear();
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::digest::hash_bytes;

    fn flat(entries: &[(&str, &[u8])]) -> FlatTree {
        entries
            .iter()
            .map(|(path, content)| {
                (RepoPathBuf::parse(*path).unwrap(), (hash_bytes(content), ModeBits::REGULAR))
            })
            .collect()
    }

    #[test]
    fn add_stages_new_file() {
        let head = flat(&[]);
        let working = flat(&[("a.txt", b"hello")]);
        let mut index = Index::default();
        let matched = index.add(&[Pattern::compile("a.txt").unwrap()], &head, &working);
        assert_eq!(matched, 1);
        assert_eq!(index.staged_flat(&head), working);
    }

    #[test]
    fn add_is_idempotent() {
        let head = flat(&[]);
        let working = flat(&[("a.txt", b"hello")]);
        let mut index = Index::default();
        let pattern = [Pattern::compile("a.txt").unwrap()];
        index.add(&pattern, &head, &working);
        let after_first = index.clone();
        index.add(&pattern, &head, &working);
        assert_eq!(index.overrides, after_first.overrides);
    }

    #[test]
    fn add_then_reset_restores_prior_state() {
        let head = flat(&[("a.txt", b"hello")]);
        let working = flat(&[("a.txt", b"goodbye")]);
        let mut index = Index::default();
        let pattern = [Pattern::compile("a.txt").unwrap()];
        let before = index.clone();
        index.add(&pattern, &head, &working);
        assert_ne!(index.overrides, before.overrides);
        index.reset(&pattern);
        assert_eq!(index.overrides, before.overrides);
    }

    #[test]
    fn add_stages_deletion_of_tracked_file_missing_from_disk() {
        let head = flat(&[("a.txt", b"hello")]);
        let working = flat(&[]);
        let mut index = Index::default();
        let matched = index.add(&[Pattern::compile("a.txt").unwrap()], &head, &working);
        assert_eq!(matched, 1);
        assert!(index.staged_flat(&head).is_empty());
    }
}
