//! The commit engine (module H): materializes STAGED into a tree, writes a
//! commit object, updates the ref, and invokes the external snapshot hook.
//! Grounded on the template's `tree_builder.rs` bottom-up materialization
//! and `ssh_signing.rs`'s `std::process::Command` invocation pattern for
//! the hook.

use std::process::Command;
use std::time::Duration;
use std::time::Instant;

use chrono::Local;
use thiserror::Error;

use crate::commit::Commit;
use crate::config::Config;
use crate::object_id::CommitId;
use crate::object_store::ObjectStoreError;
use crate::store::Store;
use crate::tree_builder::FlatTree;
use crate::tree_builder::build_tree_from_flat;
use crate::tree_builder::flatten_tree;

#[derive(Debug, Error)]
pub enum CommitEngineError {
    #[error("nothing to commit: staged tree equals HEAD")]
    NothingToCommit,
    #[error(transparent)]
    ObjectStore(#[from] ObjectStoreError),
}

pub struct CommitOutcome {
    pub commit_id: CommitId,
    pub hook_invoked: bool,
    pub hook_warning: Option<String>,
}

/// Commits `staged` as a child of `head_id` (`None` for the initial
/// commit). Refuses empty commits (spec.md §4.H). Does not update the ref
/// or run the hook itself — callers do that only after this succeeds, so a
/// failure here never leaves a half-written commit visible.
#[tracing::instrument(skip(store, head_id, staged, author_name, message), fields(parent = ?head_id.map(CommitId::hex)))]
pub fn build_commit(
    store: &Store,
    head_id: Option<&CommitId>,
    staged: &FlatTree,
    message: String,
    author_name: String,
) -> Result<Commit, CommitEngineError> {
    let head_tree_flat = match head_id {
        Some(id) => {
            let head_commit = store.read_commit(id)?;
            flatten_tree(store, &head_commit.tree_id)?
        }
        None => FlatTree::new(),
    };

    if *staged == head_tree_flat {
        return Err(CommitEngineError::NothingToCommit);
    }

    let tree_id = build_tree_from_flat(store, staged)?;
    Ok(Commit {
        tree_id,
        parent_id: head_id.cloned(),
        author_name,
        timestamp: Local::now().fixed_offset(),
        message,
    })
}

/// True if committing `staged` atop `head_tree_flat` introduces content
/// that did not exist anywhere in HEAD's tree — i.e. more than a pure
/// rename (spec.md §4.H step 4).
pub fn introduces_new_content(head_tree_flat: &FlatTree, staged: &FlatTree) -> bool {
    use std::collections::HashSet;
    let head_digests: HashSet<_> = head_tree_flat.values().map(|(digest, _)| digest).collect();
    staged.values().any(|(digest, _)| !head_digests.contains(digest))
}

/// Invokes `config.snapshot.command` with the new commit's digest as its
/// sole argument. Failure is a warning, never fatal (spec.md §4.H, §6).
pub fn run_snapshot_hook(config: &Config, commit_id: &CommitId) -> Option<String> {
    let command_line = config.snapshot.command.as_ref()?;
    let timeout = config.snapshot.command_timeout_secs.map(Duration::from_secs);

    tracing::info!(command = %command_line, commit = %commit_id.hex(), "invoking snapshot hook");

    let mut command = build_shell_command(command_line);
    command.arg(commit_id.hex());

    let mut child = match command.spawn() {
        Ok(child) => child,
        Err(error) => return Some(format!("failed to start snapshot command: {error}")),
    };

    let start = Instant::now();
    loop {
        match child.try_wait() {
            Ok(Some(status)) => {
                return if status.success() {
                    None
                } else {
                    Some(format!("snapshot command exited with {status}"))
                };
            }
            Ok(None) => {
                if let Some(timeout) = timeout
                    && start.elapsed() > timeout
                {
                    let _ = child.kill();
                    return Some(format!("snapshot command timed out after {timeout:?}"));
                }
                std::thread::sleep(Duration::from_millis(20));
            }
            Err(error) => return Some(format!("failed to wait on snapshot command: {error}")),
        }
    }
}

#[cfg(unix)]
fn build_shell_command(command_line: &str) -> Command {
    let mut command = Command::new("/bin/sh");
    command.arg("-c").arg(command_line);
    command
}

#[cfg(not(unix))]
fn build_shell_command(command_line: &str) -> Command {
    let mut command = Command::new("cmd");
    command.arg("/C").arg(command_line);
    command
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;
    use crate::digest::hash_bytes;
    use crate::object_store::ObjectStore;
    use crate::repo_path::RepoPathBuf;
    use crate::tree::ModeBits;

    fn store() -> (tempfile::TempDir, Store) {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::new(ObjectStore::new(dir.path().to_path_buf()));
        (dir, store)
    }

    #[test]
    fn empty_commit_is_refused() {
        let (_dir, store) = store();
        let empty = FlatTree::new();
        let result = build_commit(&store, None, &empty, "msg".to_string(), "jane".to_string());
        assert_matches!(result, Err(CommitEngineError::NothingToCommit));
    }

    #[test]
    fn first_commit_has_no_parent() {
        let (_dir, store) = store();
        let mut staged = FlatTree::new();
        staged.insert(RepoPathBuf::parse("a.txt").unwrap(), (hash_bytes(b"hello"), ModeBits::REGULAR));
        let commit = build_commit(&store, None, &staged, "initial".to_string(), "jane".to_string()).unwrap();
        assert!(commit.is_root());
    }

    #[test]
    fn new_content_is_detected_but_pure_rename_is_not() {
        let mut head = FlatTree::new();
        head.insert(RepoPathBuf::parse("a").unwrap(), (hash_bytes(b"x"), ModeBits::REGULAR));

        let mut renamed = FlatTree::new();
        renamed.insert(RepoPathBuf::parse("b").unwrap(), (hash_bytes(b"x"), ModeBits::REGULAR));
        assert!(!introduces_new_content(&head, &renamed));

        let mut with_new_content = FlatTree::new();
        with_new_content.insert(RepoPathBuf::parse("a").unwrap(), (hash_bytes(b"y"), ModeBits::REGULAR));
        assert!(introduces_new_content(&head, &with_new_content));
    }
}
