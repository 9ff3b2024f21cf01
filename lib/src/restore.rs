//! The restore resolver (module K): locates a digest across auxiliary
//! snapshots and copies its bytes back into the working tree. Grounded on
//! the template's own file-materialization path in `local_working_copy.rs`
//! (create parent directories, write, set permissions), reused here for
//! the write side; the lookup side is new, since the template has no
//! notion of an external byte source.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::aux::AuxStoreConfig;
use crate::aux::SnapshotCache;
use crate::aux::parse_url;
use crate::aux::transport_for;
use crate::digest::Digest;
use crate::digest::hash_bytes;
use crate::object_id::CommitId;
use crate::object_store::ObjectStoreError;
use crate::remote_fs::RemoteFsError;
use crate::repo_path::RepoPathBuf;
use crate::store::Store;
use crate::tree::ModeBits;
use crate::tree_builder::FlatTree;
use crate::tree_builder::flatten_tree;

#[derive(Debug, Error)]
pub enum RestoreError {
    #[error("`{0}` does not exist in the resolved commit's tree")]
    PathNotFound(RepoPathBuf),
    #[error("digest for `{0}` was not found in any auxiliary store")]
    DigestNotFound(RepoPathBuf),
    #[error(transparent)]
    ObjectStore(#[from] ObjectStoreError),
    #[error(transparent)]
    Remote(#[from] RemoteFsError),
    #[error(transparent)]
    Aux(#[from] crate::aux::AuxError),
    #[error("I/O error restoring {path}: {source}")]
    Io {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestoreOutcome {
    Restored,
    AlreadyUpToDate,
}

/// Resolves the `(digest, mode)` a path must be restored to. `at`, when
/// given, pins an exact commit (and the path must exist there); otherwise
/// walks back from `head` to the most recent commit containing the path
/// (spec.md §4.K).
pub fn resolve_target(
    store: &Store,
    head: &CommitId,
    at: Option<&CommitId>,
    path: &RepoPathBuf,
) -> Result<(CommitId, Digest, ModeBits), RestoreError> {
    if let Some(commit_id) = at {
        let commit = store.read_commit(commit_id)?;
        let flat = flatten_tree(store, &commit.tree_id)?;
        let (digest, mode) =
            flat.get(path).cloned().ok_or_else(|| RestoreError::PathNotFound(path.clone()))?;
        return Ok((commit_id.clone(), digest, mode));
    }

    let mut current = Some(head.clone());
    while let Some(id) = current {
        let commit = store.read_commit(&id)?;
        let flat: FlatTree = flatten_tree(store, &commit.tree_id)?;
        if let Some((digest, mode)) = flat.get(path) {
            return Ok((id, digest.clone(), *mode));
        }
        current = commit.parent_id.clone();
    }
    Err(RestoreError::PathNotFound(path.clone()))
}

struct Source<'a> {
    store: &'a AuxStoreConfig,
    root: &'a str,
    path: &'a RepoPathBuf,
}

/// Searches every store's cached snapshots for `digest`, preferring a
/// snapshot whose tree matches `exact_commit_tree_hex` exactly, else any
/// store that has it at all (spec.md §4.K).
fn find_source<'a>(
    aux_stores: &'a [AuxStoreConfig],
    caches: &'a BTreeMap<String, Vec<SnapshotCache>>,
    digest: &Digest,
    exact_commit_tree_hex: Option<&str>,
) -> Option<Source<'a>> {
    let mut fallback: Option<Source<'a>> = None;
    for store in aux_stores {
        let Some(snapshots) = caches.get(&store.name) else { continue };
        for snapshot in snapshots {
            let Some(paths) = snapshot.digest_index.get(digest) else { continue };
            let Some(path) = paths.first() else { continue };
            let is_exact = exact_commit_tree_hex.is_some()
                && snapshot.tree_id_hex.as_deref() == exact_commit_tree_hex;
            if is_exact {
                return Some(Source { store, root: &snapshot.root, path });
            }
            if fallback.is_none() {
                fallback = Some(Source { store, root: &snapshot.root, path });
            }
        }
    }
    fallback
}

/// Writes `bytes` to `repo_path` under `dest_root`, refusing to overwrite
/// a file whose current digest already equals `target_digest` (spec.md
/// §4.K).
fn write_restored_file(
    dest_root: &Path,
    repo_path: &RepoPathBuf,
    target_digest: &Digest,
    target_mode: ModeBits,
    bytes: &[u8],
) -> Result<RestoreOutcome, RestoreError> {
    let fs_path = repo_path.to_fs_path(dest_root);
    if let Ok(existing) = fs::read(&fs_path)
        && &hash_bytes(&existing) == target_digest
    {
        return Ok(RestoreOutcome::AlreadyUpToDate);
    }

    if let Some(parent) = fs_path.parent() {
        fs::create_dir_all(parent)
            .map_err(|source| RestoreError::Io { path: parent.to_path_buf(), source })?;
    }
    fs::write(&fs_path, bytes).map_err(|source| RestoreError::Io { path: fs_path.clone(), source })?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt as _;
        fs::set_permissions(&fs_path, fs::Permissions::from_mode(target_mode.0))
            .map_err(|source| RestoreError::Io { path: fs_path.clone(), source })?;
    }
    #[cfg(not(unix))]
    {
        let _ = target_mode;
    }

    Ok(RestoreOutcome::Restored)
}

/// Restores a single path: resolves its target digest from history,
/// locates a snapshot holding that digest, and writes the bytes into the
/// working tree (spec.md §4.K).
pub fn restore_one(
    store: &Store,
    head: &CommitId,
    at: Option<&CommitId>,
    aux_stores: &[AuxStoreConfig],
    caches: &BTreeMap<String, Vec<SnapshotCache>>,
    dest_root: &Path,
    path: &RepoPathBuf,
) -> Result<RestoreOutcome, RestoreError> {
    let (commit_id, digest, mode) = resolve_target(store, head, at, path)?;
    let commit = store.read_commit(&commit_id)?;
    let tree_hex = commit.tree_id.hex();

    let source = find_source(aux_stores, caches, &digest, Some(&tree_hex))
        .ok_or_else(|| RestoreError::DigestNotFound(path.clone()))?;

    let (kind, host, _) = parse_url(&source.store.url_template)?;
    let transport = transport_for(kind, host);
    let remote_path = format!("{}/{}", source.root, source.path.as_internal_str_lossy());
    let bytes = transport.read_file(&remote_path)?;

    write_restored_file(dest_root, path, &digest, mode, &bytes)
}

/// Restores every tracked path at or under `path` (spec.md §9: restore on
/// a directory is recursive by default).
pub fn restore_recursive(
    store: &Store,
    head: &CommitId,
    at: Option<&CommitId>,
    aux_stores: &[AuxStoreConfig],
    caches: &BTreeMap<String, Vec<SnapshotCache>>,
    dest_root: &Path,
    path: &RepoPathBuf,
) -> Result<Vec<(RepoPathBuf, RestoreOutcome)>, RestoreError> {
    let commit_id = at.cloned().unwrap_or_else(|| head.clone());
    let commit = store.read_commit(&commit_id)?;
    let flat = flatten_tree(store, &commit.tree_id)?;

    let mut targets: Vec<&RepoPathBuf> =
        flat.keys().filter(|p| *p == path || p.starts_with(path)).collect();
    targets.sort();

    let mut results = Vec::new();
    for target in targets {
        let outcome = restore_one(store, head, at, aux_stores, caches, dest_root, target)?;
        results.push((target.clone(), outcome));
    }
    if results.is_empty() {
        return Err(RestoreError::PathNotFound(path.clone()));
    }
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aux::AuxKind;
    use crate::digest::hash_bytes;

    fn source_digest() -> Digest {
        hash_bytes(b"hello")
    }

    #[test]
    fn find_source_prefers_exact_commit_match() {
        let stores = vec![
            AuxStoreConfig { name: "old".to_string(), kind: AuxKind::PlainLocal, url_template: "file:///old".to_string() },
            AuxStoreConfig { name: "exact".to_string(), kind: AuxKind::PlainLocal, url_template: "file:///exact".to_string() },
        ];
        let digest = source_digest();
        let mut caches = BTreeMap::new();
        caches.insert(
            "old".to_string(),
            vec![SnapshotCache {
                root: "/old/s1".to_string(),
                tree_id_hex: Some("deadbeef".to_string()),
                digest_index: BTreeMap::from([(digest.clone(), vec![RepoPathBuf::parse("a.txt").unwrap()])]),
            }],
        );
        caches.insert(
            "exact".to_string(),
            vec![SnapshotCache {
                root: "/exact/s1".to_string(),
                tree_id_hex: Some("cafef00d".to_string()),
                digest_index: BTreeMap::from([(digest.clone(), vec![RepoPathBuf::parse("a.txt").unwrap()])]),
            }],
        );

        let found = find_source(&stores, &caches, &digest, Some("cafef00d")).unwrap();
        assert_eq!(found.store.name, "exact");
    }

    #[test]
    fn find_source_falls_back_to_any_match() {
        let stores = vec![AuxStoreConfig {
            name: "only".to_string(),
            kind: AuxKind::PlainLocal,
            url_template: "file:///only".to_string(),
        }];
        let digest = source_digest();
        let mut caches = BTreeMap::new();
        caches.insert(
            "only".to_string(),
            vec![SnapshotCache {
                root: "/only/s1".to_string(),
                tree_id_hex: Some("abc123".to_string()),
                digest_index: BTreeMap::from([(digest.clone(), vec![RepoPathBuf::parse("a.txt").unwrap()])]),
            }],
        );

        let found = find_source(&stores, &caches, &digest, Some("different-tree")).unwrap();
        assert_eq!(found.store.name, "only");
    }

    #[test]
    fn write_restored_file_refuses_noop_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = RepoPathBuf::parse("a.txt").unwrap();
        fs::write(dir.path().join("a.txt"), b"hello").unwrap();

        let outcome =
            write_restored_file(dir.path(), &path, &hash_bytes(b"hello"), ModeBits::REGULAR, b"hello").unwrap();
        assert_eq!(outcome, RestoreOutcome::AlreadyUpToDate);
    }

    #[test]
    fn write_restored_file_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = RepoPathBuf::parse("nested/a.txt").unwrap();

        let outcome =
            write_restored_file(dir.path(), &path, &hash_bytes(b"hello"), ModeBits::REGULAR, b"hello").unwrap();
        assert_eq!(outcome, RestoreOutcome::Restored);
        assert_eq!(fs::read(dir.path().join("nested/a.txt")).unwrap(), b"hello");
    }
}
