//! On-disk content-addressed object storage (module C): sharded two-level
//! hex layout under `.sod/objects`, write-temp-then-rename persistence.
//! Grounded on the template's `SimpleBackend`, minus the protobuf framing.

use std::io;
use std::path::Path;
use std::path::PathBuf;

use tempfile::NamedTempFile;
use thiserror::Error;

use crate::canonical::read_object_header;
use crate::canonical::write_object_header;
use crate::commit::Commit;
use crate::commit::CommitError;
use crate::digest::Digest;
use crate::file_util::persist_content_addressed_temp_file;
use crate::object_id::CommitId;
use crate::object_id::ObjectId as _;
use crate::object_id::TreeId;
use crate::tree::Tree;
use crate::tree::TreeError;

#[derive(Debug, Error)]
pub enum ObjectStoreError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("object {digest} not found")]
    NotFound { digest: String },
    #[error("object {digest} has unexpected kind header `{found}`, expected `{expected}`")]
    WrongKind { digest: String, found: String, expected: String },
    #[error("object {digest} is corrupt: {source}")]
    CorruptTree {
        digest: String,
        #[source]
        source: TreeError,
    },
    #[error("object {digest} is corrupt: {source}")]
    CorruptCommit {
        digest: String,
        #[source]
        source: CommitError,
    },
}

/// Shards a digest into the two-level `objects/<xx>/<rest>` layout
/// (spec.md §4.C).
fn object_path(root: &Path, digest: &Digest) -> PathBuf {
    let hex = digest.hex();
    let (shard, rest) = hex.split_at(2);
    root.join("objects").join(shard).join(rest)
}

/// The bare on-disk object store: no caching, just reads and
/// content-addressed writes. Wrapped by [`crate::store::Store`], which adds
/// an LRU read cache.
pub struct ObjectStore {
    root: PathBuf,
}

impl ObjectStore {
    pub fn new(sod_dir: PathBuf) -> Self {
        Self { root: sod_dir }
    }

    fn read_raw(&self, digest: &Digest) -> Result<Vec<u8>, ObjectStoreError> {
        let path = object_path(&self.root, digest);
        std::fs::read(&path).map_err(|source| {
            if source.kind() == io::ErrorKind::NotFound {
                ObjectStoreError::NotFound { digest: digest.hex() }
            } else {
                ObjectStoreError::Io { path, source }
            }
        })
    }

    fn write_raw(&self, digest: &Digest, kind: &str, body: &[u8]) -> Result<(), ObjectStoreError> {
        let path = object_path(&self.root, digest);
        let shard_dir = path.parent().expect("object path always has a shard parent");
        std::fs::create_dir_all(shard_dir)
            .map_err(|source| ObjectStoreError::Io { path: shard_dir.to_path_buf(), source })?;

        let mut temp_file = NamedTempFile::new_in(shard_dir)
            .map_err(|source| ObjectStoreError::Io { path: shard_dir.to_path_buf(), source })?;
        write_object_header(&mut temp_file, kind, body)
            .map_err(|source| ObjectStoreError::Io { path: path.clone(), source })?;
        persist_content_addressed_temp_file(temp_file, &path)
            .map_err(|source| ObjectStoreError::Io { path, source })?;
        Ok(())
    }

    pub fn write_tree(&self, tree: &Tree) -> Result<TreeId, ObjectStoreError> {
        let digest = tree.digest();
        self.write_raw(&digest, "tree", &tree.serialize())?;
        Ok(TreeId::new(digest))
    }

    pub fn read_tree(&self, id: &TreeId) -> Result<Tree, ObjectStoreError> {
        let raw = self.read_raw(id.digest())?;
        let (kind, body) = read_object_header(&raw)
            .ok_or_else(|| ObjectStoreError::NotFound { digest: id.hex() })?;
        if kind != "tree" {
            return Err(ObjectStoreError::WrongKind {
                digest: id.hex(),
                found: kind.to_string(),
                expected: "tree".to_string(),
            });
        }
        Tree::deserialize(body)
            .map_err(|source| ObjectStoreError::CorruptTree { digest: id.hex(), source })
    }

    pub fn write_commit(&self, commit: &Commit) -> Result<CommitId, ObjectStoreError> {
        let digest = commit.digest_id().digest().clone();
        self.write_raw(&digest, "commit", &commit.serialize())?;
        Ok(CommitId::new(digest))
    }

    pub fn read_commit(&self, id: &CommitId) -> Result<Commit, ObjectStoreError> {
        let raw = self.read_raw(id.digest())?;
        let (kind, body) = read_object_header(&raw)
            .ok_or_else(|| ObjectStoreError::NotFound { digest: id.hex() })?;
        if kind != "commit" {
            return Err(ObjectStoreError::WrongKind {
                digest: id.hex(),
                found: kind.to_string(),
                expected: "commit".to_string(),
            });
        }
        Commit::deserialize(body)
            .map_err(|source| ObjectStoreError::CorruptCommit { digest: id.hex(), source })
    }

    pub fn contains(&self, digest: &Digest) -> bool {
        object_path(&self.root, digest).is_file()
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;
    use crate::digest::hash_bytes;
    use crate::tree::ModeBits;
    use crate::tree::TreeEntry;
    use crate::tree::TreeValue;
    use chrono::DateTime;

    fn store() -> (tempfile::TempDir, ObjectStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = ObjectStore::new(dir.path().to_path_buf());
        (dir, store)
    }

    #[test]
    fn tree_roundtrips_through_store() {
        let (_dir, store) = store();
        let tree = Tree::from_entries(vec![TreeEntry {
            name: "a.txt".to_string(),
            value: TreeValue::File { digest: hash_bytes(b"hello"), mode: ModeBits::REGULAR },
        }]);
        let id = store.write_tree(&tree).unwrap();
        let read_back = store.read_tree(&id).unwrap();
        assert_eq!(tree, read_back);
        assert!(store.contains(id.digest()));
    }

    #[test]
    fn commit_roundtrips_through_store() {
        let (_dir, store) = store();
        let tree_id = store.write_tree(&Tree::empty()).unwrap();
        let commit = Commit {
            tree_id,
            parent_id: None,
            author_name: "jane".to_string(),
            timestamp: DateTime::parse_from_rfc3339("2026-07-30T00:00:00+00:00").unwrap(),
            message: "initial".to_string(),
        };
        let id = store.write_commit(&commit).unwrap();
        assert_eq!(store.read_commit(&id).unwrap(), commit);
    }

    #[test]
    fn missing_object_is_not_found() {
        let (_dir, store) = store();
        let bogus = TreeId::from_bytes(b"does-not-exist");
        assert_matches!(store.read_tree(&bogus), Err(ObjectStoreError::NotFound { .. }));
    }

    #[test]
    fn writing_same_content_twice_is_idempotent() {
        let (_dir, store) = store();
        let tree = Tree::empty();
        let a = store.write_tree(&tree).unwrap();
        let b = store.write_tree(&tree).unwrap();
        assert_eq!(a, b);
    }
}
