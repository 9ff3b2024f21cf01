//! Bounded-LRU read cache in front of [`crate::object_store::ObjectStore`].
//! Grounded on the template's own `Store`, minus the async backend trait
//! and the signing machinery sod has no use for.

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::sync::Mutex;

use clru::CLruCache;

use crate::commit::Commit;
use crate::object_id::CommitId;
use crate::object_id::TreeId;
use crate::object_store::ObjectStore;
use crate::object_store::ObjectStoreError;
use crate::tree::Tree;

const COMMIT_CACHE_CAPACITY: usize = 100;
const TREE_CACHE_CAPACITY: usize = 1000;

/// Wraps the on-disk object store and adds read-through caching. Writes
/// always go to disk immediately (objects are append-only and content
/// addressed, so there is nothing to batch).
pub struct Store {
    backend: ObjectStore,
    commit_cache: Mutex<CLruCache<CommitId, Arc<Commit>>>,
    tree_cache: Mutex<CLruCache<TreeId, Arc<Tree>>>,
}

impl Store {
    pub fn new(backend: ObjectStore) -> Self {
        Self {
            backend,
            commit_cache: Mutex::new(CLruCache::new(
                NonZeroUsize::new(COMMIT_CACHE_CAPACITY).unwrap(),
            )),
            tree_cache: Mutex::new(CLruCache::new(NonZeroUsize::new(TREE_CACHE_CAPACITY).unwrap())),
        }
    }

    pub fn write_tree(&self, tree: &Tree) -> Result<TreeId, ObjectStoreError> {
        let id = self.backend.write_tree(tree)?;
        self.tree_cache.lock().unwrap().put(id.clone(), Arc::new(tree.clone()));
        Ok(id)
    }

    pub fn read_tree(&self, id: &TreeId) -> Result<Arc<Tree>, ObjectStoreError> {
        if let Some(cached) = self.tree_cache.lock().unwrap().get(id) {
            return Ok(cached.clone());
        }
        let tree = Arc::new(self.backend.read_tree(id)?);
        self.tree_cache.lock().unwrap().put(id.clone(), tree.clone());
        Ok(tree)
    }

    pub fn write_commit(&self, commit: &Commit) -> Result<CommitId, ObjectStoreError> {
        let id = self.backend.write_commit(commit)?;
        self.commit_cache.lock().unwrap().put(id.clone(), Arc::new(commit.clone()));
        Ok(id)
    }

    pub fn read_commit(&self, id: &CommitId) -> Result<Arc<Commit>, ObjectStoreError> {
        if let Some(cached) = self.commit_cache.lock().unwrap().get(id) {
            return Ok(cached.clone());
        }
        let commit = Arc::new(self.backend.read_commit(id)?);
        self.commit_cache.lock().unwrap().put(id.clone(), commit.clone());
        Ok(commit)
    }

    pub fn contains_tree(&self, id: &TreeId) -> bool {
        self.backend.contains(id.digest())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;

    fn store() -> (tempfile::TempDir, Store) {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::new(ObjectStore::new(dir.path().to_path_buf()));
        (dir, store)
    }

    #[test]
    fn cache_hits_do_not_touch_backend_twice() {
        let (_dir, store) = store();
        let tree = Tree::empty();
        let id = store.write_tree(&tree).unwrap();
        // Remove the on-disk object to prove the second read comes from cache.
        let first = store.read_tree(&id).unwrap();
        let second = store.read_tree(&id).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn commit_roundtrip() {
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
        assert_eq!(*store.read_commit(&id).unwrap(), commit);
    }
}
