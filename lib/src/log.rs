//! The log/history walker (module I): traverses the parent chain from
//! HEAD backwards, annotating each commit with the auxiliary snapshots
//! whose tree digest matches it. Grounded on the template's own revset/log
//! traversal, reduced to a single-parent chain since sod has no merges.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::aux::SnapshotCache;
use crate::commit::Commit;
use crate::object_id::CommitId;
use crate::object_store::ObjectStoreError;
use crate::store::Store;

/// One commit in the walked history, annotated with the auxiliary names
/// (and, when ambiguous, `name/snapshot-id`) whose cached snapshot matches
/// this commit's tree (spec.md §4.I).
pub struct LogEntry {
    pub commit_id: CommitId,
    pub commit: Arc<Commit>,
    pub aux_matches: Vec<String>,
}

/// Walks the parent chain starting at `head`, newest first. `aux_caches`
/// maps each registered store's name to its most recently updated
/// snapshot list.
pub fn walk(
    store: &Store,
    head: Option<CommitId>,
    aux_caches: &BTreeMap<String, Vec<SnapshotCache>>,
) -> Result<Vec<LogEntry>, ObjectStoreError> {
    let mut entries = Vec::new();
    let mut current = head;
    while let Some(id) = current {
        let commit = store.read_commit(&id)?;
        let tree_hex = commit.tree_id.hex();
        let aux_matches = annotate(&tree_hex, aux_caches);
        current = commit.parent_id.clone();
        entries.push(LogEntry { commit_id: id, commit, aux_matches });
    }
    Ok(entries)
}

fn annotate(tree_hex: &str, aux_caches: &BTreeMap<String, Vec<SnapshotCache>>) -> Vec<String> {
    let mut matches = Vec::new();
    for (name, snapshots) in aux_caches {
        let matching: Vec<&SnapshotCache> =
            snapshots.iter().filter(|s| s.tree_id_hex.as_deref() == Some(tree_hex)).collect();
        match matching.len() {
            0 => {}
            1 => matches.push(name.clone()),
            _ => {
                for snapshot in matching {
                    let snapshot_id = snapshot.root.rsplit('/').next().unwrap_or(&snapshot.root);
                    matches.push(format!("{name}/{snapshot_id}"));
                }
            }
        }
    }
    matches.sort();
    matches
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::digest::hash_bytes;
    use crate::object_store::ObjectStore;
    use crate::tree::ModeBits;
    use crate::tree::Tree;
    use crate::tree::TreeEntry;
    use crate::tree::TreeValue;
    use chrono::DateTime;

    fn store() -> (tempfile::TempDir, Store) {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::new(ObjectStore::new(dir.path().to_path_buf()));
        (dir, store)
    }

    fn commit_with_tree(store: &Store, parent: Option<CommitId>, content: &[u8]) -> CommitId {
        let tree = Tree::from_entries(vec![TreeEntry {
            name: "a.txt".to_string(),
            value: TreeValue::File { digest: hash_bytes(content), mode: ModeBits::REGULAR },
        }]);
        let tree_id = store.write_tree(&tree).unwrap();
        let commit = Commit {
            tree_id,
            parent_id: parent,
            author_name: "jane".to_string(),
            timestamp: DateTime::parse_from_rfc3339("2026-07-30T00:00:00+00:00").unwrap(),
            message: "msg".to_string(),
        };
        store.write_commit(&commit).unwrap()
    }

    #[test]
    fn walk_visits_parent_chain_newest_first() {
        let (_dir, store) = store();
        let c1 = commit_with_tree(&store, None, b"v1");
        let c2 = commit_with_tree(&store, Some(c1.clone()), b"v2");

        let entries = walk(&store, Some(c2.clone()), &BTreeMap::new()).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].commit_id, c2);
        assert_eq!(entries[1].commit_id, c1);
    }

    #[test]
    fn walk_on_unborn_repo_is_empty() {
        let (_dir, store) = store();
        let entries = walk(&store, None, &BTreeMap::new()).unwrap();
        assert!(entries.is_empty());
    }

    #[test]
    fn single_matching_snapshot_annotates_by_store_name() {
        let (_dir, store) = store();
        let c1 = commit_with_tree(&store, None, b"v1");
        let tree_hex = store.read_commit(&c1).unwrap().tree_id.hex();

        let mut caches = BTreeMap::new();
        caches.insert(
            "snap".to_string(),
            vec![SnapshotCache { root: "/snaps/s1".to_string(), tree_id_hex: Some(tree_hex), digest_index: Default::default() }],
        );

        let entries = walk(&store, Some(c1), &caches).unwrap();
        assert_eq!(entries[0].aux_matches, vec!["snap".to_string()]);
    }

    #[test]
    fn multiple_matching_snapshots_annotate_with_snapshot_id() {
        let (_dir, store) = store();
        let c1 = commit_with_tree(&store, None, b"v1");
        let tree_hex = store.read_commit(&c1).unwrap().tree_id.hex();

        let mut caches = BTreeMap::new();
        caches.insert(
            "snap".to_string(),
            vec![
                SnapshotCache { root: "/snaps/s1".to_string(), tree_id_hex: Some(tree_hex.clone()), digest_index: Default::default() },
                SnapshotCache { root: "/snaps/s2".to_string(), tree_id_hex: Some(tree_hex), digest_index: Default::default() },
            ],
        );

        let entries = walk(&store, Some(c1), &caches).unwrap();
        assert_eq!(entries[0].aux_matches, vec!["snap/s1".to_string(), "snap/s2".to_string()]);
    }
}
