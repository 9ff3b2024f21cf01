//! Materializing a tree from a flat `path -> (digest, mode)` map, and the
//! reverse: flattening a stored tree for diffing and staging. Grounded on
//! the template's own `TreeBuilder` (bottom-up writing in reverse
//! lexicographical order), simplified since sod always has the full
//! working-tree scan in memory rather than needing a lazy overlay atop a
//! partially-loaded base tree.

use std::collections::BTreeMap;

use crate::object_id::TreeId;
use crate::object_store::ObjectStoreError;
use crate::repo_path::RepoPathBuf;
use crate::store::Store;
use crate::tree::ModeBits;
use crate::tree::Tree;
use crate::tree::TreeEntry;
use crate::tree::TreeValue;
use crate::digest::Digest;

/// A fully flattened view of a tree: every tracked file, keyed by its
/// repo-relative path. No directory entries are represented explicitly —
/// they are implied by path prefixes and rebuilt on write.
pub type FlatTree = BTreeMap<RepoPathBuf, (Digest, ModeBits)>;

/// Recursively reads `id` from `store`, producing a flat file map.
pub fn flatten_tree(store: &Store, id: &TreeId) -> Result<FlatTree, ObjectStoreError> {
    let mut out = FlatTree::new();
    flatten_into(store, id, &RepoPathBuf::root(), &mut out)?;
    Ok(out)
}

fn flatten_into(
    store: &Store,
    id: &TreeId,
    dir: &RepoPathBuf,
    out: &mut FlatTree,
) -> Result<(), ObjectStoreError> {
    let tree = store.read_tree(id)?;
    for entry in tree.entries() {
        let path = dir.join(&entry.name);
        match &entry.value {
            TreeValue::File { digest, mode } => {
                out.insert(path, (digest.clone(), *mode));
            }
            TreeValue::Tree { id: child_id } => {
                flatten_into(store, child_id, &path, out)?;
            }
        }
    }
    Ok(())
}

/// Writes every subtree implied by `flat`, bottom-up, returning the root
/// tree id. The empty flat map still writes (and returns) the canonical
/// empty tree.
pub fn build_tree_from_flat(store: &Store, flat: &FlatTree) -> Result<TreeId, ObjectStoreError> {
    // Group files by their immediate parent directory.
    let mut children_by_dir: BTreeMap<RepoPathBuf, Vec<(String, TreeValue)>> = BTreeMap::new();
    // Every directory that appears anywhere in a path, even if it turns out
    // to hold only subdirectories, must be present so its parent can look it
    // up below.
    let mut all_dirs: std::collections::BTreeSet<RepoPathBuf> = std::collections::BTreeSet::new();
    all_dirs.insert(RepoPathBuf::root());

    for (path, (digest, mode)) in flat {
        let parent = path.parent().expect("flattened file path is never root");
        let name = path.file_name().expect("flattened file path has a name").to_string();
        children_by_dir
            .entry(parent.clone())
            .or_default()
            .push((name, TreeValue::File { digest: digest.clone(), mode: *mode }));

        let mut ancestor = Some(parent);
        while let Some(dir) = ancestor {
            if !all_dirs.insert(dir.clone()) {
                break;
            }
            ancestor = dir.parent();
        }
    }

    // Process directories deepest-first so every child subtree is written
    // before its parent needs to reference it.
    let mut dirs: Vec<_> = all_dirs.into_iter().collect();
    dirs.sort_by(|a, b| b.as_bytes().len().cmp(&a.as_bytes().len()).then(b.cmp(a)));

    let mut written: BTreeMap<RepoPathBuf, TreeId> = BTreeMap::new();
    for dir in &dirs {
        let mut entries: Vec<TreeEntry> = children_by_dir
            .remove(dir)
            .unwrap_or_default()
            .into_iter()
            .map(|(name, value)| TreeEntry { name, value })
            .collect();

        for (child_dir, child_id) in written.iter() {
            if child_dir.parent().as_ref() == Some(dir) {
                let name = child_dir.file_name().expect("non-root dir has a name").to_string();
                entries.push(TreeEntry { name, value: TreeValue::Tree { id: child_id.clone() } });
            }
        }

        let tree = Tree::from_entries(entries);
        let id = store.write_tree(&tree)?;
        written.insert(dir.clone(), id);
    }

    Ok(written.remove(&RepoPathBuf::root()).expect("root is always processed"))
}
