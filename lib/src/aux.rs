//! The auxiliary-store registry (module J): named external snapshot
//! collections, each enumerated into a reverse `{digest -> [path]}` index
//! cached on disk. Grounded on the template's own backend-trait split
//! (`Backend` abstracts storage transport; here [`crate::remote_fs::RemoteFs`]
//! abstracts "local disk" vs "over ssh") and on `object_store.rs`'s framing
//! code, reused directly since a snapshot root is itself a Sod repository.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::canonical::read_object_header;
use crate::commit::Commit;
use crate::commit::CommitError;
use crate::digest::Digest;
use crate::file_util::persist_temp_file;
use crate::object_id::CommitId;
use crate::object_id::ObjectId as _;
use crate::object_id::TreeId;
use crate::refs::MAIN_REF_NAME;
use crate::remote_fs::LocalFs;
use crate::remote_fs::RemoteFs;
use crate::remote_fs::RemoteFsError;
use crate::remote_fs::SshFs;
use crate::repo_path::RepoPathBuf;
use crate::tree::Tree;
use crate::tree::TreeError;
use crate::tree::TreeValue;

#[derive(Debug, Error)]
pub enum AuxError {
    #[error("unsupported URL scheme in `{0}`, expected file:// or ssh://")]
    UnsupportedScheme(String),
    #[error("URL `{0}` may contain at most one `*` wildcard path component")]
    MultipleWildcards(String),
    #[error("no auxiliary store named `{0}`")]
    UnknownStore(String),
    #[error("auxiliary store `{0}` already exists")]
    DuplicateStore(String),
    #[error(transparent)]
    Remote(#[from] RemoteFsError),
    #[error("corrupt object at `{path}`: {source}")]
    CorruptTree {
        path: String,
        #[source]
        source: TreeError,
    },
    #[error("corrupt object at `{path}`: {source}")]
    CorruptCommit {
        path: String,
        #[source]
        source: CommitError,
    },
    #[error("I/O error on auxiliary registry: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed auxiliary cache: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// What kind of transport a store's URL resolves to (spec.md §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuxKind {
    PlainLocal,
    PlainRemote,
}

/// `{ name, kind, url-template }` (spec.md §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuxStoreConfig {
    pub name: String,
    pub kind: AuxKind,
    pub url_template: String,
}

/// The persisted set of registered stores, `.sod/aux/registry.json`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuxRegistry {
    stores: Vec<AuxStoreConfig>,
}

impl AuxRegistry {
    pub fn load(path: &Path) -> Result<Self, AuxError> {
        match fs::read(path) {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(source) => Err(source.into()),
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), AuxError> {
        let dir = path.parent().expect("registry path always has a parent");
        fs::create_dir_all(dir)?;
        let bytes = serde_json::to_vec_pretty(&self)?;
        let mut temp_file = tempfile::NamedTempFile::new_in(dir)?;
        std::io::Write::write_all(&mut temp_file, &bytes)?;
        persist_temp_file(temp_file, path)?;
        Ok(())
    }

    pub fn stores(&self) -> &[AuxStoreConfig] {
        &self.stores
    }

    /// Validates `url` (spec.md §4.J: "recognizes scheme `file://` or
    /// `ssh://host/...`, rejects others") and registers `name`.
    pub fn add(&mut self, name: &str, url: &str) -> Result<(), AuxError> {
        if self.stores.iter().any(|s| s.name == name) {
            return Err(AuxError::DuplicateStore(name.to_string()));
        }
        let (kind, _host, _path) = parse_url(url)?;
        self.stores.push(AuxStoreConfig { name: name.to_string(), kind, url_template: url.to_string() });
        Ok(())
    }

    pub fn remove(&mut self, name: &str) -> Result<(), AuxError> {
        let before = self.stores.len();
        self.stores.retain(|s| s.name != name);
        if self.stores.len() == before {
            return Err(AuxError::UnknownStore(name.to_string()));
        }
        Ok(())
    }

    pub fn get(&self, name: &str) -> Result<&AuxStoreConfig, AuxError> {
        self.stores.iter().find(|s| s.name == name).ok_or_else(|| AuxError::UnknownStore(name.to_string()))
    }
}

/// Splits a store URL into its kind, optional remote host, and path
/// template (which may contain a single `*` component).
pub(crate) fn parse_url(url: &str) -> Result<(AuxKind, Option<String>, String), AuxError> {
    if let Some(path) = url.strip_prefix("file://") {
        return Ok((AuxKind::PlainLocal, None, path.to_string()));
    }
    if let Some(rest) = url.strip_prefix("ssh://") {
        let (host, path) = rest.split_once('/').ok_or_else(|| AuxError::UnsupportedScheme(url.to_string()))?;
        return Ok((AuxKind::PlainRemote, Some(host.to_string()), format!("/{path}")));
    }
    Err(AuxError::UnsupportedScheme(url.to_string()))
}

pub(crate) fn transport_for(kind: AuxKind, host: Option<String>) -> Box<dyn RemoteFs> {
    match kind {
        AuxKind::PlainLocal => Box::new(LocalFs),
        AuxKind::PlainRemote => Box::new(SshFs { host: host.expect("remote kind always has a host") }),
    }
}

/// Expands a single `*` path component into the list of concrete roots
/// present on disk (or remotely). A template with no `*` denotes exactly
/// one root: itself.
fn expand_roots(fs: &dyn RemoteFs, template_path: &str) -> Result<Vec<String>, AuxError> {
    let components: Vec<&str> = template_path.split('/').collect();
    let wildcard_positions: Vec<usize> =
        components.iter().enumerate().filter(|(_, c)| **c == "*").map(|(i, _)| i).collect();
    match wildcard_positions.as_slice() {
        [] => Ok(vec![template_path.to_string()]),
        [pos] => {
            let parent = components[..*pos].join("/");
            let suffix = components[pos + 1..].join("/");
            let names = fs.list_dir(&parent)?;
            Ok(names
                .into_iter()
                .map(|name| {
                    if suffix.is_empty() {
                        format!("{parent}/{name}")
                    } else {
                        format!("{parent}/{name}/{suffix}")
                    }
                })
                .collect())
        }
        _ => Err(AuxError::MultipleWildcards(template_path.to_string())),
    }
}

/// One expanded snapshot root's cached contents: the tree digest it
/// represents (if it holds a born commit) and the reverse digest index
/// built by flattening that tree.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SnapshotCache {
    pub root: String,
    pub tree_id_hex: Option<String>,
    pub digest_index: BTreeMap<Digest, Vec<RepoPathBuf>>,
}

impl SnapshotCache {
    pub fn tree_id(&self) -> Option<TreeId> {
        self.tree_id_hex.as_ref().and_then(TreeId::try_from_hex)
    }
}

fn remote_object_path(sod_dir: &str, digest: &Digest) -> String {
    let hex = digest.hex();
    let (shard, rest) = hex.split_at(2);
    format!("{sod_dir}/objects/{shard}/{rest}")
}

fn read_remote_ref(fs: &dyn RemoteFs, sod_dir: &str) -> Result<Option<CommitId>, AuxError> {
    let path = format!("{sod_dir}/refs/heads/{MAIN_REF_NAME}");
    match fs.read_file(&path) {
        Ok(bytes) => {
            let text = String::from_utf8_lossy(&bytes);
            Ok(CommitId::try_from_hex(text.trim_end()))
        }
        Err(_) => Ok(None),
    }
}

fn read_remote_commit(fs: &dyn RemoteFs, sod_dir: &str, id: &CommitId) -> Result<Commit, AuxError> {
    let path = remote_object_path(sod_dir, id.digest());
    let raw = fs.read_file(&path)?;
    let (_kind, body) = read_object_header(&raw).ok_or_else(|| AuxError::CorruptCommit {
        path: path.clone(),
        source: CommitError::Malformed("missing object header".into()),
    })?;
    Commit::deserialize(body).map_err(|source| AuxError::CorruptCommit { path, source })
}

fn read_remote_tree(fs: &dyn RemoteFs, sod_dir: &str, id: &TreeId) -> Result<Tree, AuxError> {
    let path = remote_object_path(sod_dir, id.digest());
    let raw = fs.read_file(&path)?;
    let (_kind, body) = read_object_header(&raw)
        .ok_or_else(|| AuxError::CorruptTree { path: path.clone(), source: TreeError::Malformed("missing object header".into()) })?;
    Tree::deserialize(body).map_err(|source| AuxError::CorruptTree { path, source })
}

fn flatten_remote_tree(
    fs: &dyn RemoteFs,
    sod_dir: &str,
    id: &TreeId,
    dir: &RepoPathBuf,
    out: &mut BTreeMap<RepoPathBuf, Digest>,
) -> Result<(), AuxError> {
    let tree = read_remote_tree(fs, sod_dir, id)?;
    for entry in tree.entries() {
        let path = dir.join(&entry.name);
        match &entry.value {
            TreeValue::File { digest, .. } => {
                out.insert(path, digest.clone());
            }
            TreeValue::Tree { id: child_id } => {
                flatten_remote_tree(fs, sod_dir, child_id, &path, out)?;
            }
        }
    }
    Ok(())
}

/// Builds a [`SnapshotCache`] for one expanded snapshot root, which is
/// itself a Sod repository rooted at `root/.sod`.
fn build_snapshot_cache(fs: &dyn RemoteFs, root: &str) -> Result<SnapshotCache, AuxError> {
    let sod_dir = format!("{root}/.sod");
    let head = read_remote_ref(fs, &sod_dir)?;
    let Some(head) = head else {
        return Ok(SnapshotCache { root: root.to_string(), tree_id_hex: None, digest_index: BTreeMap::new() });
    };
    let commit = read_remote_commit(fs, &sod_dir, &head)?;
    let mut flat = BTreeMap::new();
    flatten_remote_tree(fs, &sod_dir, &commit.tree_id, &RepoPathBuf::root(), &mut flat)?;

    let mut digest_index: BTreeMap<Digest, Vec<RepoPathBuf>> = BTreeMap::new();
    for (path, digest) in flat {
        digest_index.entry(digest).or_default().push(path);
    }
    Ok(SnapshotCache { root: root.to_string(), tree_id_hex: Some(commit.tree_id.hex()), digest_index })
}

/// Re-enumerates `store`'s snapshot roots and rebuilds its cache,
/// overwriting `.sod/cache/aux/<name>/index.json` (spec.md §4.J).
#[tracing::instrument(skip(cache_dir), fields(name = %store.name))]
pub fn update_store(store: &AuxStoreConfig, cache_dir: &Path) -> Result<Vec<SnapshotCache>, AuxError> {
    let (kind, host, path_template) = parse_url(&store.url_template)?;
    let fs = transport_for(kind, host);
    let roots = expand_roots(fs.as_ref(), &path_template)?;

    let mut snapshots = Vec::new();
    for root in roots {
        if !fs.is_dir(&root) {
            continue;
        }
        snapshots.push(build_snapshot_cache(fs.as_ref(), &root)?);
    }

    fs::create_dir_all(cache_dir)?;
    let index_path = cache_dir.join("index.json");
    let bytes = serde_json::to_vec_pretty(&snapshots)?;
    let mut temp_file = tempfile::NamedTempFile::new_in(cache_dir)?;
    std::io::Write::write_all(&mut temp_file, &bytes)?;
    persist_temp_file(temp_file, &index_path)?;
    Ok(snapshots)
}

pub fn load_cache(cache_dir: &Path) -> Result<Vec<SnapshotCache>, AuxError> {
    let index_path = cache_dir.join("index.json");
    match fs::read(&index_path) {
        Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
        Err(source) => Err(source.into()),
    }
}

pub fn cache_dir_for(sod_dir: &Path, name: &str) -> PathBuf {
    sod_dir.join("cache").join("aux").join(name)
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn parse_url_accepts_file_scheme() {
        let (kind, host, path) = parse_url("file:///var/snaps/*").unwrap();
        assert_eq!(kind, AuxKind::PlainLocal);
        assert_eq!(host, None);
        assert_eq!(path, "/var/snaps/*");
    }

    #[test]
    fn parse_url_accepts_ssh_scheme() {
        let (kind, host, path) = parse_url("ssh://backup-host/mnt/snaps/*").unwrap();
        assert_eq!(kind, AuxKind::PlainRemote);
        assert_eq!(host.as_deref(), Some("backup-host"));
        assert_eq!(path, "/mnt/snaps/*");
    }

    #[test]
    fn parse_url_rejects_other_schemes() {
        assert_matches!(parse_url("http://example.com"), Err(AuxError::UnsupportedScheme(_)));
    }

    #[test]
    fn registry_add_rejects_duplicate_names() {
        let mut registry = AuxRegistry::default();
        registry.add("snap", "file:///a").unwrap();
        assert_matches!(registry.add("snap", "file:///b"), Err(AuxError::DuplicateStore(_)));
    }

    #[test]
    fn registry_remove_unknown_store_errors() {
        let mut registry = AuxRegistry::default();
        assert_matches!(registry.remove("nope"), Err(AuxError::UnknownStore(_)));
    }

    #[test]
    fn expand_roots_without_wildcard_is_single_root() {
        let fs = LocalFs;
        let roots = expand_roots(&fs, "/some/fixed/path").unwrap();
        assert_eq!(roots, vec!["/some/fixed/path".to_string()]);
    }

    #[test]
    fn expand_roots_lists_wildcard_children() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("snap-a")).unwrap();
        fs::create_dir(dir.path().join("snap-b")).unwrap();

        let fs = LocalFs;
        let template = format!("{}/*", dir.path().to_str().unwrap());
        let roots = expand_roots(&fs, &template).unwrap();
        assert_eq!(roots.len(), 2);
        assert!(roots.iter().all(|r| r.starts_with(dir.path().to_str().unwrap())));
    }

    #[test]
    fn update_store_builds_cache_from_local_snapshot() {
        use crate::commit::Commit;
        use crate::object_store::ObjectStore;
        use crate::refs::write_ref;
        use crate::tree::ModeBits;
        use crate::tree::TreeEntry;
        use chrono::DateTime;

        let snapshot_dir = tempfile::tempdir().unwrap();
        let sod_dir = snapshot_dir.path().join(".sod");
        let backend = ObjectStore::new(sod_dir.clone());
        let tree = Tree::from_entries(vec![TreeEntry {
            name: "a.txt".to_string(),
            value: TreeValue::File { digest: crate::digest::hash_bytes(b"hello"), mode: ModeBits::REGULAR },
        }]);
        let tree_id = backend.write_tree(&tree).unwrap();
        let commit = Commit {
            tree_id,
            parent_id: None,
            author_name: "jane".to_string(),
            timestamp: DateTime::parse_from_rfc3339("2026-07-30T00:00:00+00:00").unwrap(),
            message: "snapshot".to_string(),
        };
        let commit_id = backend.write_commit(&commit).unwrap();
        write_ref(&sod_dir, MAIN_REF_NAME, &commit_id).unwrap();

        let store = AuxStoreConfig {
            name: "snap".to_string(),
            kind: AuxKind::PlainLocal,
            url_template: format!("file://{}", snapshot_dir.path().to_str().unwrap()),
        };
        let cache_dir = tempfile::tempdir().unwrap();
        let snapshots = update_store(&store, cache_dir.path()).unwrap();
        assert_eq!(snapshots.len(), 1);
        let digest = crate::digest::hash_bytes(b"hello");
        assert!(snapshots[0].digest_index.contains_key(&digest));

        let reloaded = load_cache(cache_dir.path()).unwrap();
        assert_eq!(reloaded.len(), 1);
    }
}
