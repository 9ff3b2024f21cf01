//! The digest cache (module D): `path -> (stat-signature, digest)`,
//! persisted at `.sod/cache/digests` so unchanged files never need
//! rehashing. Grounded on the template's `local_working_copy.rs`
//! `FileState`/`is_clean` stat comparison, adapted from jj's tree-state
//! model to a flat path-keyed map.

use std::collections::BTreeMap;
use std::fs;
use std::fs::Metadata;
use std::io;
use std::path::Path;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::digest::Digest;
use crate::digest::hash_reader;
use crate::file_util::persist_temp_file;
use crate::repo_path::RepoPathBuf;

#[derive(Debug, Error)]
pub enum DigestCacheError {
    #[error("I/O error reading {path}: {source}")]
    Io {
        path: std::path::PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Cheap filesystem metadata fingerprint used to decide whether a file
/// must be rehashed (spec.md §3: "a subset sufficient to detect file
/// mutation cheaply").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatSignature {
    pub size: u64,
    pub mtime_secs: i64,
    pub mtime_nanos: u32,
    #[cfg(unix)]
    pub inode: u64,
    #[cfg(unix)]
    pub device: u64,
}

impl StatSignature {
    pub fn from_metadata(metadata: &Metadata) -> Self {
        #[cfg(unix)]
        {
            use std::os::unix::fs::MetadataExt as _;
            Self {
                size: metadata.size(),
                mtime_secs: metadata.mtime(),
                mtime_nanos: metadata.mtime_nsec() as u32,
                inode: metadata.ino(),
                device: metadata.dev(),
            }
        }
        #[cfg(not(unix))]
        {
            let modified = metadata.modified().ok();
            let (secs, nanos) = modified
                .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
                .map(|d| (d.as_secs() as i64, d.subsec_nanos()))
                .unwrap_or((0, 0));
            Self { size: metadata.len(), mtime_secs: secs, mtime_nanos: nanos }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CacheEntry {
    signature: StatSignature,
    digest: Digest,
}

/// Serde carrier so `Digest` (which deliberately has no `Serialize` of its
/// own, to keep the hot hashing path dependency-free) can round-trip
/// through the cache file.
impl Serialize for Digest {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.hex())
    }
}

impl<'de> Deserialize<'de> for Digest {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let hex = String::deserialize(deserializer)?;
        Digest::try_from_hex(&hex).ok_or_else(|| serde::de::Error::custom("invalid digest hex"))
    }
}

/// The persisted path→digest cache. Losing it costs rehash time, never
/// correctness (spec.md §3).
#[derive(Debug, Default)]
pub struct DigestCache {
    entries: BTreeMap<RepoPathBuf, CacheEntry>,
    touched: std::collections::BTreeSet<RepoPathBuf>,
}

impl DigestCache {
    pub fn load(path: &Path) -> Result<Self, DigestCacheError> {
        match fs::read(path) {
            Ok(bytes) => {
                let entries: BTreeMap<RepoPathBuf, CacheEntry> =
                    serde_json::from_slice(&bytes).unwrap_or_default();
                Ok(Self { entries, touched: Default::default() })
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Self::default()),
            Err(source) => Err(DigestCacheError::Io { path: path.to_path_buf(), source }),
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), DigestCacheError> {
        let dir = path.parent().expect("cache path always has a parent");
        fs::create_dir_all(dir).map_err(|source| DigestCacheError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        let bytes = serde_json::to_vec(&self.entries)
            .expect("BTreeMap of plain data always serializes");
        let mut temp_file = tempfile::NamedTempFile::new_in(dir)
            .map_err(|source| DigestCacheError::Io { path: path.to_path_buf(), source })?;
        std::io::Write::write_all(&mut temp_file, &bytes)
            .map_err(|source| DigestCacheError::Io { path: path.to_path_buf(), source })?;
        persist_temp_file(temp_file, path)
            .map_err(|source| DigestCacheError::Io { path: path.to_path_buf(), source })?;
        Ok(())
    }

    /// Returns the digest for `fs_path`, reusing the cached value when its
    /// stat-signature is unchanged. `rehash` bypasses stat comparison
    /// entirely, per spec.md §4.D's `--rehash` mode.
    pub fn digest_for(
        &mut self,
        repo_path: &RepoPathBuf,
        fs_path: &Path,
        metadata: &Metadata,
        rehash: bool,
    ) -> Result<Digest, DigestCacheError> {
        self.touched.insert(repo_path.clone());
        let signature = StatSignature::from_metadata(metadata);
        if !rehash
            && let Some(entry) = self.entries.get(repo_path)
            && entry.signature == signature
        {
            return Ok(entry.digest.clone());
        }
        let file = fs::File::open(fs_path)
            .map_err(|source| DigestCacheError::Io { path: fs_path.to_path_buf(), source })?;
        let digest = hash_reader(io::BufReader::new(file))
            .map_err(|source| DigestCacheError::Io { path: fs_path.to_path_buf(), source })?;
        self.entries.insert(repo_path.clone(), CacheEntry { signature, digest: digest.clone() });
        Ok(digest)
    }

    /// Drops entries for paths that were never looked up during this scan
    /// (spec.md §4.D: "Entries for paths that disappeared are pruned
    /// lazily").
    pub fn prune_untouched(&mut self) {
        let touched = std::mem::take(&mut self.touched);
        self.entries.retain(|path, _| touched.contains(path));
        self.touched = touched;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    #[test]
    fn unchanged_file_reuses_cached_digest() {
        let dir = tempfile::tempdir().unwrap();
        let file_path = dir.path().join("a.txt");
        fs::write(&file_path, b"hello").unwrap();
        let repo_path = RepoPathBuf::parse("a.txt").unwrap();

        let mut cache = DigestCache::default();
        let metadata = fs::metadata(&file_path).unwrap();
        let first = cache.digest_for(&repo_path, &file_path, &metadata, false).unwrap();

        // Overwrite with different content but don't touch the mtime granularity
        // the signature relies on: simulate by asserting the cache still has the
        // stale entry and stat signature compares equal if unchanged.
        let metadata_again = fs::metadata(&file_path).unwrap();
        let second = cache.digest_for(&repo_path, &file_path, &metadata_again, false).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn rehash_bypasses_cache() {
        let dir = tempfile::tempdir().unwrap();
        let file_path = dir.path().join("a.txt");
        fs::write(&file_path, b"hello").unwrap();
        let repo_path = RepoPathBuf::parse("a.txt").unwrap();

        let mut cache = DigestCache::default();
        let metadata = fs::metadata(&file_path).unwrap();
        let first = cache.digest_for(&repo_path, &file_path, &metadata, false).unwrap();

        let mut file = fs::OpenOptions::new().write(true).truncate(true).open(&file_path).unwrap();
        file.write_all(b"goodbye").unwrap();
        drop(file);
        let metadata = fs::metadata(&file_path).unwrap();
        let rehashed = cache.digest_for(&repo_path, &file_path, &metadata, true).unwrap();
        assert_ne!(first, rehashed);
    }

    #[test]
    fn prune_drops_entries_not_touched_this_scan() {
        let mut cache = DigestCache::default();
        let dir = tempfile::tempdir().unwrap();
        let file_path = dir.path().join("a.txt");
        fs::write(&file_path, b"hello").unwrap();
        let repo_path = RepoPathBuf::parse("a.txt").unwrap();
        let metadata = fs::metadata(&file_path).unwrap();
        cache.digest_for(&repo_path, &file_path, &metadata, false).unwrap();

        // Next scan never touches `a.txt` (e.g. the file was deleted).
        cache.touched.clear();
        cache.prune_untouched();
        assert!(cache.entries.is_empty());
    }

    #[test]
    fn save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let file_path = dir.path().join("a.txt");
        fs::write(&file_path, b"hello").unwrap();
        let repo_path = RepoPathBuf::parse("a.txt").unwrap();
        let metadata = fs::metadata(&file_path).unwrap();

        let mut cache = DigestCache::default();
        let digest = cache.digest_for(&repo_path, &file_path, &metadata, false).unwrap();

        let cache_path = dir.path().join("cache").join("digests");
        cache.save(&cache_path).unwrap();
        let mut loaded = DigestCache::load(&cache_path).unwrap();
        let reloaded = loaded.digest_for(&repo_path, &file_path, &metadata, false).unwrap();
        assert_eq!(digest, reloaded);
    }
}
