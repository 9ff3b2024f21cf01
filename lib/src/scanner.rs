//! The working-tree scanner (module E): walks the directory tree under a
//! root, applying ignore rules and patterns, hashing files in parallel via
//! `rayon`, and producing a deterministic snapshot regardless of worker
//! count. Grounded on the template's `local_working_copy.rs`
//! `visit_directory`/`process_dir_entry`.

use std::fs;
use std::path::Path;
use std::sync::Mutex;

use rayon::prelude::*;
use thiserror::Error;

use crate::digest::Digest;
use crate::digest_cache::DigestCache;
use crate::pattern::Pattern;
use crate::pattern::is_ignored_directory;
use crate::repo_path::RepoPathBuf;
use crate::tree::ModeBits;

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("I/O error scanning {path}: {source}")]
    Io {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// One file found by a scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedFile {
    pub path: RepoPathBuf,
    pub digest: Digest,
    pub mode: ModeBits,
}

/// A per-file error encountered during a scan: reported in the output set
/// rather than aborting the walk (spec.md §4.E, §7).
#[derive(Debug, Clone)]
pub struct ScanFileError {
    pub path: RepoPathBuf,
    pub message: String,
}

pub struct ScanOptions<'a> {
    pub patterns: &'a [Pattern],
    pub include_ignored: bool,
    pub rehash: bool,
}

pub struct ScanOutput {
    pub files: Vec<ScannedFile>,
    pub ignored: Vec<RepoPathBuf>,
    pub errors: Vec<ScanFileError>,
}

/// Walks `root`, returning a sorted, deterministic snapshot. Symlinks to
/// files are read as their target content (spec.md §4.E: "the tool is
/// transparency-oriented").
#[tracing::instrument(skip_all, fields(root = %root.display()))]
pub fn scan(
    root: &Path,
    cache: &Mutex<DigestCache>,
    options: &ScanOptions<'_>,
) -> Result<ScanOutput, ScanError> {
    let mut files = Vec::new();
    let mut ignored = Vec::new();
    let mut errors = Vec::new();
    let root_repo_path = RepoPathBuf::root();

    visit_directory(root, root, &root_repo_path, cache, options, &mut files, &mut ignored, &mut errors)?;

    files.sort_by(|a, b| a.path.as_bytes().cmp(b.path.as_bytes()));
    ignored.sort_by(|a, b| a.as_bytes().cmp(b.as_bytes()));
    errors.sort_by(|a, b| a.path.as_bytes().cmp(b.path.as_bytes()));

    Ok(ScanOutput { files, ignored, errors })
}

#[allow(clippy::too_many_arguments)]
fn visit_directory(
    root: &Path,
    dir: &Path,
    dir_repo_path: &RepoPathBuf,
    cache: &Mutex<DigestCache>,
    options: &ScanOptions<'_>,
    files: &mut Vec<ScannedFile>,
    ignored: &mut Vec<RepoPathBuf>,
    errors: &mut Vec<ScanFileError>,
) -> Result<(), ScanError> {
    if !dir_repo_path.is_root() && is_ignored_directory(dir) {
        ignored.push(dir_repo_path.clone());
        if !options.include_ignored {
            return Ok(());
        }
    }

    let read_dir = fs::read_dir(dir).map_err(|source| ScanError::Io { path: dir.to_path_buf(), source })?;
    let mut entries: Vec<_> = read_dir
        .filter_map(|entry| entry.ok())
        // The repository's own metadata directory is never a trackable
        // path, regardless of `--ignored`.
        .filter(|entry| {
            !(dir_repo_path.is_root() && entry.file_name().to_str() == Some(crate::repo::SOD_DIR_NAME))
        })
        .collect();
    entries.sort_by_key(|e| e.file_name());

    // Parallelize the per-entry work (stat + hash) across a rayon scope;
    // subdirectories still recurse sequentially from the caller's
    // perspective since each collects into its own buffers. The template's
    // own walk uses `with_min_len` to avoid over-splitting tiny directories.
    let results: Vec<_> = entries
        .into_par_iter()
        .with_min_len(100)
        .map(|entry| process_entry(root, dir_repo_path, &entry, cache, options))
        .collect();

    for result in results {
        match result? {
            EntryOutcome::File(file) => files.push(file),
            EntryOutcome::Error(error) => errors.push(error),
            EntryOutcome::Directory(subdir_path, subdir_repo_path) => {
                visit_directory(root, &subdir_path, &subdir_repo_path, cache, options, files, ignored, errors)?;
            }
            EntryOutcome::Skip => {}
        }
    }
    Ok(())
}

enum EntryOutcome {
    File(ScannedFile),
    Directory(std::path::PathBuf, RepoPathBuf),
    Error(ScanFileError),
    Skip,
}

fn process_entry(
    root: &Path,
    dir_repo_path: &RepoPathBuf,
    entry: &fs::DirEntry,
    cache: &Mutex<DigestCache>,
    options: &ScanOptions<'_>,
) -> Result<EntryOutcome, ScanError> {
    let name = entry.file_name().to_string_lossy().into_owned();
    let fs_path = entry.path();
    let repo_path = dir_repo_path.join(&name);

    if !matches_any(&repo_path, options.patterns) {
        return Ok(EntryOutcome::Skip);
    }

    let metadata = match fs::symlink_metadata(&fs_path) {
        Ok(metadata) => metadata,
        Err(source) => {
            return Ok(EntryOutcome::Error(ScanFileError {
                path: repo_path,
                message: source.to_string(),
            }));
        }
    };

    if metadata.is_dir() {
        return Ok(EntryOutcome::Directory(fs_path, repo_path));
    }

    let result = if metadata.file_type().is_symlink() {
        hash_symlink(&fs_path).map(|digest| (digest, ModeBits::REGULAR))
    } else {
        let followed_metadata = match fs::metadata(&fs_path) {
            Ok(m) => m,
            Err(source) => {
                return Ok(EntryOutcome::Error(ScanFileError {
                    path: repo_path,
                    message: source.to_string(),
                }));
            }
        };
        let mode = mode_bits(&followed_metadata);
        cache
            .lock()
            .unwrap()
            .digest_for(&repo_path, &fs_path, &followed_metadata, options.rehash)
            .map(|digest| (digest, mode))
            .map_err(|error| error.to_string())
    };

    match result {
        Ok((digest, mode)) => Ok(EntryOutcome::File(ScannedFile { path: repo_path, digest, mode })),
        Err(message) => Ok(EntryOutcome::Error(ScanFileError { path: repo_path, message })),
    }
}

fn matches_any(path: &RepoPathBuf, patterns: &[Pattern]) -> bool {
    patterns.is_empty() || patterns.iter().any(|p| p.matches(path))
}

fn hash_symlink(fs_path: &Path) -> Result<Digest, String> {
    let target = fs::read_link(fs_path).map_err(|e| e.to_string())?;
    Ok(crate::digest::hash_bytes(target.to_string_lossy().as_bytes()))
}

#[cfg(unix)]
fn mode_bits(metadata: &fs::Metadata) -> ModeBits {
    use std::os::unix::fs::PermissionsExt as _;
    ModeBits::from_executable(metadata.permissions().mode() & 0o111 != 0)
}

#[cfg(not(unix))]
fn mode_bits(_metadata: &fs::Metadata) -> ModeBits {
    ModeBits::REGULAR
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan_root(root: &Path) -> ScanOutput {
        let cache = Mutex::new(DigestCache::default());
        let options = ScanOptions { patterns: &[], include_ignored: false, rehash: false };
        scan(root, &cache, &options).unwrap()
    }

    #[test]
    fn scan_finds_nested_files_sorted() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("b")).unwrap();
        fs::write(dir.path().join("b/2.txt"), b"2").unwrap();
        fs::write(dir.path().join("a.txt"), b"1").unwrap();

        let output = scan_root(dir.path());
        let paths: Vec<_> = output.files.iter().map(|f| f.path.to_string()).collect();
        assert_eq!(paths, vec!["a.txt", "b/2.txt"]);
    }

    #[test]
    fn ignored_directory_is_excluded_by_default() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join(".git")).unwrap();
        fs::write(dir.path().join("a.txt"), b"1").unwrap();

        let output = scan_root(dir.path());
        assert_eq!(output.files.len(), 1);
        assert_eq!(output.ignored.len(), 1);
    }

    #[test]
    fn sodignore_marker_file_ignores_directory() {
        let dir = tempfile::tempdir().unwrap();
        let sub = dir.path().join("sub");
        fs::create_dir(&sub).unwrap();
        fs::write(sub.join(".sodignore"), b"").unwrap();
        fs::write(sub.join("a.txt"), b"1").unwrap();

        let output = scan_root(dir.path());
        assert!(output.files.is_empty());
        assert_eq!(output.ignored.len(), 1);
    }

    #[test]
    fn scan_determinism_across_runs() {
        let dir = tempfile::tempdir().unwrap();
        for i in 0..50 {
            fs::write(dir.path().join(format!("f{i}.txt")), format!("content-{i}")).unwrap();
        }
        let a = scan_root(dir.path());
        let b = scan_root(dir.path());
        assert_eq!(a.files, b.files);
    }
}
