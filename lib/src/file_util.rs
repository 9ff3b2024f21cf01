//! Filesystem helpers: atomic persist-via-rename, and path<->bytes
//! conversion. Trimmed from the template's own `file_util` down to the
//! synchronous subset sod needs — no async I/O anywhere in this crate.

use std::fs;
use std::fs::File;
use std::io;
use std::path::Path;
use std::path::PathBuf;

use tempfile::NamedTempFile;
use tempfile::PersistError;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("cannot access {path}: {source}")]
pub struct PathError {
    pub path: PathBuf,
    #[source]
    pub source: io::Error,
}

pub trait IoResultExt<T> {
    fn context(self, path: impl AsRef<Path>) -> Result<T, PathError>;
}

impl<T> IoResultExt<T> for io::Result<T> {
    fn context(self, path: impl AsRef<Path>) -> Result<T, PathError> {
        self.map_err(|error| PathError { path: path.as_ref().to_path_buf(), source: error })
    }
}

/// Creates a directory, or does nothing if it already exists.
pub fn create_or_reuse_dir(dirname: &Path) -> io::Result<()> {
    match fs::create_dir(dirname) {
        Ok(()) => Ok(()),
        Err(_) if dirname.is_dir() => Ok(()),
        Err(e) => Err(e),
    }
}

pub fn create_dir_all(dirname: &Path) -> io::Result<()> {
    match fs::create_dir_all(dirname) {
        Ok(()) => Ok(()),
        Err(_) if dirname.is_dir() => Ok(()),
        Err(e) => Err(e),
    }
}

/// Persists a temp file after syncing its content, overwriting `new_path`
/// if present. Used for ref updates and index writes, where the destination
/// content is expected to change.
///
/// See <https://lwn.net/Articles/457667/> for why `sync_data` runs first.
pub fn persist_temp_file(temp_file: NamedTempFile, new_path: impl AsRef<Path>) -> io::Result<File> {
    temp_file.as_file().sync_data()?;
    temp_file.persist(new_path).map_err(|PersistError { error, .. }| error)
}

/// Like [`persist_temp_file`], but for content-addressed destinations where
/// the target's content never changes once written: if the target already
/// exists we can just reuse it rather than fighting Windows's
/// can't-overwrite-an-open-file semantics.
pub fn persist_content_addressed_temp_file(
    temp_file: NamedTempFile,
    new_path: impl AsRef<Path>,
) -> io::Result<File> {
    temp_file.as_file().sync_data()?;
    if cfg!(windows) {
        match temp_file.persist_noclobber(&new_path) {
            Ok(file) => Ok(file),
            Err(PersistError { error, .. }) => File::open(new_path).or(Err(error)),
        }
    } else {
        temp_file.persist(new_path).map_err(|PersistError { error, .. }| error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn persist_content_addressed_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("obj");

        let mut tmp1 = NamedTempFile::new_in(dir.path()).unwrap();
        std::io::Write::write_all(&mut tmp1, b"payload").unwrap();
        persist_content_addressed_temp_file(tmp1, &target).unwrap();

        let mut tmp2 = NamedTempFile::new_in(dir.path()).unwrap();
        std::io::Write::write_all(&mut tmp2, b"payload").unwrap();
        persist_content_addressed_temp_file(tmp2, &target).unwrap();

        assert_eq!(fs::read(&target).unwrap(), b"payload");
    }

    #[test]
    fn create_or_reuse_dir_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let sub = dir.path().join("sub");
        create_or_reuse_dir(&sub).unwrap();
        create_or_reuse_dir(&sub).unwrap();
        assert!(sub.is_dir());
    }
}
