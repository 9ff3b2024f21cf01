//! The single-writer repository lock (spec.md §5): `.sod/lock`, acquired
//! with exclusive file creation, released by a `Drop` guard so every exit
//! path — including a panic unwound at the CLI boundary — releases it.

use std::fs;
use std::fs::File;
use std::io;
use std::path::Path;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LockError {
    #[error("another sod invocation holds the repository lock at {0}")]
    Contended(PathBuf),
    #[error("I/O error acquiring lock at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// An acquired `.sod/lock`. Dropping this releases the lock by deleting
/// the lock file.
pub struct LockGuard {
    path: PathBuf,
    _file: File,
}

impl LockGuard {
    pub fn acquire(sod_dir: &Path) -> Result<Self, LockError> {
        let path = sod_dir.join("lock");
        let file = fs::OpenOptions::new().write(true).create_new(true).open(&path).map_err(
            |source| {
                if source.kind() == io::ErrorKind::AlreadyExists {
                    LockError::Contended(path.clone())
                } else {
                    LockError::Io { path: path.clone(), source }
                }
            },
        )?;
        Ok(Self { path, _file: file })
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        if let Err(error) = fs::remove_file(&self.path) {
            tracing::warn!(?error, path = ?self.path, "failed to release repository lock");
        }
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn second_acquire_fails_while_first_is_held() {
        let dir = tempfile::tempdir().unwrap();
        let guard = LockGuard::acquire(dir.path()).unwrap();
        assert_matches!(LockGuard::acquire(dir.path()), Err(LockError::Contended(_)));
        drop(guard);
        assert!(LockGuard::acquire(dir.path()).is_ok());
    }

    #[test]
    fn drop_releases_the_lock_file() {
        let dir = tempfile::tempdir().unwrap();
        let lock_path = dir.path().join("lock");
        {
            let _guard = LockGuard::acquire(dir.path()).unwrap();
            assert!(lock_path.is_file());
        }
        assert!(!lock_path.exists());
    }
}
