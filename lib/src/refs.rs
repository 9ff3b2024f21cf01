//! Ref storage: `.sod/refs/heads/<name>`, a text file holding one hex
//! commit digest plus a trailing newline, updated atomically by rename
//! (spec.md §3, §4.C).

use std::io::Write as _;
use std::path::Path;
use std::path::PathBuf;

use tempfile::NamedTempFile;
use thiserror::Error;

use crate::file_util::create_dir_all;
use crate::file_util::persist_temp_file;
use crate::object_id::CommitId;

pub const MAIN_REF_NAME: &str = "master";

#[derive(Debug, Error)]
pub enum RefError {
    #[error("I/O error on ref `{name}`: {source}")]
    Io {
        name: String,
        #[source]
        source: std::io::Error,
    },
    #[error("ref `{name}` contains a malformed digest")]
    Malformed { name: String },
}

fn ref_path(sod_dir: &Path, name: &str) -> PathBuf {
    sod_dir.join("refs").join("heads").join(name)
}

/// Reads the commit a ref points at, or `None` if the ref doesn't exist yet
/// (an empty/unborn repository).
pub fn read_ref(sod_dir: &Path, name: &str) -> Result<Option<CommitId>, RefError> {
    let path = ref_path(sod_dir, name);
    let contents = match std::fs::read_to_string(&path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(source) => return Err(RefError::Io { name: name.to_string(), source }),
    };
    let hex = contents.trim_end_matches('\n');
    CommitId::try_from_hex(hex)
        .map(Some)
        .ok_or_else(|| RefError::Malformed { name: name.to_string() })
}

/// Atomically updates `name` to point at `commit_id`.
pub fn write_ref(sod_dir: &Path, name: &str, commit_id: &CommitId) -> Result<(), RefError> {
    let path = ref_path(sod_dir, name);
    let dir = path.parent().expect("ref path always has a parent");
    create_dir_all(dir).map_err(|source| RefError::Io { name: name.to_string(), source })?;

    let mut temp_file =
        NamedTempFile::new_in(dir).map_err(|source| RefError::Io { name: name.to_string(), source })?;
    writeln!(temp_file, "{}", commit_id.hex())
        .map_err(|source| RefError::Io { name: name.to_string(), source })?;
    persist_temp_file(temp_file, &path).map_err(|source| RefError::Io { name: name.to_string(), source })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::digest::hash_bytes;

    #[test]
    fn unborn_ref_reads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(read_ref(dir.path(), MAIN_REF_NAME).unwrap(), None);
    }

    #[test]
    fn ref_roundtrips() {
        let dir = tempfile::tempdir().unwrap();
        let commit_id = CommitId::new(hash_bytes(b"commit"));
        write_ref(dir.path(), MAIN_REF_NAME, &commit_id).unwrap();
        assert_eq!(read_ref(dir.path(), MAIN_REF_NAME).unwrap(), Some(commit_id));
    }

    #[test]
    fn ref_update_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let first = CommitId::new(hash_bytes(b"first"));
        let second = CommitId::new(hash_bytes(b"second"));
        write_ref(dir.path(), MAIN_REF_NAME, &first).unwrap();
        write_ref(dir.path(), MAIN_REF_NAME, &second).unwrap();
        assert_eq!(read_ref(dir.path(), MAIN_REF_NAME).unwrap(), Some(second));
    }
}
