//! The top-level error taxonomy (spec.md §7): every subsystem error folds
//! into one of these kinds, which is what the CLI boundary actually
//! switches on for exit codes and messages. Grounded on the template's own
//! `CommandError` categorization of internal errors into a small set of
//! user-facing kinds.

use thiserror::Error;

use crate::aux::AuxError;
use crate::commit_engine::CommitEngineError;
use crate::config::ConfigError;
use crate::diff::DiffError;
use crate::digest_cache::DigestCacheError;
use crate::index::IndexError;
use crate::lock::LockError;
use crate::object_store::ObjectStoreError;
use crate::pattern::PatternError;
use crate::refs::RefError;
use crate::remote_fs::RemoteFsError;
use crate::repo::RepoError;
use crate::repo_path::RepoPathError;
use crate::restore::RestoreError;
use crate::scanner::ScanError;

#[derive(Debug, Error)]
pub enum SodError {
    #[error("not a sod repository (or any parent up to the filesystem root)")]
    NotARepository,
    #[error("another sod invocation holds the repository lock")]
    LockContention,
    #[error("{0}")]
    BadArgument(String),
    #[error("no tracked or working-tree path matched `{0}`")]
    NoMatch(String),
    #[error("nothing to commit")]
    NothingToCommit,
    #[error("repository object store is corrupt: {0}")]
    ObjectStoreCorruption(String),
    #[error("I/O error at {path}: {source}")]
    IoFailure {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("remote operation failed: {0}")]
    RemoteFailure(String),
    #[error("snapshot hook failed: {0}")]
    HookFailure(String),
}

impl From<RepoError> for SodError {
    fn from(error: RepoError) -> Self {
        match error {
            RepoError::NotARepository => SodError::NotARepository,
            RepoError::AlreadyInitialized(path) => {
                SodError::BadArgument(format!("`{}` already contains a sod repository", path.display()))
            }
            RepoError::Lock(e) => e.into(),
            RepoError::Config(e) => e.into(),
            RepoError::Ref(e) => e.into(),
            RepoError::Index(e) => e.into(),
            RepoError::DigestCache(e) => e.into(),
            RepoError::Aux(e) => e.into(),
            RepoError::Io { path, source } => SodError::IoFailure { path, source },
            RepoError::HashAlgoMismatch { configured } => SodError::ObjectStoreCorruption(format!(
                "`.sod/config` names hash algorithm `{configured}`, but this build only knows `{}`",
                crate::digest::HASH_ALGO_NAME
            )),
        }
    }
}

impl From<LockError> for SodError {
    fn from(error: LockError) -> Self {
        match error {
            LockError::Contended(_) => SodError::LockContention,
            LockError::Io { path, source } => SodError::IoFailure { path, source },
        }
    }
}

impl From<ConfigError> for SodError {
    fn from(error: ConfigError) -> Self {
        match error {
            ConfigError::Io(source) => {
                SodError::IoFailure { path: std::path::PathBuf::from(".sod/config"), source }
            }
            ConfigError::Parse(e) => SodError::BadArgument(format!("malformed config: {e}")),
            ConfigError::Serialize(e) => SodError::ObjectStoreCorruption(e.to_string()),
            ConfigError::UnknownKey(key) => SodError::BadArgument(format!("unknown config key `{key}`")),
        }
    }
}

impl From<RefError> for SodError {
    fn from(error: RefError) -> Self {
        match error {
            RefError::Io { name, source } => {
                SodError::IoFailure { path: std::path::PathBuf::from(name), source }
            }
            RefError::Malformed { name } => {
                SodError::ObjectStoreCorruption(format!("ref `{name}` contains a malformed digest"))
            }
        }
    }
}

impl From<IndexError> for SodError {
    fn from(error: IndexError) -> Self {
        match error {
            IndexError::Io(source) => {
                SodError::IoFailure { path: std::path::PathBuf::from(".sod/index"), source }
            }
            IndexError::Malformed(e) => SodError::ObjectStoreCorruption(format!("corrupt index: {e}")),
        }
    }
}

impl From<DigestCacheError> for SodError {
    fn from(error: DigestCacheError) -> Self {
        match error {
            DigestCacheError::Io { path, source } => SodError::IoFailure { path, source },
        }
    }
}

impl From<AuxError> for SodError {
    fn from(error: AuxError) -> Self {
        match error {
            AuxError::UnsupportedScheme(scheme) => {
                SodError::BadArgument(format!("unsupported URL scheme `{scheme}`"))
            }
            AuxError::MultipleWildcards(template) => {
                SodError::BadArgument(format!("at most one `*` allowed in `{template}`"))
            }
            AuxError::UnknownStore(name) => SodError::BadArgument(format!("no auxiliary store named `{name}`")),
            AuxError::DuplicateStore(name) => {
                SodError::BadArgument(format!("auxiliary store `{name}` already exists"))
            }
            AuxError::Remote(e) => e.into(),
            AuxError::CorruptTree { path, source } => {
                SodError::ObjectStoreCorruption(format!("{path}: {source}"))
            }
            AuxError::CorruptCommit { path, source } => {
                SodError::ObjectStoreCorruption(format!("{path}: {source}"))
            }
            AuxError::Io(source) => {
                SodError::IoFailure { path: std::path::PathBuf::from("<aux cache>"), source }
            }
            AuxError::Malformed(e) => SodError::ObjectStoreCorruption(format!("corrupt aux cache: {e}")),
        }
    }
}

impl From<RemoteFsError> for SodError {
    fn from(error: RemoteFsError) -> Self {
        match error {
            RemoteFsError::Io { path, source } => SodError::IoFailure { path: path.into(), source },
            RemoteFsError::SshFailed { host, stderr } => {
                SodError::RemoteFailure(format!("{host}: {stderr}"))
            }
        }
    }
}

impl From<ObjectStoreError> for SodError {
    fn from(error: ObjectStoreError) -> Self {
        match error {
            ObjectStoreError::Io { path, source } => SodError::IoFailure { path, source },
            other => SodError::ObjectStoreCorruption(other.to_string()),
        }
    }
}

impl From<ScanError> for SodError {
    fn from(error: ScanError) -> Self {
        match error {
            ScanError::Io { path, source } => SodError::IoFailure { path, source },
        }
    }
}

impl From<DiffError> for SodError {
    fn from(error: DiffError) -> Self {
        SodError::BadArgument(error.to_string())
    }
}

impl From<PatternError> for SodError {
    fn from(error: PatternError) -> Self {
        SodError::BadArgument(error.to_string())
    }
}

impl From<RepoPathError> for SodError {
    fn from(error: RepoPathError) -> Self {
        SodError::BadArgument(error.to_string())
    }
}

impl From<CommitEngineError> for SodError {
    fn from(error: CommitEngineError) -> Self {
        match error {
            CommitEngineError::NothingToCommit => SodError::NothingToCommit,
            CommitEngineError::ObjectStore(e) => e.into(),
        }
    }
}

impl From<RestoreError> for SodError {
    fn from(error: RestoreError) -> Self {
        match error {
            RestoreError::PathNotFound(path) => SodError::NoMatch(path.as_internal_str_lossy()),
            RestoreError::DigestNotFound(path) => {
                SodError::ObjectStoreCorruption(format!("digest for `{path}` not found in any auxiliary store"))
            }
            RestoreError::ObjectStore(e) => e.into(),
            RestoreError::Remote(e) => e.into(),
            RestoreError::Aux(e) => e.into(),
            RestoreError::Io { path, source } => SodError::IoFailure { path, source },
        }
    }
}
