//! The top-level repository handle: ties the object store, config, lock,
//! staging index, and digest cache to one `.sod` directory. Grounded on
//! the template's own workspace-discovery and `Workspace::init_local`/
//! `Workspace::load` split.

use std::path::Path;
use std::path::PathBuf;
use std::sync::Mutex;

use thiserror::Error;

use crate::aux::AuxError;
use crate::aux::AuxRegistry;
use crate::config::Config;
use crate::config::ConfigError;
use crate::digest_cache::DigestCache;
use crate::digest_cache::DigestCacheError;
use crate::index::Index;
use crate::index::IndexError;
use crate::lock::LockError;
use crate::lock::LockGuard;
use crate::object_id::CommitId;
use crate::object_store::ObjectStore;
use crate::refs::MAIN_REF_NAME;
use crate::refs::RefError;
use crate::refs::read_ref;
use crate::refs::write_ref;
use crate::store::Store;

pub const SOD_DIR_NAME: &str = ".sod";

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("not a sod repository (or any parent up to the filesystem root)")]
    NotARepository,
    #[error("`{0}` already contains a sod repository")]
    AlreadyInitialized(PathBuf),
    #[error(transparent)]
    Lock(#[from] LockError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Ref(#[from] RefError),
    #[error(transparent)]
    Index(#[from] IndexError),
    #[error(transparent)]
    DigestCache(#[from] DigestCacheError),
    #[error(transparent)]
    Aux(#[from] AuxError),
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("configured hash algorithm `{configured}` does not match this build's `{}`", crate::digest::HASH_ALGO_NAME)]
    HashAlgoMismatch { configured: String },
}

/// An open repository: the working-tree root, its `.sod` metadata
/// directory, and every on-disk subsystem loaded into memory.
pub struct Repo {
    root: PathBuf,
    sod_dir: PathBuf,
    pub store: Store,
    pub config: Config,
    pub index: Index,
    pub digest_cache: Mutex<DigestCache>,
    pub aux_registry: AuxRegistry,
    _lock: LockGuard,
}

impl Repo {
    /// Searches `start` and its ancestors for a `.sod` directory, mirroring
    /// the template's own upward workspace discovery.
    pub fn discover_root(start: &Path) -> Option<PathBuf> {
        let mut dir = Some(start);
        while let Some(current) = dir {
            if current.join(SOD_DIR_NAME).is_dir() {
                return Some(current.to_path_buf());
            }
            dir = current.parent();
        }
        None
    }

    /// Initializes a new repository at `root`, which must not already
    /// contain one.
    pub fn init(root: &Path) -> Result<Repo, RepoError> {
        let sod_dir = root.join(SOD_DIR_NAME);
        if sod_dir.is_dir() {
            return Err(RepoError::AlreadyInitialized(root.to_path_buf()));
        }
        std::fs::create_dir_all(&sod_dir)
            .map_err(|source| RepoError::Io { path: sod_dir.clone(), source })?;

        let config = Config::default();
        config.save(&config_path(&sod_dir))?;

        Self::open(root)
    }

    /// Opens an already-initialized repository rooted at `root`, acquiring
    /// the single-writer lock (spec.md §5).
    pub fn open(root: &Path) -> Result<Repo, RepoError> {
        let sod_dir = root.join(SOD_DIR_NAME);
        if !sod_dir.is_dir() {
            return Err(RepoError::NotARepository);
        }
        let lock = LockGuard::acquire(&sod_dir)?;

        let config = Config::load(&config_path(&sod_dir))?;
        if config.core.hash_algo != crate::digest::HASH_ALGO_NAME {
            return Err(RepoError::HashAlgoMismatch { configured: config.core.hash_algo.clone() });
        }
        let index = Index::load(&index_path(&sod_dir))?;
        let digest_cache = DigestCache::load(&digest_cache_path(&sod_dir))?;
        let aux_registry = AuxRegistry::load(&aux_registry_path(&sod_dir))?;
        let store = Store::new(ObjectStore::new(sod_dir.clone()));

        Ok(Repo {
            root: root.to_path_buf(),
            sod_dir,
            store,
            config,
            index,
            digest_cache: Mutex::new(digest_cache),
            aux_registry,
            _lock: lock,
        })
    }

    /// Opens the repository containing `start`, searching upward.
    pub fn discover(start: &Path) -> Result<Repo, RepoError> {
        let root = Self::discover_root(start).ok_or(RepoError::NotARepository)?;
        Self::open(&root)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn sod_dir(&self) -> &Path {
        &self.sod_dir
    }

    pub fn head(&self) -> Result<Option<CommitId>, RefError> {
        read_ref(&self.sod_dir, MAIN_REF_NAME)
    }

    pub fn set_head(&self, commit_id: &CommitId) -> Result<(), RefError> {
        write_ref(&self.sod_dir, MAIN_REF_NAME, commit_id)
    }

    pub fn save_index(&self) -> Result<(), IndexError> {
        self.index.save(&index_path(&self.sod_dir))
    }

    pub fn save_digest_cache(&self) -> Result<(), DigestCacheError> {
        let mut cache = self.digest_cache.lock().unwrap();
        cache.prune_untouched();
        cache.save(&digest_cache_path(&self.sod_dir))
    }

    pub fn save_config(&self) -> Result<(), ConfigError> {
        self.config.save(&config_path(&self.sod_dir))
    }

    pub fn save_aux_registry(&self) -> Result<(), AuxError> {
        self.aux_registry.save(&aux_registry_path(&self.sod_dir))
    }

    pub fn aux_cache_dir(&self, name: &str) -> PathBuf {
        crate::aux::cache_dir_for(&self.sod_dir, name)
    }
}

fn config_path(sod_dir: &Path) -> PathBuf {
    sod_dir.join("config")
}

fn index_path(sod_dir: &Path) -> PathBuf {
    sod_dir.join("index")
}

fn digest_cache_path(sod_dir: &Path) -> PathBuf {
    sod_dir.join("cache").join("digests")
}

fn aux_registry_path(sod_dir: &Path) -> PathBuf {
    sod_dir.join("aux").join("registry.json")
}
