//! Repository configuration: `.sod/config`, a flat TOML table read with the
//! `toml` crate rather than a hand-rolled `key=value` scanner (SPEC_FULL.md
//! §3 — correct quoting/escaping for free).

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::digest::HASH_ALGO_NAME;
use crate::file_util::persist_temp_file;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error reading config: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed config file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("unknown config key `{0}`")]
    UnknownKey(String),
}

/// `core.*` keys: repository identity, fixed at `init` time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreConfig {
    #[serde(rename = "hashAlgo")]
    pub hash_algo: String,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self { hash_algo: HASH_ALGO_NAME.to_string() }
    }
}

/// `user.*` keys: commit author identity.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserConfig {
    pub name: Option<String>,
}

/// `snapshot.*` keys: the post-commit external hook.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SnapshotConfig {
    pub command: Option<String>,
    #[serde(rename = "commandTimeoutSecs")]
    pub command_timeout_secs: Option<u64>,
}

/// `diff.*` keys: differ defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiffConfig {
    #[serde(rename = "renameLimit")]
    pub rename_limit: u32,
}

impl Default for DiffConfig {
    fn default() -> Self {
        Self { rename_limit: 1000 }
    }
}

/// The full contents of `.sod/config`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub core: CoreConfig,
    #[serde(default)]
    pub user: UserConfig,
    #[serde(default)]
    pub snapshot: SnapshotConfig,
    #[serde(default)]
    pub diff: DiffConfig,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        Ok(toml::from_str(&text)?)
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let text = toml::to_string_pretty(self)?;
        let dir = path.parent().expect("config path always has a parent");
        let mut temp_file = tempfile::NamedTempFile::new_in(dir)?;
        std::io::Write::write_all(&mut temp_file, text.as_bytes())?;
        persist_temp_file(temp_file, path)?;
        Ok(())
    }

    /// The author name used for new commits: explicit `user.name`, falling
    /// back to the OS account's real name (SPEC_FULL.md §4.H), mirroring
    /// the template's own use of `whoami` for a default identity.
    pub fn author_name(&self) -> String {
        self.user.name.clone().unwrap_or_else(whoami::realname)
    }

    /// Dotted-key lookup, for `sod config get KEY`.
    pub fn get(&self, key: &str) -> Result<Option<String>, ConfigError> {
        Ok(self.as_map().get(key).cloned())
    }

    /// Dotted-key assignment, for `sod config set KEY VALUE`.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        match key {
            "user.name" => self.user.name = Some(value.to_string()),
            "snapshot.command" => self.snapshot.command = Some(value.to_string()),
            "snapshot.commandTimeoutSecs" => {
                self.snapshot.command_timeout_secs = Some(
                    value.parse().map_err(|_| ConfigError::UnknownKey(key.to_string()))?,
                );
            }
            "diff.renameLimit" => {
                self.diff.rename_limit =
                    value.parse().map_err(|_| ConfigError::UnknownKey(key.to_string()))?;
            }
            _ => return Err(ConfigError::UnknownKey(key.to_string())),
        }
        Ok(())
    }

    /// All present keys, for `sod config list`.
    pub fn as_map(&self) -> BTreeMap<String, String> {
        let mut map = BTreeMap::new();
        map.insert("core.hashAlgo".to_string(), self.core.hash_algo.clone());
        if let Some(name) = &self.user.name {
            map.insert("user.name".to_string(), name.clone());
        }
        if let Some(command) = &self.snapshot.command {
            map.insert("snapshot.command".to_string(), command.clone());
        }
        if let Some(timeout) = self.snapshot.command_timeout_secs {
            map.insert("snapshot.commandTimeoutSecs".to_string(), timeout.to_string());
        }
        map.insert("diff.renameLimit".to_string(), self.diff.rename_limit.to_string());
        map
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn default_config_has_hash_algo() {
        let config = Config { core: CoreConfig::default(), ..Default::default() };
        assert_eq!(config.core.hash_algo, HASH_ALGO_NAME);
    }

    #[test]
    fn save_and_load_roundtrips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config");
        let mut config = Config { core: CoreConfig::default(), ..Default::default() };
        config.set("user.name", "jane").unwrap();
        config.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.user.name.as_deref(), Some("jane"));
        assert_eq!(loaded.diff.rename_limit, 1000);
    }

    #[test]
    fn set_rejects_unknown_key() {
        let mut config = Config { core: CoreConfig::default(), ..Default::default() };
        assert_matches!(config.set("bogus.key", "x"), Err(ConfigError::UnknownKey(_)));
    }
}
