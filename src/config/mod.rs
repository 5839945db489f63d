//! Configuration management for gator.
//!
//! The configuration is a small JSON record read from `~/.gatorconfig.json`
//! at startup. It names the database and remembers which user is logged in.

use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::app::{GatorError, Result};

pub const CONFIG_FILE_NAME: &str = ".gatorconfig.json";

/// Persisted configuration record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub db_url: String,
    pub current_user_name: String,
}

impl Config {
    /// Get the default config file path: `~/.gatorconfig.json`
    pub fn default_config_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| GatorError::Config("Could not find home directory".into()))?;
        Ok(home.join(CONFIG_FILE_NAME))
    }

    /// The logged-in user, if any. An empty name means nobody.
    pub fn current_user(&self) -> Option<&str> {
        let name = self.current_user_name.trim();
        (!name.is_empty()).then_some(name)
    }
}

/// Read/write access to the persisted configuration.
pub trait ConfigStore {
    fn read(&self) -> Config;

    /// Persist `name` as the current user and return the updated record.
    fn set_current_user(&self, name: &str) -> Result<Config>;
}

/// JSON file on disk.
#[derive(Debug, Clone)]
pub struct JsonConfigStore {
    path: PathBuf,
}

impl JsonConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn load(&self) -> Result<Config> {
        let content = fs::read_to_string(&self.path)?;
        let config = serde_json::from_str(&content)?;
        Ok(config)
    }
}

impl ConfigStore for JsonConfigStore {
    /// An unreadable or undecodable file yields the default record.
    fn read(&self) -> Config {
        match self.load() {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(
                    path = %self.path.display(),
                    "Could not read config, using defaults: {}",
                    e
                );
                Config::default()
            }
        }
    }

    fn set_current_user(&self, name: &str) -> Result<Config> {
        let mut config = self.read();
        config.current_user_name = name.to_string();

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let content = serde_json::to_string_pretty(&config)?;
        fs::write(&self.path, content)?;

        tracing::debug!(path = %self.path.display(), user = name, "Current user saved");
        Ok(config)
    }
}

/// Configuration held in memory, for tests and embedding.
#[derive(Debug, Default)]
pub struct MemoryConfigStore {
    config: Mutex<Config>,
}

impl MemoryConfigStore {
    pub fn new(config: Config) -> Self {
        Self {
            config: Mutex::new(config),
        }
    }
}

impl ConfigStore for MemoryConfigStore {
    fn read(&self) -> Config {
        self.config
            .lock()
            .map(|config| config.clone())
            .unwrap_or_default()
    }

    fn set_current_user(&self, name: &str) -> Result<Config> {
        let mut config = self
            .config
            .lock()
            .map_err(|_| GatorError::Config("config lock poisoned".into()))?;
        config.current_user_name = name.to_string();
        Ok(config.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_json_record() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        fs::write(
            &path,
            r#"{"db_url":"sqlite:///tmp/gator.db","current_user_name":"alice"}"#,
        )
        .unwrap();

        let config = JsonConfigStore::new(&path).read();
        assert_eq!(config.db_url, "sqlite:///tmp/gator.db");
        assert_eq!(config.current_user(), Some("alice"));
    }

    #[test]
    fn test_missing_fields_default() {
        let config: Config = serde_json::from_str(r#"{"db_url":"gator.db"}"#).unwrap();
        assert_eq!(config.db_url, "gator.db");
        assert_eq!(config.current_user(), None);
    }

    #[test]
    fn test_unreadable_config_degrades_to_default() {
        let dir = tempfile::tempdir().unwrap();

        let missing = JsonConfigStore::new(dir.path().join("missing.json"));
        assert_eq!(missing.read(), Config::default());

        let garbled_path = dir.path().join("garbled.json");
        fs::write(&garbled_path, "{ not json").unwrap();
        let garbled = JsonConfigStore::new(&garbled_path);
        assert_eq!(garbled.read(), Config::default());
    }

    #[test]
    fn test_set_current_user_keeps_db_url() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        fs::write(&path, r#"{"db_url":"gator.db","current_user_name":""}"#).unwrap();

        let store = JsonConfigStore::new(&path);
        let updated = store.set_current_user("bob").unwrap();
        assert_eq!(updated.current_user(), Some("bob"));

        let reread = store.read();
        assert_eq!(reread.db_url, "gator.db");
        assert_eq!(reread.current_user_name, "bob");
    }

    #[test]
    fn test_set_current_user_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(CONFIG_FILE_NAME);

        let store = JsonConfigStore::new(&path);
        store.set_current_user("carol").unwrap();

        assert!(path.exists());
        assert_eq!(store.read().current_user(), Some("carol"));
    }

    #[test]
    fn test_blank_user_is_nobody() {
        let config = Config {
            db_url: String::new(),
            current_user_name: "   ".into(),
        };
        assert_eq!(config.current_user(), None);
    }

    #[test]
    fn test_memory_store() {
        let store = MemoryConfigStore::default();
        assert_eq!(store.read().current_user(), None);
        store.set_current_user("dave").unwrap();
        assert_eq!(store.read().current_user(), Some("dave"));
    }
}
