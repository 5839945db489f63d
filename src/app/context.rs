use std::path::PathBuf;
use std::sync::Arc;

use crate::app::error::{GatorError, Result};
use crate::config::{Config, ConfigStore};
use crate::fetcher::http_fetcher::HttpFetcher;
use crate::fetcher::Fetcher;
use crate::store::sqlite::SqliteStore;

const MEMORY_DB: &str = ":memory:";

/// The configuration as loaded at process start, updated by `login` and
/// `register` through the [`ConfigStore`].
#[derive(Debug, Clone, Default)]
pub struct Session {
    config: Config,
}

impl Session {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn current_user(&self) -> Option<&str> {
        self.config.current_user()
    }
}

/// Everything a command handler may touch.
pub struct ExecutionState {
    pub store: Arc<SqliteStore>,
    pub fetcher: Arc<dyn Fetcher + Send + Sync>,
    pub session: Session,
    config_store: Box<dyn ConfigStore + Send + Sync>,
}

impl ExecutionState {
    /// Read the configuration once and open the database it names.
    pub fn open(config_store: Box<dyn ConfigStore + Send + Sync>) -> Result<Self> {
        let config = config_store.read();
        let store = match resolve_db_path(&config.db_url)? {
            Some(path) => {
                if let Some(parent) = path.parent() {
                    if !parent.as_os_str().is_empty() {
                        std::fs::create_dir_all(parent)?;
                    }
                }
                tracing::debug!(path = %path.display(), "Opening database");
                SqliteStore::new(&path)?
            }
            None => SqliteStore::in_memory()?,
        };
        let fetcher: Arc<dyn Fetcher + Send + Sync> = Arc::new(HttpFetcher::new()?);

        Ok(Self {
            store: Arc::new(store),
            fetcher,
            session: Session::new(config),
            config_store,
        })
    }

    pub fn with_parts(
        store: Arc<SqliteStore>,
        fetcher: Arc<dyn Fetcher + Send + Sync>,
        config_store: Box<dyn ConfigStore + Send + Sync>,
    ) -> Self {
        let session = Session::new(config_store.read());
        Self {
            store,
            fetcher,
            session,
            config_store,
        }
    }

    /// Persist `name` as the current user and adopt it for this session.
    pub fn set_current_user(&mut self, name: &str) -> Result<()> {
        let config = self.config_store.set_current_user(name)?;
        self.session = Session::new(config);
        Ok(())
    }
}

/// Map `db_url` to a SQLite file. `None` means an in-memory database.
fn resolve_db_path(db_url: &str) -> Result<Option<PathBuf>> {
    let url = db_url.trim();

    if url.is_empty() {
        return default_db_path().map(Some);
    }
    if url == MEMORY_DB {
        return Ok(None);
    }
    if let Some(path) = url.strip_prefix("sqlite://") {
        return match path {
            "" | MEMORY_DB => Ok(None),
            path => Ok(Some(PathBuf::from(path))),
        };
    }
    if let Some((scheme, _)) = url.split_once("://") {
        return Err(GatorError::Config(format!(
            "Unsupported database URL scheme: {}",
            scheme
        )));
    }

    Ok(Some(PathBuf::from(url)))
}

fn default_db_path() -> Result<PathBuf> {
    let data_dir = dirs::data_dir()
        .ok_or_else(|| GatorError::Config("Could not find data directory".into()))?;
    Ok(data_dir.join("gator").join("gator.db"))
}
