// Configuration for the tasklist CLI

use eyre::{Context, Result, eyre};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::blob::{BlobStore, FileBlobStore, SqliteBlobStore, validate_key};
use crate::store::DEFAULT_KEY;

/// Storage backend for the task blob
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// One JSON file per key
    #[default]
    File,
    /// A key-value table in `tasklist.db`
    Sqlite,
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backend::File => write!(f, "file"),
            Backend::Sqlite => write!(f, "sqlite"),
        }
    }
}

impl FromStr for Backend {
    type Err = eyre::Report;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "file" => Ok(Backend::File),
            "sqlite" => Ok(Backend::Sqlite),
            other => Err(eyre!("Unknown backend: {} (expected file or sqlite)", other)),
        }
    }
}

/// Settings read from `config.yml`; every field is optional
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Directory holding the task data
    pub data_dir: Option<PathBuf>,
    pub backend: Backend,
    /// Blob key the task collection is stored under
    pub key: Option<String>,
}

impl Config {
    /// Default config file location (`<config dir>/tasklist/config.yml`)
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("tasklist").join("config.yml"))
    }

    /// Load configuration
    ///
    /// An explicit `path` must exist. Without one, the default location is
    /// used if present and built-in defaults otherwise.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => match Self::default_path() {
                Some(path) if path.exists() => Self::from_file(&path),
                _ => Ok(Self::default()),
            },
        }
    }

    /// Parse a YAML config file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).with_context(|| format!("Failed to read config file {:?}", path))?;
        Self::from_yaml(&content).with_context(|| format!("Invalid config file {:?}", path))
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yaml::from_str(content).context("Failed to parse YAML config")?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the blob stores would refuse later
    pub fn validate(&self) -> Result<()> {
        if let Some(key) = &self.key {
            validate_key(key).context("Invalid key in config")?;
        }
        Ok(())
    }

    /// Directory task data lives in, falling back to `<data dir>/tasklist`
    pub fn data_dir(&self) -> Result<PathBuf> {
        match &self.data_dir {
            Some(dir) => Ok(dir.clone()),
            None => dirs::data_dir()
                .map(|d| d.join("tasklist"))
                .ok_or_else(|| eyre!("Could not determine a data directory; set data_dir or pass --data-dir")),
        }
    }

    pub fn key(&self) -> &str {
        self.key.as_deref().unwrap_or(DEFAULT_KEY)
    }

    /// Open the configured blob store
    pub fn open_blob_store(&self) -> Result<Box<dyn BlobStore>> {
        let dir = self.data_dir()?;
        let store: Box<dyn BlobStore> = match self.backend {
            Backend::File => Box::new(FileBlobStore::open(&dir)?),
            Backend::Sqlite => Box::new(SqliteBlobStore::open(dir.join("tasklist.db"))?),
        };
        Ok(store)
    }
}
