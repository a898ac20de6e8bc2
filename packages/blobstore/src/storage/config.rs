// Storage configuration management
use super::{LocalStorage, S3Config, S3Storage, StorageBackend, StorageError, StorageResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;

/// Environment variable naming a local store root
pub const ROOT_ENV: &str = "BLOBSTORE_ROOT";

/// Local store configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalConfig {
    /// Directory holding one file per key
    pub root: PathBuf,

    /// Mode for written files; `None` means 0o644
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permissions: Option<u32>,
}

/// Which backend to build and how
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum StoreConfig {
    Local(LocalConfig),
    S3(S3Config),
}

impl StoreConfig {
    /// Load configuration with the following priority:
    /// 1. explicit config file path
    /// 2. BLOBSTORE_ROOT environment variable
    /// 3. ~/.config/blobstore/config.toml
    /// 4. Default: local store in ~/.cache/blobstore
    pub async fn load(explicit: Option<&Path>) -> StorageResult<Self> {
        // Priority 1: Explicit file, which must exist
        if let Some(path) = explicit {
            return Self::from_file(path).await;
        }

        // Priority 2: Environment variable
        if let Ok(env_path) = std::env::var(ROOT_ENV) {
            return Ok(Self::local(env_path));
        }

        // Priority 3: Config file
        if let Some(config_path) = Self::config_file_path() {
            if config_path.exists() {
                return Self::from_file(&config_path).await;
            }
        }

        // Priority 4: Default
        Ok(Self::default())
    }

    /// Parse a TOML configuration file
    pub async fn from_file(path: &Path) -> StorageResult<Self> {
        let content = fs::read_to_string(path).await.map_err(|source| StorageError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let config = Self::from_toml(&content).map_err(|e| {
            StorageError::InvalidConfig(format!("Failed to parse config file {}: {}", path.display(), e))
        })?;

        tracing::debug!("Loaded storage config from {}", path.display());

        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Get the config file path (~/.config/blobstore/config.toml)
    fn config_file_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("blobstore").join("config.toml"))
    }

    /// Local store at `root` with default permissions
    pub fn local<P: Into<PathBuf>>(root: P) -> Self {
        StoreConfig::Local(LocalConfig {
            root: root.into(),
            permissions: None,
        })
    }

    /// Build the configured backend
    pub fn build(&self) -> StorageResult<Arc<dyn StorageBackend>> {
        match self {
            StoreConfig::Local(config) => Ok(Arc::new(LocalStorage::new(config.clone()))),
            StoreConfig::S3(config) => Ok(Arc::new(S3Storage::from_config(config.clone())?)),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        let root = dirs::cache_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("blobstore");

        Self::local(root)
    }
}
