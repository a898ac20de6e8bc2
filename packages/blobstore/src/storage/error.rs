// Storage error types shared by every backend
use std::path::PathBuf;
use thiserror::Error;

/// Errors returned by storage operations
///
/// Variants carry the key or path the operation was addressing where there
/// is one.
#[derive(Debug, Error)]
pub enum StorageError {
    /// No blob is stored under the key
    #[error("Blob not found: {key}")]
    NotFound { key: String },

    /// Local filesystem failure other than a missing file
    #[error("IO error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Remote provider or network failure
    #[error("Transport error for {key}: {message}")]
    Transport { key: String, message: String },

    /// Content could not be read or classified
    #[error("Validation error: {0}")]
    Validation(String),

    /// Configuration cannot produce a usable store
    #[error("Invalid storage configuration: {0}")]
    InvalidConfig(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

impl StorageError {
    /// Wrap an IO error, folding `ErrorKind::NotFound` into `NotFound`
    pub fn io(key: &str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        if source.kind() == std::io::ErrorKind::NotFound {
            StorageError::NotFound {
                key: key.to_string(),
            }
        } else {
            StorageError::Io {
                path: path.into(),
                source,
            }
        }
    }

    pub fn transport(key: &str, message: impl ToString) -> Self {
        StorageError::Transport {
            key: key.to_string(),
            message: message.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::NotFound { .. })
    }
}
