// Storage backend trait and implementations
use async_trait::async_trait;
use bytes::Bytes;
use tokio::io::AsyncRead;

mod config;
mod error;
mod local;
mod s3;

pub use config::{LocalConfig, StoreConfig};
pub use error::{StorageError, StorageResult};
pub use local::{LocalStorage, DEFAULT_PERMISSIONS};
pub use s3::{S3Config, S3Storage};

/// Storage backend trait for key-addressed blobs
///
/// Callers should hold an `Arc<dyn StorageBackend>` and never depend on the
/// concrete backend, so local and S3 stores can be swapped freely.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Return the full contents stored under `key`
    async fn read(&self, key: &str) -> StorageResult<Bytes>;

    /// Replace whatever is stored under `key` with everything `value` yields
    async fn write(
        &self,
        key: &str,
        value: &mut (dyn AsyncRead + Unpin + Send),
    ) -> StorageResult<()>;

    /// Remove the blob under `key`
    ///
    /// The local backend fails on a missing key; the S3 backend does not.
    async fn delete(&self, key: &str) -> StorageResult<()>;

    /// Check whether a blob is stored under `key`
    ///
    /// Returns an error when the check itself fails, including a missing key
    /// on either backend.
    async fn exists(&self, key: &str) -> StorageResult<bool>;

    /// List every key in the store, in backend order
    async fn list(&self) -> StorageResult<Vec<String>>;
}
