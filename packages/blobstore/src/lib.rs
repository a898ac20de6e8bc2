//! Key-addressed blob storage over a local directory or an S3-compatible bucket.
//!
//! Both backends implement [`StorageBackend`], so callers can hold an
//! `Arc<dyn StorageBackend>` and stay unaware of where blobs live.
//!
//! ```no_run
//! use blobstore::{LocalStorage, StorageBackend};
//!
//! # async fn demo() -> blobstore::StorageResult<()> {
//! let store = LocalStorage::with_root("/tmp/test");
//! store.write("test.txt", &mut &b"test123"[..]).await?;
//! assert_eq!(&store.read("test.txt").await?[..], b"test123");
//! # Ok(())
//! # }
//! ```

pub mod mime;
pub mod storage;

pub use storage::{
    LocalConfig, LocalStorage, S3Config, S3Storage, StorageBackend, StorageError, StorageResult,
    StoreConfig, DEFAULT_PERMISSIONS,
};
