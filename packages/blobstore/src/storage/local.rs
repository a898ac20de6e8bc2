// Local filesystem storage backend
use super::config::LocalConfig;
use super::{StorageBackend, StorageError, StorageResult};
use async_trait::async_trait;
use bytes::Bytes;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};

/// File mode used when no permissions are configured (rw-r--r--)
pub const DEFAULT_PERMISSIONS: u32 = 0o644;

/// Local filesystem storage backend
///
/// Every key is a single file directly inside the root directory:
/// `{root}/{key}`. No subdirectories are created, so keys must be valid
/// file names.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    config: LocalConfig,
}

impl LocalStorage {
    /// Create a new LocalStorage instance with the given configuration
    pub fn new(config: LocalConfig) -> Self {
        Self { config }
    }

    /// Create a new LocalStorage instance from a root path
    pub fn with_root<P: AsRef<Path>>(root: P) -> Self {
        Self::new(LocalConfig {
            root: root.as_ref().to_path_buf(),
            permissions: None,
        })
    }

    /// Set the mode applied to written files
    pub fn with_permissions(mut self, mode: u32) -> Self {
        self.config.permissions = Some(mode);
        self
    }

    /// Get the root directory for storage
    pub fn root(&self) -> &Path {
        &self.config.root
    }

    /// Effective file mode for written blobs
    pub fn permissions(&self) -> u32 {
        self.config.permissions.unwrap_or(DEFAULT_PERMISSIONS)
    }

    /// Convert a key to its file path
    ///
    /// Leading slashes are dropped so a key can never escape to an absolute
    /// path.
    fn key_to_path(&self, key: &str) -> PathBuf {
        self.config.root.join(key.trim_start_matches('/'))
    }

    #[cfg(unix)]
    async fn apply_permissions(&self, path: &Path) -> std::io::Result<()> {
        use std::os::unix::fs::PermissionsExt;

        fs::set_permissions(path, std::fs::Permissions::from_mode(self.permissions())).await
    }

    #[cfg(not(unix))]
    async fn apply_permissions(&self, _path: &Path) -> std::io::Result<()> {
        Ok(())
    }
}

#[async_trait]
impl StorageBackend for LocalStorage {
    async fn read(&self, key: &str) -> StorageResult<Bytes> {
        let path = self.key_to_path(key);
        tracing::debug!("Reading file: {}", path.display());

        let data = fs::read(&path)
            .await
            .map_err(|e| StorageError::io(key, &path, e))?;

        Ok(Bytes::from(data))
    }

    async fn write(
        &self,
        key: &str,
        value: &mut (dyn AsyncRead + Unpin + Send),
    ) -> StorageResult<()> {
        let path = self.key_to_path(key);
        let io_err = |source| StorageError::Io {
            path: path.clone(),
            source,
        };

        let mut data = Vec::new();
        value.read_to_end(&mut data).await.map_err(io_err)?;

        let mut options = fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        options.mode(self.permissions());

        let mut file = options.open(&path).await.map_err(io_err)?;
        file.write_all(&data).await.map_err(io_err)?;
        file.flush().await.map_err(io_err)?;

        // open() only applies the mode to new files and is subject to umask
        self.apply_permissions(&path).await.map_err(io_err)?;

        tracing::info!("Stored file: {} ({} bytes)", path.display(), data.len());

        Ok(())
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        let path = self.key_to_path(key);

        fs::remove_file(&path)
            .await
            .map_err(|e| StorageError::io(key, &path, e))?;

        tracing::info!("Deleted file: {}", path.display());

        Ok(())
    }

    async fn exists(&self, key: &str) -> StorageResult<bool> {
        let path = self.key_to_path(key);

        let metadata = fs::metadata(&path)
            .await
            .map_err(|e| StorageError::io(key, &path, e))?;

        Ok(!metadata.is_dir())
    }

    async fn list(&self) -> StorageResult<Vec<String>> {
        let root = &self.config.root;
        let io_err = |source| StorageError::Io {
            path: root.clone(),
            source,
        };

        let mut entries = fs::read_dir(root).await.map_err(io_err)?;
        let mut keys = Vec::new();

        while let Some(entry) = entries.next_entry().await.map_err(io_err)? {
            let file_type = entry.file_type().await.map_err(io_err)?;
            if file_type.is_dir() {
                continue;
            }
            // A lossy name would not map back to the same file
            match entry.file_name().into_string() {
                Ok(name) => keys.push(name),
                Err(name) => {
                    tracing::warn!("Skipping non UTF-8 file name in {}: {:?}", root.display(), name);
                }
            }
        }

        tracing::debug!("Listed {} keys in {}", keys.len(), root.display());

        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_storage() -> (LocalStorage, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let storage = LocalStorage::with_root(temp_dir.path());
        (storage, temp_dir)
    }

    fn missing_root_storage() -> (LocalStorage, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let storage = LocalStorage::with_root(temp_dir.path().join("does-not-exist"));
        (storage, temp_dir)
    }

    async fn put(storage: &LocalStorage, key: &str, data: &[u8]) {
        let mut reader = data;
        storage.write(key, &mut reader).await.unwrap();
    }

    #[tokio::test]
    async fn test_write_and_read() {
        let (storage, _temp) = create_test_storage();

        put(&storage, "test.txt", b"test123").await;

        let data = storage.read("test.txt").await.unwrap();
        assert_eq!(&data[..], b"test123");
    }

    #[tokio::test]
    async fn test_full_lifecycle() {
        let (storage, _temp) = create_test_storage();

        put(&storage, "test.txt", b"test123").await;
        assert_eq!(&storage.read("test.txt").await.unwrap()[..], b"test123");
        assert_eq!(storage.list().await.unwrap(), vec!["test.txt".to_string()]);

        storage.delete("test.txt").await.unwrap();

        let err = storage.read("test.txt").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_overwrite_replaces_content() {
        let (storage, _temp) = create_test_storage();

        put(&storage, "k", b"a much longer first value").await;
        put(&storage, "k", b"short").await;

        assert_eq!(&storage.read("k").await.unwrap()[..], b"short");
    }

    #[tokio::test]
    async fn test_read_missing_is_not_found() {
        let (storage, _temp) = create_test_storage();

        let err = storage.read("nope").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_read_directory_fails() {
        let (storage, temp) = create_test_storage();
        std::fs::create_dir(temp.path().join("sub")).unwrap();

        assert!(storage.read("sub").await.is_err());
    }

    #[tokio::test]
    async fn test_delete_missing_fails() {
        let (storage, _temp) = create_test_storage();

        let err = storage.delete("nope").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_exists() {
        let (storage, temp) = create_test_storage();

        put(&storage, "present", b"x").await;
        assert!(storage.exists("present").await.unwrap());

        // A missing file is an error, not false
        assert!(storage.exists("absent").await.is_err());

        std::fs::create_dir(temp.path().join("sub")).unwrap();
        assert!(!storage.exists("sub").await.unwrap());
    }

    #[tokio::test]
    async fn test_empty_blob_exists() {
        let (storage, _temp) = create_test_storage();

        put(&storage, "empty", b"").await;

        assert!(storage.exists("empty").await.unwrap());
        assert!(storage.read("empty").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_skips_directories() {
        let (storage, temp) = create_test_storage();

        put(&storage, "a.txt", b"a").await;
        put(&storage, "b.bin", b"b").await;
        std::fs::create_dir(temp.path().join("nested")).unwrap();

        let mut keys = storage.list().await.unwrap();
        keys.sort();
        assert_eq!(keys, vec!["a.txt".to_string(), "b.bin".to_string()]);
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn test_list_skips_non_utf8_names() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let (storage, temp) = create_test_storage();
        put(&storage, "plain.txt", b"a").await;
        std::fs::write(temp.path().join(OsStr::from_bytes(b"bad-\xff.bin")), b"b").unwrap();

        let keys = storage.list().await.unwrap();
        assert_eq!(keys, vec!["plain.txt".to_string()]);
        for key in keys {
            assert!(storage.read(&key).await.is_ok());
        }
    }

    #[tokio::test]
    async fn test_list_empty_root() {
        let (storage, _temp) = create_test_storage();

        assert!(storage.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_root_fails_everywhere() {
        let (storage, _temp) = missing_root_storage();

        let mut reader: &[u8] = b"data";
        assert!(storage.write("k", &mut reader).await.is_err());
        assert!(storage.read("k").await.is_err());
        assert!(storage.delete("k").await.is_err());
        assert!(storage.exists("k").await.is_err());
        assert!(storage.list().await.is_err());
    }

    #[tokio::test]
    async fn test_leading_slash_stays_under_root() {
        let (storage, temp) = create_test_storage();

        put(&storage, "/rooted", b"x").await;

        assert!(temp.path().join("rooted").is_file());
    }

    #[tokio::test]
    async fn test_large_file() {
        let (storage, _temp) = create_test_storage();

        // Create 1MB file
        let data = vec![0xAB; 1_000_000];
        put(&storage, "large", &data).await;

        let retrieved = storage.read("large").await.unwrap();
        assert_eq!(retrieved.len(), data.len());
        assert_eq!(&retrieved[..], &data[..]);
    }

    #[tokio::test]
    async fn test_concurrent_writes() {
        let (storage, _temp) = create_test_storage();

        let mut d1: &[u8] = b"concurrent 1";
        let mut d2: &[u8] = b"concurrent 2";
        let mut d3: &[u8] = b"concurrent 3";

        let (r1, r2, r3) = tokio::join!(
            storage.write("one", &mut d1),
            storage.write("two", &mut d2),
            storage.write("three", &mut d3)
        );

        assert!(r1.is_ok());
        assert!(r2.is_ok());
        assert!(r3.is_ok());
        assert_eq!(storage.list().await.unwrap().len(), 3);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_default_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let (storage, temp) = create_test_storage();
        put(&storage, "perm", b"x").await;

        let mode = std::fs::metadata(temp.path().join("perm")).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o644);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_custom_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let temp = TempDir::new().unwrap();
        let storage = LocalStorage::with_root(temp.path()).with_permissions(0o600);
        assert_eq!(storage.permissions(), 0o600);

        put(&storage, "perm", b"x").await;

        let mode = std::fs::metadata(temp.path().join("perm")).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_storage_config() {
        let config = LocalConfig {
            root: PathBuf::from("/tmp/test"),
            permissions: None,
        };

        let storage = LocalStorage::new(config);
        assert_eq!(storage.root(), Path::new("/tmp/test"));
        assert_eq!(storage.permissions(), DEFAULT_PERMISSIONS);
        assert_eq!(storage.key_to_path("a.txt"), PathBuf::from("/tmp/test/a.txt"));
    }
}
