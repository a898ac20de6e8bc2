// S3-compatible storage backend

use async_trait::async_trait;
use aws_sdk_s3::{
    config::{BehaviorVersion, Builder, Credentials, Region},
    error::DisplayErrorContext,
    primitives::ByteStream,
    Client,
};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncReadExt};

use super::{StorageBackend, StorageError, StorageResult};
use crate::mime;

/// S3 storage backend configuration
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct S3Config {
    /// Custom endpoint (for MinIO, LocalStack, etc.); `None` uses AWS
    pub endpoint: Option<String>,
    /// Region of the bucket
    pub region: String,
    /// Static access key ID
    pub access_key: String,
    /// Static secret access key
    pub secret_key: String,
    /// Bucket name
    pub bucket: String,
    /// Prefix that scopes listings (e.g. "team-a/")
    pub prefix: String,
    /// Talk plain HTTP to the endpoint
    pub disable_tls: bool,
}

impl S3Config {
    /// Endpoint URL with the scheme implied by `disable_tls`
    pub fn endpoint_url(&self) -> Option<String> {
        let endpoint = self.endpoint.as_deref()?.trim();
        if endpoint.is_empty() {
            return None;
        }

        let host = endpoint
            .strip_prefix("https://")
            .or_else(|| endpoint.strip_prefix("http://"))
            .unwrap_or(endpoint);
        let scheme = if self.disable_tls { "http" } else { "https" };

        Some(format!("{}://{}", scheme, host))
    }
}

/// S3-compatible storage backend
///
/// Keys are used verbatim as object keys; the prefix only scopes `list`.
#[derive(Debug, Clone)]
pub struct S3Storage {
    client: Client,
    bucket: String,
    prefix: String,
}

impl S3Storage {
    /// Build a client from static credentials in `config`
    pub fn from_config(config: S3Config) -> StorageResult<Self> {
        if config.bucket.is_empty() {
            return Err(StorageError::InvalidConfig("S3 bucket name is empty".to_string()));
        }

        let creds =
            Credentials::new(&config.access_key, &config.secret_key, None, None, "static");

        let mut builder = Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .credentials_provider(creds)
            .force_path_style(true);

        if let Some(endpoint) = config.endpoint_url() {
            builder = builder.endpoint_url(endpoint);
        }

        let client = Client::from_conf(builder.build());

        tracing::debug!(
            "Created S3 client for bucket {} (endpoint: {:?})",
            config.bucket,
            config.endpoint_url()
        );

        Ok(Self::with_client(client, config.bucket, config.prefix))
    }

    /// Wrap an already configured client
    ///
    /// Lets callers inject their own credentials chain or share one client
    /// between several stores.
    pub fn with_client(
        client: Client,
        bucket: impl Into<String>,
        prefix: impl Into<String>,
    ) -> Self {
        Self {
            client,
            bucket: bucket.into(),
            prefix: prefix.into(),
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }
}

#[async_trait]
impl StorageBackend for S3Storage {
    async fn read(&self, key: &str) -> StorageResult<Bytes> {
        let result = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                if e.as_service_error().is_some_and(|se| se.is_no_such_key()) {
                    StorageError::NotFound { key: key.to_string() }
                } else {
                    let message = format!("Failed to read object: {}", DisplayErrorContext(&e));
                    StorageError::transport(key, message)
                }
            })?;

        let data = result
            .body
            .collect()
            .await
            .map_err(|e| {
                let message = format!("Failed to read object body: {}", DisplayErrorContext(&e));
                StorageError::transport(key, message)
            })?;

        Ok(data.into_bytes())
    }

    async fn write(
        &self,
        key: &str,
        value: &mut (dyn AsyncRead + Unpin + Send),
    ) -> StorageResult<()> {
        let mut data = Vec::new();
        value
            .read_to_end(&mut data)
            .await
            .map_err(|e| {
                StorageError::Validation(format!("Failed to read input for {}: {}", key, e))
            })?;

        let content_type = mime::detect(&data);
        let size = data.len();

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(&content_type)
            .body(ByteStream::from(data))
            .send()
            .await
            .map_err(|e| {
                let message = format!("Failed to upload object: {}", DisplayErrorContext(&e));
                StorageError::transport(key, message)
            })?;

        tracing::info!("Uploaded object: {} ({} bytes, {})", key, size, content_type);

        Ok(())
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                let message = format!("Failed to delete object: {}", DisplayErrorContext(&e));
                StorageError::transport(key, message)
            })?;

        tracing::info!("Deleted object: {}", key);

        Ok(())
    }

    async fn exists(&self, key: &str) -> StorageResult<bool> {
        let head = self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                if e.as_service_error().is_some_and(|se| se.is_not_found()) {
                    StorageError::NotFound { key: key.to_string() }
                } else {
                    let message = format!("Failed to check object: {}", DisplayErrorContext(&e));
                    StorageError::transport(key, message)
                }
            })?;

        // Zero-length objects count as absent
        Ok(head.content_length.unwrap_or(0) > 0)
    }

    async fn list(&self) -> StorageResult<Vec<String>> {
        let mut request = self.client.list_objects_v2().bucket(&self.bucket);
        if !self.prefix.is_empty() {
            request = request.prefix(&self.prefix);
        }

        // Single page only; continuation tokens are not followed
        let result = request
            .send()
            .await
            .map_err(|e| {
                let message = format!("Failed to list objects: {}", DisplayErrorContext(&e));
                StorageError::transport(&self.prefix, message)
            })?;

        let keys: Vec<String> = result
            .contents
            .unwrap_or_default()
            .into_iter()
            .filter_map(|obj| obj.key)
            .collect();

        tracing::debug!("Listed {} objects in {}/{}", keys.len(), self.bucket, self.prefix);

        Ok(keys)
    }
}
