//! Object storage backend abstraction (S3/MinIO/local filesystem/memory).

use std::ops::Range;
use std::path::PathBuf;
use std::sync::Arc;

use bytes::Bytes;
use futures::stream::BoxStream;
use object_store::aws::AmazonS3Builder;
use object_store::local::LocalFileSystem;
use object_store::memory::InMemory;
use object_store::path::Path as ObjectPath;
use object_store::{GetOptions, GetRange, ObjectStore};
use serde::{Deserialize, Serialize};

use crate::error::{Result, StoreError};

/// Configuration for the object storage backend.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ObjectStoreConfig {
    /// In-memory storage (for testing)
    #[default]
    Memory,

    /// Local filesystem storage
    Local {
        /// Path to the storage directory
        path: PathBuf,
    },

    /// S3-compatible storage (AWS S3, MinIO, etc.)
    S3 {
        /// S3 endpoint URL (e.g., "http://localhost:9000" for MinIO)
        endpoint: String,
        /// Access key ID
        access_key: String,
        /// Secret access key
        secret_key: String,
        /// Bucket name
        bucket: String,
        /// Optional region (defaults to "us-east-1")
        region: Option<String>,
    },
}

/// Wrapper around different object storage backends.
#[derive(Debug, Clone)]
pub(crate) struct Storage {
    inner: Arc<dyn ObjectStore>,
}

impl Storage {
    /// Create a new storage backend from configuration.
    pub async fn new(config: ObjectStoreConfig) -> Result<Self> {
        let inner: Arc<dyn ObjectStore> = match &config {
            ObjectStoreConfig::Memory => Arc::new(InMemory::new()),

            ObjectStoreConfig::Local { path } => {
                tokio::fs::create_dir_all(path).await?;
                Arc::new(
                    LocalFileSystem::new_with_prefix(path)
                        .map_err(|e| StoreError::InvalidConfig(e.to_string()))?,
                )
            }

            ObjectStoreConfig::S3 {
                endpoint,
                access_key,
                secret_key,
                bucket,
                region,
            } => {
                let builder = AmazonS3Builder::new()
                    .with_endpoint(endpoint)
                    .with_access_key_id(access_key)
                    .with_secret_access_key(secret_key)
                    .with_bucket_name(bucket)
                    .with_region(region.as_deref().unwrap_or("us-east-1"))
                    .with_allow_http(endpoint.starts_with("http://"));

                let store: Arc<dyn ObjectStore> = Arc::new(
                    builder
                        .build()
                        .map_err(|e| StoreError::InvalidConfig(e.to_string()))?,
                );

                // Fail fast if the bucket doesn't exist
                {
                    use futures::TryStreamExt;
                    let prefix = ObjectPath::from("");
                    let mut stream = store.list(Some(&prefix));
                    match stream.try_next().await {
                        Ok(_) => {}
                        Err(object_store::Error::NotFound { .. }) => {
                            return Err(StoreError::BucketNotFound(bucket.clone()));
                        }
                        Err(e) => {
                            let msg = e.to_string();
                            if msg.contains("NoSuchBucket")
                                || msg.contains("bucket") && msg.contains("not")
                            {
                                return Err(StoreError::BucketNotFound(bucket.clone()));
                            }
                            return Err(e.into());
                        }
                    }
                }

                store
            }
        };

        Ok(Self { inner })
    }

    /// Build the object path for a file's bytes.
    fn data_path(name: &str) -> ObjectPath {
        ObjectPath::from(format!("files/{}", name))
    }

    /// Put file bytes into storage.
    pub async fn put_data(&self, name: &str, data: Bytes) -> Result<()> {
        let path = Self::data_path(name);
        self.inner.put(&path, data.into()).await?;
        Ok(())
    }

    /// Open a file's bytes for streaming, optionally only the half-open
    ///  `range`. `None` if the object is missing.
    pub async fn get_stream(
        &self,
        name: &str,
        range: Option<Range<usize>>,
    ) -> Result<Option<BoxStream<'static, object_store::Result<Bytes>>>> {
        let path = Self::data_path(name);
        let options = GetOptions {
            range: range.map(GetRange::from),
            ..Default::default()
        };
        match self.inner.get_opts(&path, options).await {
            Ok(result) => Ok(Some(result.into_stream())),
            Err(object_store::Error::NotFound { .. }) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Delete a file's bytes. Missing objects are not an error.
    pub async fn delete_data(&self, name: &str) -> Result<()> {
        let path = Self::data_path(name);
        match self.inner.delete(&path).await {
            Ok(()) => Ok(()),
            Err(object_store::Error::NotFound { .. }) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
impl Storage {
    /// Create an in-memory storage backend (test-only).
    pub fn memory() -> Self {
        Self {
            inner: Arc::new(InMemory::new()),
        }
    }

    /// Read a whole object (or range) into memory.
    pub async fn read_all(&self, name: &str, range: Option<Range<usize>>) -> Result<Option<Bytes>> {
        use futures::TryStreamExt;

        let Some(stream) = self.get_stream(name, range).await? else {
            return Ok(None);
        };
        let chunks: Vec<Bytes> = stream.try_collect().await?;
        Ok(Some(Bytes::from(chunks.concat())))
    }

    /// Check if file bytes exist in storage.
    pub async fn has_data(&self, name: &str) -> Result<bool> {
        let path = Self::data_path(name);
        match self.inner.head(&path).await {
            Ok(_) => Ok(true),
            Err(object_store::Error::NotFound { .. }) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_storage() {
        let storage = Storage::memory();

        let data = Bytes::from("hello world");

        storage.put_data("hello.txt", data.clone()).await.unwrap();
        let retrieved = storage.read_all("hello.txt", None).await.unwrap().unwrap();
        assert_eq!(retrieved, data);
        assert!(storage.has_data("hello.txt").await.unwrap());

        let world = storage
            .read_all("hello.txt", Some(6..11))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(world, Bytes::from("world"));

        storage.delete_data("hello.txt").await.unwrap();
        assert!(!storage.has_data("hello.txt").await.unwrap());
        assert!(storage.read_all("hello.txt", None).await.unwrap().is_none());

        // deleting twice is fine
        storage.delete_data("hello.txt").await.unwrap();
    }

    #[tokio::test]
    async fn test_local_storage() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config = ObjectStoreConfig::Local {
            path: temp_dir.path().to_path_buf(),
        };

        let storage = Storage::new(config).await.unwrap();

        let data = Bytes::from("test data");

        storage.put_data("def456", data.clone()).await.unwrap();
        let retrieved = storage.read_all("def456", None).await.unwrap().unwrap();
        assert_eq!(retrieved, data);

        let file_path = temp_dir.path().join("files").join("def456");
        assert!(file_path.exists());
    }
}
