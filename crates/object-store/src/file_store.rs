//! FileStore - the production [`StorageBackend`], backed by SQLite + object storage.

use std::ops::Range;
use std::path::Path;

use async_trait::async_trait;
use bytes::Bytes;
use common::backend::{
    BackendError, ByteStream, RangeSelection, ServeRequest, StorageBackend, Transfer,
};
use futures::{StreamExt, TryStreamExt};
use common::metadata::{Expiry, Metadata};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::storage::{ObjectStoreConfig, Storage};

/// Per-file settings chosen at upload time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileOptions {
    pub expiry: Expiry,
    /// Negative for unlimited
    pub max_downloads: i64,
    pub access_key: Option<String>,
    /// Guessed from the name when unset
    pub mimetype: Option<String>,
}

impl Default for FileOptions {
    fn default() -> Self {
        Self {
            expiry: Expiry::Never,
            max_downloads: -1,
            access_key: None,
            mimetype: None,
        }
    }
}

/// File metadata in SQLite, file bytes in object storage.
///
/// # Example
///
/// ```rust,no_run
/// use linx_object_store::{FileOptions, FileStore, ObjectStoreConfig};
/// use std::path::Path;
///
/// # async fn example() -> Result<(), linx_object_store::StoreError> {
/// let objects = ObjectStoreConfig::Local {
///     path: "/tmp/linx/objects".into(),
/// };
/// let store = FileStore::new(Path::new("/tmp/linx/files.db"), objects).await?;
/// store
///     .put_file("hello.txt", "hello".into(), FileOptions::default())
///     .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct FileStore {
    db: Database,
    storage: Storage,
}

impl FileStore {
    /// Create a new FileStore with a file-based SQLite database.
    pub async fn new(db_path: &Path, config: ObjectStoreConfig) -> Result<Self> {
        let db = Database::new(db_path).await?;
        let storage = Storage::new(config).await?;
        Ok(Self { db, storage })
    }

    /// Create a new FileStore with an in-memory SQLite database.
    pub async fn in_memory(config: ObjectStoreConfig) -> Result<Self> {
        let db = Database::in_memory().await?;
        let storage = Storage::new(config).await?;
        Ok(Self { db, storage })
    }

    /// Create a fully ephemeral FileStore (in-memory DB + in-memory object storage).
    pub async fn new_ephemeral() -> Result<Self> {
        Self::in_memory(ObjectStoreConfig::Memory).await
    }

    /// Store `data` under `name`, replacing any previous file of that name.
    pub async fn put_file(&self, name: &str, data: Bytes, options: FileOptions) -> Result<Metadata> {
        let content_hash = hex::encode(Sha256::digest(&data));
        let mimetype = options.mimetype.unwrap_or_else(|| {
            mime_guess::from_path(name)
                .first_or_octet_stream()
                .essence_str()
                .to_string()
        });
        let metadata = Metadata {
            name: name.to_string(),
            mimetype,
            size: data.len() as u64,
            content_hash,
            expiry: options.expiry,
            max_downloads: options.max_downloads,
            access_key: options.access_key,
        };

        debug!(file = name, size = metadata.size, "storing file");
        self.storage.put_data(name, data).await?;
        self.db.upsert_file(&metadata).await?;

        info!(file = name, hash = %metadata.content_hash, "file stored successfully");
        Ok(metadata)
    }

    async fn read(&self, metadata: &Metadata, selection: RangeSelection) -> Result<Transfer> {
        let name = &metadata.name;
        let transfer = match selection {
            RangeSelection::Full => Transfer::full(metadata.size, self.open(name, None).await?),
            RangeSelection::Partial(range) => {
                let span = range.start as usize..(range.end as usize + 1);
                Transfer::partial(range, metadata.size, self.open(name, Some(span)).await?)
            }
            RangeSelection::Unsatisfiable => Transfer::unsatisfiable(metadata.size),
        };
        Ok(transfer)
    }

    async fn open(&self, name: &str, span: Option<Range<usize>>) -> Result<ByteStream> {
        let Some(stream) = self.storage.get_stream(name, span).await? else {
            // row without bytes, e.g. a half finished delete
            warn!(file = name, "metadata present but object missing");
            return Err(StoreError::NotFound(name.to_string()));
        };
        Ok(stream
            .map_err(|e| BackendError::from(StoreError::from(e)))
            .boxed())
    }
}

#[async_trait]
impl StorageBackend for FileStore {
    async fn head(&self, name: &str) -> std::result::Result<Metadata, BackendError> {
        self.db
            .get_file(name)
            .await?
            .ok_or(BackendError::NotFound)
    }

    async fn delete(&self, name: &str) -> std::result::Result<(), BackendError> {
        // drop the row first so the file is logically gone even if the
        //  object delete fails
        let existed = self.db.delete_file(name).await?;
        self.storage.delete_data(name).await?;
        if existed {
            info!(file = name, "file deleted");
        }
        Ok(())
    }

    async fn put_metadata(
        &self,
        name: &str,
        metadata: &Metadata,
    ) -> std::result::Result<(), BackendError> {
        if self.db.update_file(name, metadata).await? {
            Ok(())
        } else {
            Err(BackendError::NotFound)
        }
    }

    async fn serve(
        &self,
        name: &str,
        request: &ServeRequest,
    ) -> std::result::Result<Transfer, BackendError> {
        let metadata = self.head(name).await?;
        let etag = common::policy::conditional::etag(&metadata);
        let selection = request.select(metadata.size, &etag);
        Ok(self.read(&metadata, selection).await?)
    }

    async fn ping(&self) -> std::result::Result<(), BackendError> {
        Ok(self.db.ping().await?)
    }
}
