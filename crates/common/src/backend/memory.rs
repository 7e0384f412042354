use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{self, StreamExt};
use parking_lot::RwLock;

use super::{BackendError, ByteStream, RangeSelection, ServeRequest, StorageBackend, Transfer};
use crate::metadata::Metadata;

/// In-memory storage backend.
///
/// Keeps every file in a `HashMap` and counts mutating calls, which makes
///  it the backend of choice for tests and throwaway instances.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    inner: Arc<MemoryBackendInner>,
}

#[derive(Debug, Default)]
struct MemoryBackendInner {
    files: RwLock<HashMap<String, StoredFile>>,
    delete_calls: AtomicUsize,
    put_metadata_calls: AtomicUsize,
    serve_calls: AtomicUsize,
    /// When set, every write (`delete`, `put_metadata`) fails
    fail_writes: AtomicBool,
    /// Names whose metadata reads back as undecodable
    corrupt: RwLock<HashSet<String>>,
}

#[derive(Debug, Clone)]
struct StoredFile {
    metadata: Metadata,
    data: Bytes,
}

#[derive(Debug, thiserror::Error)]
#[error("memory backend write failure (injected)")]
struct InjectedFailure;

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `data` under `metadata.name`, replacing any previous file.
    pub fn insert(&self, metadata: Metadata, data: impl Into<Bytes>) {
        let name = metadata.name.clone();
        self.inner.files.write().insert(
            name,
            StoredFile {
                metadata,
                data: data.into(),
            },
        );
    }

    pub fn contains(&self, name: &str) -> bool {
        self.inner.files.read().contains_key(name)
    }

    /// Current metadata, bypassing the backend contract.
    pub fn metadata(&self, name: &str) -> Option<Metadata> {
        self.inner
            .files
            .read()
            .get(name)
            .map(|file| file.metadata.clone())
    }

    pub fn delete_calls(&self) -> usize {
        self.inner.delete_calls.load(Ordering::SeqCst)
    }

    pub fn put_metadata_calls(&self) -> usize {
        self.inner.put_metadata_calls.load(Ordering::SeqCst)
    }

    pub fn serve_calls(&self) -> usize {
        self.inner.serve_calls.load(Ordering::SeqCst)
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.inner.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Make `head` report `name`'s record as corrupt, like a row that no
    ///  longer decodes.
    pub fn mark_corrupt(&self, name: &str) {
        self.inner.corrupt.write().insert(name.to_string());
    }

    fn check_writable(&self) -> Result<(), BackendError> {
        if self.inner.fail_writes.load(Ordering::SeqCst) {
            return Err(BackendError::storage(InjectedFailure));
        }
        Ok(())
    }
}

#[async_trait]
impl StorageBackend for MemoryBackend {
    async fn head(&self, name: &str) -> Result<Metadata, BackendError> {
        if self.inner.corrupt.read().contains(name) {
            return Err(BackendError::Corrupt(format!("{}: unreadable record", name)));
        }
        self.metadata(name).ok_or(BackendError::NotFound)
    }

    async fn delete(&self, name: &str) -> Result<(), BackendError> {
        self.inner.delete_calls.fetch_add(1, Ordering::SeqCst);
        self.check_writable()?;
        self.inner.files.write().remove(name);
        Ok(())
    }

    async fn put_metadata(&self, name: &str, metadata: &Metadata) -> Result<(), BackendError> {
        self.inner.put_metadata_calls.fetch_add(1, Ordering::SeqCst);
        self.check_writable()?;
        let mut files = self.inner.files.write();
        let file = files.get_mut(name).ok_or(BackendError::NotFound)?;
        file.metadata = metadata.clone();
        Ok(())
    }

    async fn serve(&self, name: &str, request: &ServeRequest) -> Result<Transfer, BackendError> {
        self.inner.serve_calls.fetch_add(1, Ordering::SeqCst);
        let file = self
            .inner
            .files
            .read()
            .get(name)
            .cloned()
            .ok_or(BackendError::NotFound)?;

        let size = file.data.len() as u64;
        let etag = format!("\"{}\"", file.metadata.content_hash);
        let transfer = match request.select(size, &etag) {
            RangeSelection::Full => Transfer::full(size, single_chunk(file.data)),
            RangeSelection::Partial(range) => {
                let body = file.data.slice(range.start as usize..=range.end as usize);
                Transfer::partial(range, size, single_chunk(body))
            }
            RangeSelection::Unsatisfiable => Transfer::unsatisfiable(size),
        };
        Ok(transfer)
    }
}

fn single_chunk(data: Bytes) -> ByteStream {
    stream::once(async move { Ok(data) }).boxed()
}
