//! Storage backend contract.
//!
//! The policy layer never touches bytes or persistence directly. Everything
//!  it needs from storage goes through [`StorageBackend`]: fetching a
//!  file's [`Metadata`], persisting an updated record, deleting a file and
//!  streaming its content.

mod memory;
pub mod range;

use std::sync::Arc;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};
use http::header::{
    HeaderName, HeaderValue, ACCEPT_RANGES, CONTENT_LENGTH, CONTENT_RANGE, IF_RANGE, RANGE,
};
use http::{HeaderMap, StatusCode};

use crate::metadata::Metadata;

pub use memory::MemoryBackend;
pub use range::{ByteRange, RangeSelection};

pub type DynBackend = Arc<dyn StorageBackend>;

/// File content as it comes off the backend, chunk by chunk.
pub type ByteStream = BoxStream<'static, Result<Bytes, BackendError>>;

#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// No file is stored under this name
    #[error("file not found")]
    NotFound,
    /// The stored metadata record could not be decoded
    #[error("corrupt metadata: {0}")]
    Corrupt(String),
    /// Any I/O or driver failure underneath the backend
    #[error("storage failure: {0}")]
    Storage(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl BackendError {
    pub fn storage<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        BackendError::Storage(Box::new(err))
    }
}

#[async_trait]
pub trait StorageBackend: Send + Sync + std::fmt::Debug + 'static {
    /// Fetch the current metadata record for `name`.
    async fn head(&self, name: &str) -> Result<Metadata, BackendError>;

    /// Remove the file and its metadata. Deleting a missing file is not
    ///  an error.
    async fn delete(&self, name: &str) -> Result<(), BackendError>;

    /// Overwrite the metadata record of an existing file.
    ///
    /// Fails with [`BackendError::NotFound`] if the file was removed in
    ///  the meantime; this must never recreate a deleted record.
    async fn put_metadata(&self, name: &str, metadata: &Metadata) -> Result<(), BackendError>;

    /// Read the bytes requested by `request`, honouring a single byte range.
    async fn serve(&self, name: &str, request: &ServeRequest) -> Result<Transfer, BackendError>;

    /// Round-trip to the metadata store, used by the readiness endpoint.
    async fn ping(&self) -> Result<(), BackendError> {
        Ok(())
    }
}

/// The parts of an incoming request the backend needs to serve bytes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServeRequest {
    pub range: Option<String>,
    pub if_range: Option<String>,
}

impl ServeRequest {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let get = |name: HeaderName| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };
        Self {
            range: get(RANGE),
            if_range: get(IF_RANGE),
        }
    }

    /// Decide which bytes of a `size`-byte file to send.
    ///
    /// `If-Range` only allows a partial response when it carries the
    ///  file's exact strong validator. We don't track modification
    ///  times, so the date form never matches.
    pub fn select(&self, size: u64, etag: &str) -> RangeSelection {
        if let Some(if_range) = &self.if_range {
            if if_range.trim() != etag {
                return RangeSelection::Full;
            }
        }
        range::select(self.range.as_deref(), size)
    }
}

/// A read from the backend, ready to be written out. Headers are final;
///  the body is pulled lazily as the response is sent.
pub struct Transfer {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: ByteStream,
}

impl std::fmt::Debug for Transfer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transfer")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .finish_non_exhaustive()
    }
}

impl Transfer {
    /// The whole `size`-byte file.
    pub fn full(size: u64, body: ByteStream) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT_RANGES, HeaderValue::from_static("bytes"));
        headers.insert(CONTENT_LENGTH, HeaderValue::from(size));
        Self {
            status: StatusCode::OK,
            headers,
            body,
        }
    }

    pub fn partial(range: ByteRange, total: u64, body: ByteStream) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT_RANGES, HeaderValue::from_static("bytes"));
        headers.insert(CONTENT_LENGTH, HeaderValue::from(range.len()));
        let content_range = format!("bytes {}-{}/{}", range.start, range.end, total);
        if let Ok(value) = HeaderValue::from_str(&content_range) {
            headers.insert(CONTENT_RANGE, value);
        }
        Self {
            status: StatusCode::PARTIAL_CONTENT,
            headers,
            body,
        }
    }

    pub fn unsatisfiable(total: u64) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT_RANGES, HeaderValue::from_static("bytes"));
        headers.insert(CONTENT_LENGTH, HeaderValue::from(0u64));
        if let Ok(value) = HeaderValue::from_str(&format!("bytes */{}", total)) {
            headers.insert(CONTENT_RANGE, value);
        }
        Self {
            status: StatusCode::RANGE_NOT_SATISFIABLE,
            headers,
            body: stream::empty().boxed(),
        }
    }

    /// Drain the body into one buffer. Only sensible for small files.
    pub async fn into_bytes(self) -> Result<Bytes, BackendError> {
        self.body
            .try_fold(BytesMut::new(), |mut buf, chunk| async move {
                buf.extend_from_slice(&chunk);
                Ok(buf)
            })
            .await
            .map(BytesMut::freeze)
    }

    /// Whether the transfer actually delivered content. Only these count
    ///  against a download quota.
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}
