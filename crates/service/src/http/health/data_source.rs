use std::fmt::Debug;
use std::ops::Deref;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::async_trait;
use axum::extract::{FromRef, FromRequestParts};
use http::request::Parts;

use common::backend::DynBackend;

/// Something the service needs answering before it takes traffic.
#[async_trait]
pub trait DataSource {
    /// Ping the file store, returning how long it took to answer.
    async fn is_ready(&self) -> Result<Duration, DataSourceError>;
}

#[derive(Debug, thiserror::Error)]
pub enum DataSourceError {
    #[error("file store unavailable: {0}")]
    Unavailable(String),
}

pub type DynDataSource = Arc<dyn DataSource + Send + Sync>;

pub struct StateDataSource(DynDataSource);

impl Debug for StateDataSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateDataSource").finish()
    }
}

impl StateDataSource {
    #[cfg(test)]
    pub fn new(dds: DynDataSource) -> Self {
        Self(dds)
    }
}

impl Deref for StateDataSource {
    type Target = DynDataSource;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

struct FileStoreSource {
    backend: DynBackend,
}

#[async_trait]
impl DataSource for FileStoreSource {
    async fn is_ready(&self) -> Result<Duration, DataSourceError> {
        let started = Instant::now();
        match self.backend.ping().await {
            Ok(()) => Ok(started.elapsed()),
            Err(e) => {
                tracing::warn!(error = %e, "file store ping failed");
                Err(DataSourceError::Unavailable(e.to_string()))
            }
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for StateDataSource
where
    DynBackend: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ();

    async fn from_request_parts(_parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        Ok(StateDataSource(Arc::new(FileStoreSource {
            backend: DynBackend::from_ref(state),
        })))
    }
}
