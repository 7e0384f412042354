use chrono::{DateTime, Utc};

use super::PolicyError;
use crate::backend::DynBackend;
use crate::metadata::Metadata;

/// Lazy expiry: files are purged the first time someone asks for them
///  after their expiry has passed. There is no background sweep.
#[derive(Debug, Clone)]
pub struct ExpiryPolicy {
    backend: DynBackend,
}

impl ExpiryPolicy {
    pub fn new(backend: DynBackend) -> Self {
        Self { backend }
    }

    /// Fetch metadata for `name`, purging it if it is no longer servable.
    pub async fn resolve(&self, name: &str) -> Result<Metadata, PolicyError> {
        self.resolve_at(name, Utc::now()).await
    }

    pub async fn resolve_at(
        &self,
        name: &str,
        now: DateTime<Utc>,
    ) -> Result<Metadata, PolicyError> {
        let metadata = self.backend.head(name).await?;

        // an exhausted quota is as dead as a past expiry
        if metadata.expiry.is_expired_at(now) || metadata.is_exhausted() {
            tracing::info!(
                file = name,
                expiry = ?metadata.expiry,
                max_downloads = metadata.max_downloads,
                "purging file on access"
            );
            if let Err(e) = self.backend.delete(name).await {
                // the file is logically gone either way
                tracing::warn!(file = name, error = %e, "failed to purge expired file");
            }
            return Err(PolicyError::NotFound);
        }

        Ok(metadata)
    }
}
