use super::{NameLocks, PolicyError};
use crate::backend::DynBackend;

/// What accounting did to a file after a successful view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuotaOutcome {
    /// The file has no download limit
    Unlimited,
    /// The client was already counted for this content
    RepeatView,
    /// One view consumed; `remaining` views are left
    Decremented { remaining: i64 },
    /// That was the last view; the file is gone
    Purged,
}

impl QuotaOutcome {
    /// Whether this view was charged, meaning the dedup cookie should be
    ///  (re)issued.
    pub fn counted(&self) -> bool {
        matches!(
            self,
            QuotaOutcome::Decremented { .. } | QuotaOutcome::Purged
        )
    }
}

/// Enforces `max_downloads`.
#[derive(Debug, Clone)]
pub struct DownloadQuota {
    backend: DynBackend,
    locks: NameLocks,
}

impl DownloadQuota {
    pub fn new(backend: DynBackend, locks: NameLocks) -> Self {
        Self { backend, locks }
    }

    /// Charge one view of `name`.
    ///
    /// Must only be called after a successful, non-HEAD transfer. The
    ///  metadata is re-read under the name's lock so concurrent views each
    ///  see the previous decrement.
    pub async fn account(
        &self,
        name: &str,
        already_counted: bool,
    ) -> Result<QuotaOutcome, PolicyError> {
        let _guard = self.locks.lock(name).await;

        let mut metadata = self.backend.head(name).await?;

        if metadata.is_unlimited() {
            return Ok(QuotaOutcome::Unlimited);
        }

        if metadata.is_exhausted() {
            tracing::info!(file = name, "purging exhausted file");
            self.backend.delete(name).await?;
            return Err(PolicyError::NotFound);
        }

        if already_counted {
            tracing::debug!(file = name, "repeat view, not counted");
            return Ok(QuotaOutcome::RepeatView);
        }

        metadata.max_downloads -= 1;
        if metadata.max_downloads == 0 {
            tracing::info!(file = name, "download limit reached, purging file");
            self.backend.delete(name).await?;
            return Ok(QuotaOutcome::Purged);
        }

        self.backend.put_metadata(name, &metadata).await?;
        tracing::debug!(
            file = name,
            remaining = metadata.max_downloads,
            "download counted"
        );
        Ok(QuotaOutcome::Decremented {
            remaining: metadata.max_downloads,
        })
    }
}
