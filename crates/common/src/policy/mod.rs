//! Access policy for stored files.
//!
//! Each request runs through these in order:
//!
//! 1. [`ExpiryPolicy`] fetches the metadata and purges expired files
//! 2. [`AccessGate`] checks the optional access key
//! 3. [`HotlinkGuard`] redirects cross-origin embeds
//! 4. [`conditional`] sets validators and may answer 304/412 early
//! 5. the backend transfers the bytes
//! 6. [`DownloadQuota`] decrements or purges, unless the client's dedup
//!    cookie shows it was already counted

pub mod access;
pub mod conditional;
pub mod expiry;
pub mod hotlink;
mod locks;
pub mod quota;

pub use access::{AccessGate, AccessKeySource, Credentials};
pub use conditional::{Precondition, LAST_MODIFIED_SENTINEL};
pub use expiry::ExpiryPolicy;
pub use hotlink::HotlinkGuard;
pub use locks::{NameGuard, NameLocks};
pub use quota::{DownloadQuota, QuotaOutcome};

use crate::backend::BackendError;

/// Every way a policy check can end a request early.
#[derive(Debug, thiserror::Error)]
pub enum PolicyError {
    /// Absent, expired or exhausted
    #[error("file not found")]
    NotFound,
    /// Missing or wrong access key; `attempted` names the channel checked
    #[error("unauthorized (attempted {attempted:?})")]
    Unauthorized { attempted: AccessKeySource },
    #[error("corrupt metadata: {0}")]
    CorruptMetadata(String),
    #[error("backend failure: {0}")]
    Backend(#[source] BackendError),
}

impl From<BackendError> for PolicyError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::NotFound => PolicyError::NotFound,
            BackendError::Corrupt(msg) => PolicyError::CorruptMetadata(msg),
            err @ BackendError::Storage(_) => PolicyError::Backend(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_error_mapping() {
        assert!(matches!(
            PolicyError::from(BackendError::NotFound),
            PolicyError::NotFound
        ));
        assert!(matches!(
            PolicyError::from(BackendError::Corrupt("bad".into())),
            PolicyError::CorruptMetadata(msg) if msg == "bad"
        ));
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk");
        assert!(matches!(
            PolicyError::from(BackendError::storage(io)),
            PolicyError::Backend(_)
        ));
    }
}
