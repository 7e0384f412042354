//! Error types for the file store.

use common::backend::BackendError;

/// Errors that can occur when working with the file store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Database error
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Object storage error
    #[error("object storage error: {0}")]
    ObjectStore(#[from] object_store::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Migration error
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A row exists but can't be turned back into metadata
    #[error("corrupt record for {name}: {reason}")]
    Corrupt { name: String, reason: String },

    /// File not found
    #[error("file not found: {0}")]
    NotFound(String),

    /// Invalid configuration
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// S3 bucket not found - must be created before use
    #[error("S3 bucket '{0}' does not exist. Create it before starting the server.")]
    BucketNotFound(String),
}

impl From<StoreError> for BackendError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(_) => BackendError::NotFound,
            StoreError::Corrupt { name, reason } => {
                BackendError::Corrupt(format!("{name}: {reason}"))
            }
            other => BackendError::storage(other),
        }
    }
}

/// Result type alias for file store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
