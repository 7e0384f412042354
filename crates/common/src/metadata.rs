use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// When a stored file stops being served.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "type", content = "at", rename_all = "snake_case")]
pub enum Expiry {
    #[default]
    Never,
    At(DateTime<Utc>),
}

impl Expiry {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        match self {
            Expiry::Never => false,
            Expiry::At(at) => *at <= now,
        }
    }

    /// Unix seconds, with `0` standing in for `Never`.
    pub fn to_unix(&self) -> i64 {
        match self {
            Expiry::Never => 0,
            Expiry::At(at) => at.timestamp(),
        }
    }

    /// Inverse of [`Expiry::to_unix`]. Returns `None` for timestamps
    ///  chrono cannot represent.
    pub fn from_unix(secs: i64) -> Option<Self> {
        if secs == 0 {
            return Some(Expiry::Never);
        }
        DateTime::from_timestamp(secs, 0).map(Expiry::At)
    }
}

/// Descriptive record for one stored file.
///
/// The storage backend owns these; everything above it works on
///  request-scoped copies and writes changes back through
///  [`StorageBackend::put_metadata`](crate::backend::StorageBackend::put_metadata).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    pub name: String,
    pub mimetype: String,
    pub size: u64,
    /// Hex SHA-256 of the stored bytes. Used as the ETag and as the
    ///  dedup cookie key.
    pub content_hash: String,
    pub expiry: Expiry,
    /// Negative means unlimited, zero means exhausted, positive is
    ///  the number of counted views left.
    pub max_downloads: i64,
    pub access_key: Option<String>,
}

impl Metadata {
    pub fn is_unlimited(&self) -> bool {
        self.max_downloads < 0
    }

    pub fn is_exhausted(&self) -> bool {
        self.max_downloads == 0
    }

    /// The access key, treating an empty string the same as no key.
    pub fn required_access_key(&self) -> Option<&str> {
        self.access_key.as_deref().filter(|key| !key.is_empty())
    }
}
