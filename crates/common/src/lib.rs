/**
 * Storage backend contract, plus an in-memory
 *  implementation and byte range selection.
 */
pub mod backend;
/**
 * Server secret and the keyed dedup token
 *  used to avoid counting a client twice.
 */
pub mod crypto;
/**
 * The per-file metadata record.
 */
pub mod metadata;
/**
 * Expiry, access keys, hotlink protection,
 *  conditional requests and download quotas.
 */
pub mod policy;
/**
 * Helper for setting build version information
 *  at compile time.
 */
pub mod version;

pub mod prelude {
    pub use crate::backend::{
        BackendError, ByteStream, DynBackend, MemoryBackend, ServeRequest, StorageBackend,
        Transfer,
    };
    pub use crate::crypto::{DedupKey, DedupToken, Secret};
    pub use crate::metadata::{Expiry, Metadata};
    pub use crate::policy::{
        AccessGate, AccessKeySource, Credentials, DownloadQuota, ExpiryPolicy, HotlinkGuard,
        NameLocks, PolicyError, Precondition, QuotaOutcome,
    };
    pub use crate::version::build_info;
}
