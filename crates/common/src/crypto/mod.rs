//! Cryptographic primitives for the access policy
//!
//! - **Server secret**: a random 256-bit key generated at startup (or
//!   supplied by the operator so tokens survive restarts)
//! - **Dedup tokens**: HMAC-SHA256 over (content hash, client address),
//!   used to avoid counting the same viewer twice against a download quota

mod dedup;
mod secret;

pub use dedup::{DedupKey, DedupToken};
pub use secret::{Secret, SecretError, SECRET_SIZE};
