//! Dedup tokens: "this client already counted as a viewer of this content".
//!
//! A token is `HMAC-SHA256(secret, content_hash || 0x00 || client_address)`,
//!  hex encoded. It is stable for a given (content, client) pair, differs
//!  as soon as either changes, and cannot be produced without the server
//!  secret. Nothing is stored server side; the token lives in a short
//!  lived cookie.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use super::secret::Secret;

type HmacSha256 = Hmac<Sha256>;

/// Keyed token derivation for the dedup cookie.
#[derive(Debug, Clone)]
pub struct DedupKey {
    secret: Secret,
}

/// An opaque, hex encoded dedup token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DedupToken(String);

impl DedupKey {
    pub fn new(secret: Secret) -> Self {
        Self { secret }
    }

    pub fn derive(&self, content_hash: &str, client_address: &str) -> DedupToken {
        let mut mac = HmacSha256::new_from_slice(self.secret.bytes())
            .expect("HMAC accepts any key length");
        mac.update(content_hash.as_bytes());
        // separator keeps ("ab", "c") and ("a", "bc") apart
        mac.update(&[0u8]);
        mac.update(client_address.as_bytes());
        DedupToken(hex::encode(mac.finalize().into_bytes()))
    }
}

impl DedupToken {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Constant-time comparison against a client presented value.
    pub fn matches(&self, presented: &str) -> bool {
        self.0.as_bytes().ct_eq(presented.as_bytes()).into()
    }
}

impl std::fmt::Display for DedupToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
