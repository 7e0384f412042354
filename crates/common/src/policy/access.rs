use subtle::ConstantTimeEq;

use super::PolicyError;
use crate::metadata::Metadata;

/// Header carrying an access key, for scripted clients.
pub const ACCESS_KEY_HEADER: &str = "Linx-Access-Key";
/// Query parameter and cookie name carrying an access key.
pub const ACCESS_KEY_PARAM: &str = "access_key";

/// Which credential channel the gate ended up checking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessKeySource {
    Header,
    QueryParam,
    Cookie,
    /// No key required, or none presented
    None,
}

/// Access keys presented with a request, one per channel.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub header: Option<String>,
    pub query: Option<String>,
    pub cookie: Option<String>,
}

impl Credentials {
    /// The first non-empty credential, in header > query > cookie order.
    pub fn presented(&self) -> Option<(AccessKeySource, &str)> {
        [
            (AccessKeySource::Header, &self.header),
            (AccessKeySource::QueryParam, &self.query),
            (AccessKeySource::Cookie, &self.cookie),
        ]
        .into_iter()
        .find_map(|(source, value)| {
            value
                .as_deref()
                .filter(|v| !v.is_empty())
                .map(|v| (source, v))
        })
    }
}

/// Gates files that carry an access key.
pub struct AccessGate;

impl AccessGate {
    /// Check `credentials` against the key stored in `metadata`.
    ///
    /// On failure the error names the channel that was tried, so the
    ///  caller can clear a stale cookie.
    pub fn authorize(
        credentials: &Credentials,
        metadata: &Metadata,
    ) -> Result<AccessKeySource, PolicyError> {
        let Some(expected) = metadata.required_access_key() else {
            return Ok(AccessKeySource::None);
        };

        match credentials.presented() {
            Some((source, presented)) if keys_equal(presented, expected) => Ok(source),
            Some((source, _)) => {
                tracing::debug!(file = %metadata.name, ?source, "invalid access key");
                Err(PolicyError::Unauthorized { attempted: source })
            }
            None => Err(PolicyError::Unauthorized {
                attempted: AccessKeySource::None,
            }),
        }
    }

    /// Compare a single submitted key, as posted by the unlock form.
    pub fn check_key(presented: &str, metadata: &Metadata) -> bool {
        match metadata.required_access_key() {
            Some(expected) => keys_equal(presented, expected),
            None => true,
        }
    }
}

fn keys_equal(presented: &str, expected: &str) -> bool {
    presented.as_bytes().ct_eq(expected.as_bytes()).into()
}
