use std::{
    net::{IpAddr, Ipv4Addr, SocketAddr},
    path::PathBuf,
};

use common::prelude::Secret;
use linx_object_store::ObjectStoreConfig;
use url::Url;

/// Served on every file response unless overridden.
pub const DEFAULT_FILE_CSP: &str = "default-src 'none'; img-src 'self'; object-src 'self'; \
     media-src 'self'; style-src 'self' 'unsafe-inline'; frame-ancestors 'self';";
pub const DEFAULT_FILE_REFERRER_POLICY: &str = "same-origin";
pub const DEFAULT_LISTEN_ADDR: SocketAddr =
    SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 8080);

#[derive(Debug)]
pub struct Config {
    // http server configuration
    /// address for the HTTP server to listen on.
    ///  if not set then 0.0.0.0:8080 will be used
    pub listen_addr: Option<SocketAddr>,

    pub site: SiteConfig,

    /// key for the dedup cookie MAC. if not set then a new
    ///  secret will be generated, and every client is counted
    ///  again after a restart
    pub dedup_secret: Option<Secret>,

    // data store configuration
    /// a path to a sqlite database, if not set then an
    ///  in-memory database will be used
    pub sqlite_path: Option<PathBuf>,
    /// where file bytes live
    pub object_store: ObjectStoreConfig,

    // misc
    pub log_level: tracing::Level,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: Some(DEFAULT_LISTEN_ADDR),
            site: SiteConfig::default(),
            dedup_secret: None,
            sqlite_path: None,
            object_store: ObjectStoreConfig::Memory,
            log_level: tracing::Level::INFO,
        }
    }
}

/// How the site presents itself to clients. Read-only once the
///  service is running.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteConfig {
    /// path prefix every route lives under, always starting and
    ///  ending with '/'
    pub site_path: String,
    /// canonical origin of the site. if not set then it is derived
    ///  from the Host and X-Forwarded-Proto headers of each request
    pub site_url: Option<Url>,
    /// serve files regardless of Referer
    pub allow_hotlink: bool,
    pub file_content_security_policy: String,
    pub file_referrer_policy: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            site_path: "/".to_string(),
            site_url: None,
            allow_hotlink: false,
            file_content_security_policy: DEFAULT_FILE_CSP.to_string(),
            file_referrer_policy: DEFAULT_FILE_REFERRER_POLICY.to_string(),
        }
    }
}

/// Force a leading and trailing '/' onto a configured site path.
pub fn normalize_site_path(path: &str) -> String {
    let trimmed = path.trim().trim_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        format!("/{}/", trimmed)
    }
}
