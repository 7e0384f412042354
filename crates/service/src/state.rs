use std::sync::Arc;

use axum::extract::FromRef;
use common::prelude::*;
use linx_object_store::{FileStore, StoreError};

use super::config::{normalize_site_path, Config, SiteConfig};

/// Main service state - everything a request handler needs
#[derive(Clone, Debug)]
pub struct State {
    site: Arc<SiteConfig>,
    backend: DynBackend,
    dedup: DedupKey,
    expiry: ExpiryPolicy,
    quota: DownloadQuota,
    hotlink: HotlinkGuard,
}

impl State {
    pub async fn from_config(config: &Config) -> Result<Self, StateSetupError> {
        // 1. Setup file store
        let store = match config.sqlite_path {
            Some(ref path) => {
                tracing::info!(database = %path.display(), "opening file store");
                FileStore::new(path, config.object_store.clone()).await?
            }
            // otherwise just set up an in-memory database
            None => {
                tracing::warn!("no database configured, file metadata will not survive a restart");
                FileStore::in_memory(config.object_store.clone()).await?
            }
        };

        // 2. Setup dedup secret
        let secret = config.dedup_secret.clone().unwrap_or_else(|| {
            tracing::info!("no dedup secret configured, generating one");
            Secret::generate()
        });

        // 3. Normalize site config
        let mut site = config.site.clone();
        site.site_path = normalize_site_path(&site.site_path);
        tracing::info!(
            site_path = %site.site_path,
            site_url = ?site.site_url.as_ref().map(|u| u.as_str()),
            allow_hotlink = site.allow_hotlink,
            "site configured"
        );

        Ok(Self::new(site, Arc::new(store), secret))
    }

    pub fn new(site: SiteConfig, backend: DynBackend, secret: Secret) -> Self {
        let locks = NameLocks::new();
        Self {
            expiry: ExpiryPolicy::new(backend.clone()),
            quota: DownloadQuota::new(backend.clone(), locks),
            hotlink: HotlinkGuard::new(site.allow_hotlink, site.site_path.clone()),
            dedup: DedupKey::new(secret),
            site: Arc::new(site),
            backend,
        }
    }

    pub fn site(&self) -> &SiteConfig {
        &self.site
    }

    pub fn backend(&self) -> &DynBackend {
        &self.backend
    }

    pub fn dedup(&self) -> &DedupKey {
        &self.dedup
    }

    pub fn expiry(&self) -> &ExpiryPolicy {
        &self.expiry
    }

    pub fn quota(&self) -> &DownloadQuota {
        &self.quota
    }

    pub fn hotlink(&self) -> &HotlinkGuard {
        &self.hotlink
    }
}

impl FromRef<State> for DynBackend {
    fn from_ref(state: &State) -> Self {
        state.backend.clone()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StateSetupError {
    #[error("file store setup error: {0}")]
    FileStore(#[from] StoreError),
}
