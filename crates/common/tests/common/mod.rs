//! Shared test utilities for policy integration tests
#![allow(dead_code)]

use std::sync::Arc;

use ::common::prelude::*;

/// Everything a request needs, minus HTTP.
pub struct Harness {
    pub backend: MemoryBackend,
    pub expiry: ExpiryPolicy,
    pub quota: DownloadQuota,
    pub dedup: DedupKey,
}

/// A client with its own address and `filehash` cookie.
#[derive(Debug, Clone)]
pub struct Client {
    pub address: String,
    pub filehash: Option<String>,
}

impl Client {
    pub fn new(address: &str) -> Self {
        Self {
            address: address.to_string(),
            filehash: None,
        }
    }
}

pub fn setup() -> Harness {
    let backend = MemoryBackend::new();
    let dyn_backend: DynBackend = Arc::new(backend.clone());
    Harness {
        expiry: ExpiryPolicy::new(dyn_backend.clone()),
        quota: DownloadQuota::new(dyn_backend, NameLocks::new()),
        dedup: DedupKey::new(Secret::generate()),
        backend,
    }
}

pub fn file(name: &str, data: &str, max_downloads: i64) -> Metadata {
    Metadata {
        name: name.to_string(),
        mimetype: "text/plain".to_string(),
        size: data.len() as u64,
        content_hash: format!("{:0>64}", data.len()),
        expiry: Expiry::Never,
        max_downloads,
        access_key: None,
    }
}

impl Harness {
    /// Run a full GET: resolve, transfer, then account and refresh the
    ///  client's cookie if the view was charged.
    pub async fn get(&self, client: &mut Client, name: &str) -> Result<QuotaOutcome, PolicyError> {
        let metadata = self.expiry.resolve(name).await?;
        let transfer = self
            .backend
            .serve(name, &ServeRequest::default())
            .await
            .map_err(PolicyError::from)?;
        assert!(transfer.is_success());

        let token = self.dedup.derive(&metadata.content_hash, &client.address);
        let already_counted = client
            .filehash
            .as_deref()
            .is_some_and(|presented| token.matches(presented));

        let outcome = self.quota.account(name, already_counted).await?;
        if outcome.counted() {
            client.filehash = Some(token.to_string());
        }
        Ok(outcome)
    }
}
