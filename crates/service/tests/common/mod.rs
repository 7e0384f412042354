//! Shared setup for the HTTP integration tests
#![allow(dead_code)]

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, HeaderMap, Request, StatusCode};
use axum::Router;
use tower::ServiceExt;

use ::common::prelude::*;
use service::{ServiceState, SiteConfig};

pub const CONTENT_HASH: &str = "9f86d081884c7d659a2feaa0c55ad015a3bf4f1b2b0b822cd15d6c15b0f00a08";

pub struct TestServer {
    pub backend: MemoryBackend,
    pub router: Router,
}

pub fn setup() -> TestServer {
    setup_with(SiteConfig::default())
}

pub fn setup_with(site: SiteConfig) -> TestServer {
    let backend = MemoryBackend::new();
    let state = ServiceState::new(site, Arc::new(backend.clone()), Secret::from([7u8; 32]));
    TestServer {
        router: service::http::router(state),
        backend,
    }
}

pub fn file(name: &str, size: u64) -> Metadata {
    Metadata {
        name: name.to_string(),
        mimetype: "text/plain".to_string(),
        size,
        content_hash: CONTENT_HASH.to_string(),
        expiry: Expiry::Never,
        max_downloads: -1,
        access_key: None,
    }
}

pub struct Reply {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl Reply {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn set_cookies(&self) -> Vec<String> {
        self.headers
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .map(str::to_string)
            .collect()
    }

    /// The `name=value` pair of the first Set-Cookie called `name`.
    pub fn cookie(&self, name: &str) -> Option<String> {
        self.set_cookies()
            .into_iter()
            .find(|c| c.starts_with(&format!("{}=", name)))
            .and_then(|c| c.split(';').next().map(str::to_string))
    }
}

impl TestServer {
    pub fn insert(&self, metadata: Metadata, data: &'static str) {
        self.backend.insert(metadata, data);
    }

    pub async fn send(&self, request: Request<Body>) -> Reply {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");
        let status = response.status();
        let headers = response.headers().clone();
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body fits in memory")
            .to_vec();
        Reply {
            status,
            headers,
            body,
        }
    }

    pub async fn get(&self, uri: &str, headers: &[(&str, &str)]) -> Reply {
        let mut builder = Request::builder().method("GET").uri(uri);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        self.send(builder.body(Body::empty()).unwrap()).await
    }
}
