use axum::http::{header::HOST, HeaderMap};
use url::Url;

use crate::config::SiteConfig;

const X_FORWARDED_PROTO: &str = "x-forwarded-proto";

/// The site's own URL, used as the reference origin for hotlink checks.
///
/// A configured `site_url` wins. Otherwise it is rebuilt from the request's
///  `Host` and `X-Forwarded-Proto`, falling back to localhost.
pub fn site_url(site: &SiteConfig, headers: &HeaderMap) -> Url {
    if let Some(url) = &site.site_url {
        return url.clone();
    }

    let host = headers
        .get(HOST)
        .and_then(|h| h.to_str().ok())
        .filter(|h| !h.is_empty())
        .unwrap_or("localhost");
    let scheme = headers
        .get(X_FORWARDED_PROTO)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| *v == "https" || *v == "http")
        .unwrap_or("http");

    Url::parse(&format!("{}://{}{}", scheme, host, site.site_path)).unwrap_or_else(|e| {
        tracing::debug!(host, error = %e, "unusable Host header, assuming localhost");
        localhost(&site.site_path)
    })
}

fn localhost(site_path: &str) -> Url {
    Url::parse(&format!("http://localhost{}", site_path))
        .unwrap_or_else(|_| Url::parse("http://localhost/").expect("static url is valid"))
}
