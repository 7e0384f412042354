use url::Url;

/// Denies inline embedding of files on third-party pages.
///
/// A request whose `Referer` points at another origin is answered with a
///  `303 See Other` to the file's canonical page instead of the bytes.
///  Direct navigation (no `Referer`) and same-site requests pass through.
#[derive(Debug, Clone)]
pub struct HotlinkGuard {
    allow_hotlink: bool,
    site_path: String,
}

impl HotlinkGuard {
    pub fn new(allow_hotlink: bool, site_path: impl Into<String>) -> Self {
        Self {
            allow_hotlink,
            site_path: site_path.into(),
        }
    }

    /// Returns the redirect location when the request must not be served.
    pub fn check(&self, referer: Option<&str>, site_url: &Url, name: &str) -> Option<String> {
        if self.allow_hotlink {
            return None;
        }

        let referer = referer.map(str::trim).filter(|r| !r.is_empty())?;
        if same_origin(referer, site_url) {
            return None;
        }

        tracing::debug!(file = name, referer, "redirecting hotlinked request");
        Some(format!("{}{}", self.site_path, name))
    }
}

/// Scheme, host and port must all match. An unparseable Referer is never
///  considered same-origin.
fn same_origin(referer: &str, site_url: &Url) -> bool {
    match Url::parse(referer) {
        Ok(referer) => referer.origin() == site_url.origin(),
        Err(_) => false,
    }
}
