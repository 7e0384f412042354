use std::net::SocketAddr;

use axum::async_trait;
use axum::body::Body;
use axum::extract::{ConnectInfo, FromRequestParts, Path, Query, State};
use axum::http::header::{
    HeaderName, HeaderValue, ACCEPT_RANGES, CONTENT_LENGTH, CONTENT_TYPE, REFERER,
};
use axum::http::request::Parts;
use axum::http::{HeaderMap, Method, StatusCode};
use axum::response::{IntoResponse, Redirect, Response};
use axum_extra::extract::cookie::CookieJar;

use common::backend::{BackendError, ServeRequest};
use common::metadata::Metadata;
use common::policy::access::{ACCESS_KEY_HEADER, ACCESS_KEY_PARAM};
use common::policy::conditional;
use common::policy::{
    AccessGate, AccessKeySource, Credentials, PolicyError, Precondition, LAST_MODIFIED_SENTINEL,
};

use super::{canonical_path, client, cookies, site};
use crate::http::handlers::{file_page, not_found, oops, unauthorized};
use crate::ServiceState;

const CONTENT_SECURITY_POLICY: HeaderName = HeaderName::from_static("content-security-policy");
const REFERRER_POLICY: HeaderName = HeaderName::from_static("referrer-policy");

/// Which of a file's two URLs was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileRoute {
    /// `{site_path}{name}`, also where hotlinks are sent
    Canonical,
    /// `{site_path}selif/{name}`, raw bytes only
    Selif,
}

/// Everything a file request carries that the policy checks look at.
#[derive(Debug)]
pub struct FileRequest {
    pub name: String,
    pub method: Method,
    /// First non-empty `access_key` query parameter
    pub query_key: Option<String>,
    pub peer: Option<SocketAddr>,
    pub jar: CookieJar,
    pub headers: HeaderMap,
}

#[async_trait]
impl<S> FromRequestParts<S> for FileRequest
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(name) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(IntoResponse::into_response)?;

        // repeated or odd parameters must not turn into a bare 400
        let query_key = Query::<Vec<(String, String)>>::try_from_uri(&parts.uri)
            .ok()
            .and_then(|Query(pairs)| {
                pairs
                    .into_iter()
                    .find(|(key, value)| key == ACCESS_KEY_PARAM && !value.is_empty())
                    .map(|(_, value)| value)
            });

        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);

        Ok(Self {
            name,
            method: parts.method.clone(),
            query_key,
            peer,
            jar: CookieJar::from_headers(&parts.headers),
            headers: parts.headers.clone(),
        })
    }
}

/// `GET`/`HEAD {site_path}{name}`.
pub async fn handler(State(state): State<ServiceState>, request: FileRequest) -> Response {
    serve(state, FileRoute::Canonical, request).await
}

/// `GET`/`HEAD {site_path}selif/{name}`.
pub async fn selif_handler(State(state): State<ServiceState>, request: FileRequest) -> Response {
    serve(state, FileRoute::Selif, request).await
}

/// Runs expiry, access key, hotlink and precondition checks in that order,
///  then streams the bytes and charges the view against the file's
///  download quota.
#[tracing::instrument(skip_all, fields(file = %request.name, method = %request.method, ?route))]
async fn serve(state: ServiceState, route: FileRoute, request: FileRequest) -> Response {
    let FileRequest {
        name,
        method,
        query_key,
        peer,
        jar,
        headers,
    } = request;
    let site_path = &state.site().site_path;

    let metadata = match state.expiry().resolve(&name).await {
        Ok(metadata) => metadata,
        Err(e) => return policy_error_response(&headers, site_path, &name, e),
    };

    let credentials = Credentials {
        header: header_string(&headers, ACCESS_KEY_HEADER),
        query: query_key,
        cookie: cookies::access_key(&jar),
    };
    if let Err(e) = AccessGate::authorize(&credentials, &metadata) {
        return policy_error_response(&headers, site_path, &name, e);
    }

    let site_url = site::site_url(state.site(), &headers);
    let referer = headers.get(REFERER).and_then(|v| v.to_str().ok());
    if let Some(location) = state.hotlink().check(referer, &site_url, &name) {
        return match route {
            FileRoute::Selif => Redirect::to(&location).into_response(),
            // browsers keep the Referer across the redirect, so the
            //  redirect target answers with a page, never another 303
            FileRoute::Canonical => {
                let href = format!("{}selif/{}", site_path, name);
                file_page(&headers, &metadata, &href)
            }
        };
    }

    let mut response_headers = file_headers(&state, &metadata);
    let etag = conditional::etag(&metadata);
    match conditional::evaluate(&method, &headers, &etag, LAST_MODIFIED_SENTINEL) {
        Precondition::Proceed => {}
        Precondition::NotModified => {
            strip_entity_headers(&mut response_headers);
            return (StatusCode::NOT_MODIFIED, response_headers).into_response();
        }
        Precondition::Failed => {
            strip_entity_headers(&mut response_headers);
            return (StatusCode::PRECONDITION_FAILED, response_headers).into_response();
        }
    }

    if method == Method::HEAD {
        response_headers.insert(ACCEPT_RANGES, HeaderValue::from_static("bytes"));
        return (StatusCode::OK, response_headers).into_response();
    }

    let transfer = match state
        .backend()
        .serve(&name, &ServeRequest::from_headers(&headers))
        .await
    {
        Ok(transfer) => transfer,
        // purged between resolve and transfer
        Err(BackendError::NotFound) => return not_found(&headers),
        Err(e) => {
            tracing::error!(error = %e, "failed to open file");
            return oops(&headers, "Could not read file.");
        }
    };

    // a failed transfer is never charged
    if transfer.is_success() {
        let address = client::client_address(&headers, peer);
        let token = state.dedup().derive(&metadata.content_hash, &address);
        let already_counted = cookies::dedup_matches(&jar, &token);

        match state.quota().account(&name, already_counted).await {
            Ok(outcome) => {
                tracing::debug!(?outcome, "view accounted");
                if outcome.counted() {
                    cookies::refresh_dedup(&mut response_headers, &token);
                }
            }
            // the bytes are already on their way out
            Err(PolicyError::NotFound) => {
                tracing::debug!("file purged during accounting");
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to account download");
            }
        }
    }

    response_headers.extend(transfer.headers);
    (
        transfer.status,
        response_headers,
        Body::from_stream(transfer.body),
    )
        .into_response()
}

/// Map a policy rejection to its page. A failed cookie-sourced access key
///  is also cleared so the browser stops presenting it.
pub(super) fn policy_error_response(
    headers: &HeaderMap,
    site_path: &str,
    name: &str,
    err: PolicyError,
) -> Response {
    match err {
        PolicyError::NotFound => not_found(headers),
        PolicyError::Unauthorized { attempted } => {
            let mut response = unauthorized(headers, &canonical_path(site_path, name));
            if attempted == AccessKeySource::Cookie {
                cookies::clear_access_key(response.headers_mut(), site_path, name);
            }
            response
        }
        PolicyError::CorruptMetadata(reason) => {
            tracing::error!(file = name, %reason, "corrupt metadata");
            oops(headers, "Corrupt metadata.")
        }
        PolicyError::Backend(e) => {
            tracing::error!(file = name, error = %e, "storage backend failure");
            oops(headers, "Could not read file.")
        }
    }
}

/// Validators plus the configured security headers.
fn file_headers(state: &ServiceState, metadata: &Metadata) -> HeaderMap {
    let mut headers = conditional::validator_headers(metadata);
    let site = state.site();
    if let Ok(csp) = HeaderValue::from_str(&site.file_content_security_policy) {
        headers.insert(CONTENT_SECURITY_POLICY, csp);
    }
    if let Ok(policy) = HeaderValue::from_str(&site.file_referrer_policy) {
        headers.insert(REFERRER_POLICY, policy);
    }
    headers
}

fn strip_entity_headers(headers: &mut HeaderMap) {
    headers.remove(CONTENT_TYPE);
    headers.remove(CONTENT_LENGTH);
}

fn header_string(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}
