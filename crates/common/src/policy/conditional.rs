//! Validator headers and conditional-GET evaluation (RFC 9110 §13).
//!
//! Files are content-addressed, so the content hash is a perfect strong
//!  validator. We don't track modification times; the Unix epoch stands
//!  in for "unknown" and date based preconditions are skipped for it.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use http::header::{
    HeaderValue, CACHE_CONTROL, CONTENT_LENGTH, CONTENT_TYPE, ETAG, IF_MATCH,
    IF_MODIFIED_SINCE, IF_NONE_MATCH, IF_UNMODIFIED_SINCE,
};
use http::{HeaderMap, Method};

use crate::metadata::Metadata;

/// Modification time reported for every file.
pub const LAST_MODIFIED_SENTINEL: SystemTime = UNIX_EPOCH;

/// Cacheable, but revalidate before every reuse.
pub const CACHE_CONTROL_VALUE: &str = "public, no-cache";

/// Outcome of evaluating a request's preconditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precondition {
    /// Serve the file
    Proceed,
    /// 304, no body
    NotModified,
    /// 412, no body
    Failed,
}

/// The quoted strong validator for a file.
pub fn etag(metadata: &Metadata) -> String {
    format!("\"{}\"", metadata.content_hash)
}

/// `Content-Type`, `Content-Length`, `ETag` and `Cache-Control` for a file.
pub fn validator_headers(metadata: &Metadata) -> HeaderMap {
    let mut headers = HeaderMap::new();
    let content_type = HeaderValue::from_str(&metadata.mimetype)
        .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream"));
    headers.insert(CONTENT_TYPE, content_type);
    headers.insert(CONTENT_LENGTH, HeaderValue::from(metadata.size));
    if let Ok(etag) = HeaderValue::from_str(&etag(metadata)) {
        headers.insert(ETAG, etag);
    }
    headers.insert(CACHE_CONTROL, HeaderValue::from_static(CACHE_CONTROL_VALUE));
    headers
}

/// Evaluate `If-Match`, `If-Unmodified-Since`, `If-None-Match` and
///  `If-Modified-Since`, in that order.
pub fn evaluate(
    method: &Method,
    headers: &HeaderMap,
    etag: &str,
    last_modified: SystemTime,
) -> Precondition {
    let mut check = check_if_match(headers, etag);
    if check == Check::None {
        check = check_if_unmodified_since(headers, last_modified);
    }
    if check == Check::False {
        return Precondition::Failed;
    }

    let is_read = method == Method::GET || method == Method::HEAD;
    match check_if_none_match(headers, etag) {
        Check::False if is_read => Precondition::NotModified,
        Check::False => Precondition::Failed,
        Check::None if is_read => match check_if_modified_since(headers, last_modified) {
            Check::False => Precondition::NotModified,
            _ => Precondition::Proceed,
        },
        _ => Precondition::Proceed,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Check {
    /// Header absent or not applicable
    None,
    True,
    False,
}

fn header_str<'a>(headers: &'a HeaderMap, name: http::header::HeaderName) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

fn is_weak(tag: &str) -> bool {
    tag.starts_with("W/")
}

fn opaque(tag: &str) -> &str {
    tag.strip_prefix("W/").unwrap_or(tag)
}

fn strong_match(a: &str, b: &str) -> bool {
    !is_weak(a) && !is_weak(b) && a == b
}

fn weak_match(a: &str, b: &str) -> bool {
    opaque(a) == opaque(b)
}

fn check_if_match(headers: &HeaderMap, etag: &str) -> Check {
    let Some(value) = header_str(headers, IF_MATCH) else {
        return Check::None;
    };
    for tag in value.split(',').map(str::trim) {
        if tag == "*" || strong_match(tag, etag) {
            return Check::True;
        }
    }
    Check::False
}

fn check_if_none_match(headers: &HeaderMap, etag: &str) -> Check {
    let Some(value) = header_str(headers, IF_NONE_MATCH) else {
        return Check::None;
    };
    for tag in value.split(',').map(str::trim) {
        if tag == "*" || weak_match(tag, etag) {
            return Check::False;
        }
    }
    Check::True
}

fn is_unknown(time: SystemTime) -> bool {
    time <= UNIX_EPOCH
}

/// HTTP dates carry whole seconds only.
fn truncate_to_secs(time: SystemTime) -> SystemTime {
    match time.duration_since(UNIX_EPOCH) {
        Ok(d) => UNIX_EPOCH + Duration::from_secs(d.as_secs()),
        Err(_) => time,
    }
}

fn parse_date(headers: &HeaderMap, name: http::header::HeaderName) -> Option<SystemTime> {
    header_str(headers, name).and_then(|v| httpdate::parse_http_date(v).ok())
}

fn check_if_unmodified_since(headers: &HeaderMap, last_modified: SystemTime) -> Check {
    if is_unknown(last_modified) {
        return Check::None;
    }
    match parse_date(headers, IF_UNMODIFIED_SINCE) {
        Some(since) if truncate_to_secs(last_modified) <= since => Check::True,
        Some(_) => Check::False,
        None => Check::None,
    }
}

fn check_if_modified_since(headers: &HeaderMap, last_modified: SystemTime) -> Check {
    if is_unknown(last_modified) {
        return Check::None;
    }
    match parse_date(headers, IF_MODIFIED_SINCE) {
        Some(since) if truncate_to_secs(last_modified) <= since => Check::False,
        Some(_) => Check::True,
        None => Check::None,
    }
}
