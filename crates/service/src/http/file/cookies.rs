//! The two cookies a file response can carry.
//!
//! - `filehash`: the dedup token, proof this client was already counted
//! - `access_key`: a remembered access key, scoped to one file's paths
//!
//! Cookies are read through axum-extra's [`CookieJar`] but written as raw
//!  `Set-Cookie` headers, since the access key cookie goes out twice under
//!  the same name with different paths.

use axum::http::{header::SET_COOKIE, HeaderMap, HeaderValue};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use common::crypto::DedupToken;
use common::policy::access::ACCESS_KEY_PARAM;
use time::{Duration, OffsetDateTime};

pub const DEDUP_COOKIE: &str = "filehash";
pub const DEDUP_COOKIE_LIFETIME: Duration = Duration::minutes(30);
pub const ACCESS_KEY_COOKIE_LIFETIME: Duration = Duration::hours(1);

/// Whether the client's `filehash` cookie carries `token`.
pub fn dedup_matches(jar: &CookieJar, token: &DedupToken) -> bool {
    jar.get(DEDUP_COOKIE)
        .is_some_and(|cookie| token.matches(cookie.value()))
}

/// Issue (or re-issue) the `filehash` cookie for another 30 minutes.
pub fn refresh_dedup(headers: &mut HeaderMap, token: &DedupToken) {
    let cookie = Cookie::build((DEDUP_COOKIE, token.to_string()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(DEDUP_COOKIE_LIFETIME)
        .expires(OffsetDateTime::now_utc() + DEDUP_COOKIE_LIFETIME)
        .build();
    append(headers, cookie);
}

/// The remembered access key, if any.
pub fn access_key(jar: &CookieJar) -> Option<String> {
    jar.get(ACCESS_KEY_PARAM)
        .map(|cookie| cookie.value().to_string())
}

/// Remember `key` for both of the file's paths.
pub fn set_access_key(headers: &mut HeaderMap, site_path: &str, name: &str, key: &str) {
    let expires = OffsetDateTime::now_utc() + ACCESS_KEY_COOKIE_LIFETIME;
    for path in access_key_paths(site_path, name) {
        let cookie = Cookie::build((ACCESS_KEY_PARAM, key.to_string()))
            .path(path)
            .http_only(true)
            .same_site(SameSite::Strict)
            .max_age(ACCESS_KEY_COOKIE_LIFETIME)
            .expires(expires)
            .build();
        append(headers, cookie);
    }
}

/// Overwrite a stale access key cookie with an already expired empty one.
pub fn clear_access_key(headers: &mut HeaderMap, site_path: &str, name: &str) {
    for path in access_key_paths(site_path, name) {
        let cookie = Cookie::build((ACCESS_KEY_PARAM, ""))
            .path(path)
            .http_only(true)
            .max_age(Duration::ZERO)
            .expires(OffsetDateTime::UNIX_EPOCH)
            .build();
        append(headers, cookie);
    }
}

fn access_key_paths(site_path: &str, name: &str) -> [String; 2] {
    [
        format!("{}{}", site_path, name),
        format!("{}selif/{}", site_path, name),
    ]
}

fn append(headers: &mut HeaderMap, cookie: Cookie<'static>) {
    match HeaderValue::from_str(&cookie.encoded().to_string()) {
        Ok(value) => {
            headers.append(SET_COOKIE, value);
        }
        Err(e) => tracing::warn!(cookie = cookie.name(), error = %e, "dropping unencodable cookie"),
    }
}
