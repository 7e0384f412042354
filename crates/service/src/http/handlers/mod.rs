//! Error and file pages, rendered as JSON, HTML or plain text depending on `Accept`.

use axum::http::HeaderMap;

mod file_page;
mod not_found;
mod oops;
mod unauthorized;

pub use file_page::file_page;
pub use not_found::{not_found, not_found_handler};
pub use oops::oops;
pub use unauthorized::unauthorized;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ResponseFormat {
    Json,
    Html,
    Text,
}

impl ResponseFormat {
    fn negotiate(headers: &HeaderMap) -> Self {
        let accept = headers
            .get(axum::http::header::ACCEPT)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();

        if accept.contains("application/json") {
            ResponseFormat::Json
        } else if accept.contains("text/html") {
            ResponseFormat::Html
        } else {
            ResponseFormat::Text
        }
    }
}

#[derive(askama::Template)]
#[template(path = "pages/error.html")]
struct ErrorTemplate<'a> {
    title: &'a str,
    message: &'a str,
}
