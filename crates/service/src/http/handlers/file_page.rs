use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;

use common::metadata::Metadata;

use super::ResponseFormat;

#[derive(askama::Template)]
#[template(path = "pages/file.html")]
struct FilePageTemplate<'a> {
    name: &'a str,
    mimetype: &'a str,
    size: u64,
    href: &'a str,
}

/// A page describing a file with a link to its bytes at `href`, shown
///  instead of the bytes to requests referred from another site.
pub fn file_page(headers: &HeaderMap, metadata: &Metadata, href: &str) -> Response {
    match ResponseFormat::negotiate(headers) {
        ResponseFormat::Json => {
            let body = serde_json::json!({
                "name": metadata.name,
                "mimetype": metadata.mimetype,
                "size": metadata.size,
                "url": href,
            });
            (StatusCode::OK, Json(body)).into_response()
        }
        ResponseFormat::Html => {
            let template = FilePageTemplate {
                name: &metadata.name,
                mimetype: &metadata.mimetype,
                size: metadata.size,
                href,
            };
            (StatusCode::OK, template).into_response()
        }
        ResponseFormat::Text => (
            StatusCode::OK,
            [(axum::http::header::CONTENT_TYPE, "text/plain")],
            format!("{} ({} bytes): {}\n", metadata.name, metadata.size, href),
        )
            .into_response(),
    }
}
