use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;

use super::ResponseFormat;

const MESSAGE: &str = "unauthorized";

#[derive(askama::Template)]
#[template(path = "pages/unauthorized.html")]
struct UnauthorizedTemplate<'a> {
    /// where the unlock form posts to
    action: &'a str,
}

/// 401 for a protected file. Says nothing about the file itself.
pub fn unauthorized(headers: &HeaderMap, action: &str) -> Response {
    match ResponseFormat::negotiate(headers) {
        ResponseFormat::Json => {
            let err_msg = serde_json::json!({"msg": MESSAGE});
            (StatusCode::UNAUTHORIZED, Json(err_msg)).into_response()
        }
        ResponseFormat::Html => {
            (StatusCode::UNAUTHORIZED, UnauthorizedTemplate { action }).into_response()
        }
        ResponseFormat::Text => (
            StatusCode::UNAUTHORIZED,
            [(axum::http::header::CONTENT_TYPE, "text/plain")],
            MESSAGE,
        )
            .into_response(),
    }
}
