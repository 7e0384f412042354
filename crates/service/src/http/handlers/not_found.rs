use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;

use super::{ErrorTemplate, ResponseFormat};

const MESSAGE: &str = "not found";

pub async fn not_found_handler(headers: HeaderMap) -> Response {
    not_found(&headers)
}

/// 404 for a missing, expired or exhausted file, or an unknown route.
pub fn not_found(headers: &HeaderMap) -> Response {
    match ResponseFormat::negotiate(headers) {
        ResponseFormat::Json => {
            let err_msg = serde_json::json!({"msg": MESSAGE});
            (StatusCode::NOT_FOUND, Json(err_msg)).into_response()
        }
        ResponseFormat::Html => {
            let template = ErrorTemplate {
                title: "404",
                message: "Sorry, that file doesn't exist, or it has expired.",
            };
            (StatusCode::NOT_FOUND, template).into_response()
        }
        ResponseFormat::Text => (
            StatusCode::NOT_FOUND,
            [(axum::http::header::CONTENT_TYPE, "text/plain")],
            MESSAGE,
        )
            .into_response(),
    }
}
