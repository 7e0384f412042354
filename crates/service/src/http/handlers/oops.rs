use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;

use super::{ErrorTemplate, ResponseFormat};

/// 500 with a short, client-safe message.
pub fn oops(headers: &HeaderMap, message: &str) -> Response {
    match ResponseFormat::negotiate(headers) {
        ResponseFormat::Json => {
            let err_msg = serde_json::json!({"msg": message});
            (StatusCode::INTERNAL_SERVER_ERROR, Json(err_msg)).into_response()
        }
        ResponseFormat::Html => {
            let template = ErrorTemplate {
                title: "Oops",
                message,
            };
            (StatusCode::INTERNAL_SERVER_ERROR, template).into_response()
        }
        ResponseFormat::Text => (
            StatusCode::INTERNAL_SERVER_ERROR,
            [(axum::http::header::CONTENT_TYPE, "text/plain")],
            message.to_string(),
        )
            .into_response(),
    }
}
