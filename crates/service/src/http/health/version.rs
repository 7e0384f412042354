use axum::response::{IntoResponse, Response};
use axum::Json;
use http::StatusCode;
use serde::Serialize;

use common::prelude::build_info;

#[derive(Debug, Serialize)]
struct VersionResponse {
    name: &'static str,
    version: &'static str,
    profile: &'static str,
    features: Vec<&'static str>,
    built_at: &'static str,
}

#[tracing::instrument]
pub async fn handler() -> Response {
    let info = build_info();
    let features = match info.build_features {
        "none" => Vec::new(),
        list => list.split(',').collect(),
    };
    let body = VersionResponse {
        name: "linx-server",
        version: info.version,
        profile: info.build_profile,
        features,
        built_at: info.build_timestamp,
    };
    (StatusCode::OK, Json(body)).into_response()
}

#[cfg(test)]
mod tests {
    use axum::body::to_bytes;

    use super::*;

    #[tokio::test]
    async fn test_reports_server_build() {
        let response = handler().await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["name"], "linx-server");
        assert!(body["version"].is_string());
        assert!(body["features"].is_array());
    }
}
