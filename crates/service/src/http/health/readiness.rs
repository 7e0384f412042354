use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use std::time::Duration;
use tokio::time::timeout;

use super::data_source::*;

const HEALTH_CHECK_TIMEOUT: Duration = Duration::from_secs(10);

/// 200 with the file store's ping latency, or 503 when it fails or stalls.
#[tracing::instrument]
pub async fn handler(data_src: StateDataSource) -> Response {
    match timeout(HEALTH_CHECK_TIMEOUT, data_src.is_ready()).await {
        Ok(Ok(latency)) => {
            let msg = serde_json::json!({
                "status": "ok",
                "file_store": {"latency_us": latency.as_micros() as u64},
            });
            (StatusCode::OK, Json(msg)).into_response()
        }
        Ok(Err(DataSourceError::Unavailable(reason))) => {
            let msg = serde_json::json!({
                "status": "failure",
                "message": "file store isn't available",
                "file_store": {"error": reason},
            });
            (StatusCode::SERVICE_UNAVAILABLE, Json(msg)).into_response()
        }
        Err(_) => {
            tracing::warn!(timeout = ?HEALTH_CHECK_TIMEOUT, "file store ping timed out");
            let msg = serde_json::json!({
                "status": "failure",
                "message": "file store ping timed out"
            });
            (StatusCode::SERVICE_UNAVAILABLE, Json(msg)).into_response()
        }
    }
}
