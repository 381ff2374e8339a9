use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::{SecondsFormat, Utc};
use serde_json::json;
use utoipa::OpenApi as _;

use crate::{responses, AppState};

/// Readiness probe backed by a trivial storage query.
#[utoipa::path(
    get,
    path = "/api/health",
    tag = "Meta",
    description = "Service readiness probe.",
    responses(
        (status = 200, description = "Storage reachable", body = serde_json::Value),
        (status = 503, description = "Storage unavailable", body = serde_json::Value)
    )
)]
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
    match state.kernel().probe_async().await {
        Ok(()) => responses::json_ok(json!({
            "status": "healthy",
            "message": "service is ready",
            "timestamp": timestamp,
        })),
        Err(err) => {
            tracing::error!("health probe failed: {err:#}");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "status": "unhealthy",
                    "message": "storage probe failed",
                    "timestamp": timestamp,
                })),
            )
                .into_response()
        }
    }
}

/// Generated OpenAPI document.
pub async fn openapi_doc() -> impl IntoResponse {
    Json(crate::openapi::ApiDoc::openapi())
}
