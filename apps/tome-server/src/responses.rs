use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};

pub(crate) fn json_ok(payload: Value) -> Response {
    Json(payload).into_response()
}

pub(crate) fn problem(status: StatusCode, title: &str, detail: &str) -> Response {
    (
        status,
        Json(json!({
            "type": "about:blank",
            "title": title,
            "status": status.as_u16(),
            "detail": detail,
        })),
    )
        .into_response()
}

pub(crate) fn bad_request(detail: &str) -> Response {
    problem(StatusCode::BAD_REQUEST, "Bad Request", detail)
}

/// 500 with a generic detail; the underlying error stays in the server log.
pub(crate) fn storage_error(err: anyhow::Error) -> Response {
    tracing::error!("storage operation failed: {err:#}");
    problem(
        StatusCode::INTERNAL_SERVER_ERROR,
        "Error",
        "storage operation failed",
    )
}
