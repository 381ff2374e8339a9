use axum::extract::{Path, State};
use axum::response::IntoResponse;
use serde::Deserialize;
use serde_json::json;
use utoipa::ToSchema;

use crate::{responses, AppState};

#[derive(Debug, Deserialize, ToSchema)]
pub(crate) struct TaskCreateBody {
    #[serde(default)]
    pub content: String,
    /// Free-form; `high`/`normal`/`low` are ranked, anything else sorts last.
    #[serde(default)]
    pub priority: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub(crate) struct TaskUpdateBody {
    // An absent flag means "not completed".
    #[serde(default)]
    pub completed: bool,
}

/// All tasks, priority rank first, newest first within a rank.
#[utoipa::path(
    get,
    path = "/api/tasks",
    tag = "Tasks",
    responses((status = 200, description = "Tasks", body = serde_json::Value))
)]
pub async fn list(State(state): State<AppState>) -> impl IntoResponse {
    match state.kernel().list_tasks_async().await {
        Ok(tasks) => responses::json_ok(json!(tasks)),
        Err(err) => responses::storage_error(err),
    }
}

#[utoipa::path(
    post,
    path = "/api/tasks",
    tag = "Tasks",
    request_body = TaskCreateBody,
    responses(
        (status = 200, description = "Created", body = serde_json::Value),
        (status = 400, description = "Missing content", body = serde_json::Value)
    )
)]
pub async fn create(
    State(state): State<AppState>,
    axum::Json(body): axum::Json<TaskCreateBody>,
) -> impl IntoResponse {
    if body.content.trim().is_empty() {
        return responses::bad_request("task content must not be empty");
    }
    match state
        .kernel()
        .insert_task_async(body.content, body.priority)
        .await
    {
        Ok(task) => responses::json_ok(json!({
            "id": task.id,
            "content": task.content,
            "completed": task.completed,
        })),
        Err(err) => responses::storage_error(err),
    }
}

/// Set the completion flag. An unknown id is still a success.
#[utoipa::path(
    put,
    path = "/api/tasks/{id}",
    tag = "Tasks",
    params(("id" = i64, Path, description = "Task id")),
    request_body = TaskUpdateBody,
    responses((status = 200, description = "Updated", body = serde_json::Value))
)]
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    axum::Json(body): axum::Json<TaskUpdateBody>,
) -> impl IntoResponse {
    match state
        .kernel()
        .set_task_completed_async(id, body.completed)
        .await
    {
        Ok(_) => responses::json_ok(json!({"message": "task updated"})),
        Err(err) => responses::storage_error(err),
    }
}

/// Idempotent delete.
#[utoipa::path(
    delete,
    path = "/api/tasks/{id}",
    tag = "Tasks",
    params(("id" = i64, Path, description = "Task id")),
    responses((status = 200, description = "Deleted", body = serde_json::Value))
)]
pub async fn remove(State(state): State<AppState>, Path(id): Path<i64>) -> impl IntoResponse {
    match state.kernel().delete_task_async(id).await {
        Ok(_) => responses::json_ok(json!({"message": "task deleted"})),
        Err(err) => responses::storage_error(err),
    }
}
