use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use serde::Deserialize;
use serde_json::json;
use utoipa::ToSchema;

use crate::{responses, AppState};

#[derive(Debug, Deserialize)]
pub(crate) struct ListQuery {
    #[serde(default)]
    category: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SearchQuery {
    #[serde(default)]
    keyword: Option<String>,
}

/// Create/update payload. Missing required fields surface as a 400, not a
/// deserialization reject, so every field defaults.
#[derive(Debug, Deserialize, ToSchema)]
pub(crate) struct KnowledgeBody {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub tags: String,
}

fn validate(body: &KnowledgeBody) -> Result<(), axum::response::Response> {
    if body.title.trim().is_empty() || body.content.trim().is_empty() {
        return Err(responses::bad_request("title and content must not be empty"));
    }
    Ok(())
}

/// All entries, newest change first; optional exact category filter.
#[utoipa::path(
    get,
    path = "/api/knowledge",
    tag = "Knowledge",
    params(("category" = Option<String>, Query, description = "Exact category filter")),
    responses((status = 200, description = "Entries", body = serde_json::Value))
)]
pub async fn list(
    State(state): State<AppState>,
    Query(q): Query<ListQuery>,
) -> impl IntoResponse {
    match state.kernel().list_knowledge_async(q.category).await {
        Ok(entries) => responses::json_ok(json!(entries)),
        Err(err) => responses::storage_error(err),
    }
}

/// Substring search over title, content and tags. An empty keyword yields an
/// empty list.
#[utoipa::path(
    get,
    path = "/api/knowledge/search",
    tag = "Knowledge",
    params(("keyword" = Option<String>, Query, description = "Substring to match")),
    responses((status = 200, description = "Matching entries", body = serde_json::Value))
)]
pub async fn search(
    State(state): State<AppState>,
    Query(q): Query<SearchQuery>,
) -> impl IntoResponse {
    let keyword = q.keyword.unwrap_or_default();
    match state.kernel().search_knowledge_async(keyword).await {
        Ok(entries) => responses::json_ok(json!(entries)),
        Err(err) => responses::storage_error(err),
    }
}

#[utoipa::path(
    post,
    path = "/api/knowledge",
    tag = "Knowledge",
    request_body = KnowledgeBody,
    responses(
        (status = 200, description = "Created", body = serde_json::Value),
        (status = 400, description = "Missing title or content", body = serde_json::Value)
    )
)]
pub async fn create(
    State(state): State<AppState>,
    axum::Json(body): axum::Json<KnowledgeBody>,
) -> impl IntoResponse {
    if let Err(resp) = validate(&body) {
        return resp;
    }
    match state
        .kernel()
        .insert_knowledge_async(body.title, body.content, body.category, body.tags)
        .await
    {
        Ok(id) => responses::json_ok(json!({"message": "knowledge entry added", "id": id})),
        Err(err) => responses::storage_error(err),
    }
}

/// Full-row update. An unknown id is still a success; zero rows change.
#[utoipa::path(
    put,
    path = "/api/knowledge/{id}",
    tag = "Knowledge",
    params(("id" = i64, Path, description = "Entry id")),
    request_body = KnowledgeBody,
    responses(
        (status = 200, description = "Updated", body = serde_json::Value),
        (status = 400, description = "Missing title or content", body = serde_json::Value)
    )
)]
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    axum::Json(body): axum::Json<KnowledgeBody>,
) -> impl IntoResponse {
    if let Err(resp) = validate(&body) {
        return resp;
    }
    match state
        .kernel()
        .update_knowledge_async(id, body.title, body.content, body.category, body.tags)
        .await
    {
        Ok(_) => responses::json_ok(json!({"message": "knowledge entry updated"})),
        Err(err) => responses::storage_error(err),
    }
}

/// Idempotent delete.
#[utoipa::path(
    delete,
    path = "/api/knowledge/{id}",
    tag = "Knowledge",
    params(("id" = i64, Path, description = "Entry id")),
    responses((status = 200, description = "Deleted", body = serde_json::Value))
)]
pub async fn remove(State(state): State<AppState>, Path(id): Path<i64>) -> impl IntoResponse {
    match state.kernel().delete_knowledge_async(id).await {
        Ok(_) => responses::json_ok(json!({"message": "knowledge entry deleted"})),
        Err(err) => responses::storage_error(err),
    }
}
