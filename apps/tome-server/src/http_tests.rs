use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tempfile::tempdir;
use tower::util::ServiceExt;

use crate::{router, AppState};

fn test_app(dir: &std::path::Path) -> Router {
    let kernel = tome_kernel::Kernel::open(dir).expect("open kernel for tests");
    router::build_router().with_state(AppState::new(kernel))
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .expect("request")
}

fn json_req(method: &str, uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("request")
}

async fn body_json(resp: axum::response::Response) -> Value {
    let bytes = resp
        .into_body()
        .collect()
        .await
        .expect("collect body")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("json body")
}

#[tokio::test]
async fn health_reports_ready() {
    let tmp = tempdir().expect("tempdir");
    let app = test_app(tmp.path());

    let resp = app.oneshot(get("/api/health")).await.expect("response");
    assert_eq!(resp.status(), StatusCode::OK);
    let payload = body_json(resp).await;
    assert_eq!(payload["status"], "healthy");
    assert!(payload["timestamp"].is_string());
}

#[tokio::test]
async fn knowledge_create_then_list_roundtrip() {
    let tmp = tempdir().expect("tempdir");
    let app = test_app(tmp.path());

    let create = json_req(
        "POST",
        "/api/knowledge",
        &json!({"title": "wal notes", "content": "checkpoint basics", "category": "db", "tags": "sqlite"}),
    );
    let resp = app.clone().oneshot(create).await.expect("create response");
    assert_eq!(resp.status(), StatusCode::OK);
    let created = body_json(resp).await;
    let id = created["id"].as_i64().expect("created id");

    let resp = app.oneshot(get("/api/knowledge")).await.expect("list");
    assert_eq!(resp.status(), StatusCode::OK);
    let entries = body_json(resp).await;
    let entries = entries.as_array().expect("array");
    assert_eq!(entries.len(), 1);
    let e = &entries[0];
    assert_eq!(e["id"].as_i64(), Some(id));
    assert_eq!(e["title"], "wal notes");
    assert_eq!(e["content"], "checkpoint basics");
    assert_eq!(e["category"], "db");
    assert_eq!(e["tags"], "sqlite");
    assert_eq!(e["created_at"], e["updated_at"]);
}

#[tokio::test]
async fn knowledge_create_rejects_empty_fields() {
    let tmp = tempdir().expect("tempdir");
    let app = test_app(tmp.path());

    for body in [
        json!({"title": "", "content": "body"}),
        json!({"content": "body"}),
        json!({"title": "t", "content": "  "}),
    ] {
        let resp = app
            .clone()
            .oneshot(json_req("POST", "/api/knowledge", &body))
            .await
            .expect("response");
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let problem = body_json(resp).await;
        assert_eq!(problem["status"], 400);
        assert!(problem["detail"].is_string());
    }

    // nothing persisted
    let resp = app.oneshot(get("/api/knowledge")).await.expect("list");
    assert!(body_json(resp).await.as_array().expect("array").is_empty());
}

#[tokio::test]
async fn knowledge_search_semantics() {
    let tmp = tempdir().expect("tempdir");
    let app = test_app(tmp.path());

    for (title, content, tags) in [
        ("borrow checker", "lifetimes", ""),
        ("misc", "about borrowing", ""),
        ("other", "unrelated", "borrow"),
        ("fourth", "nothing", ""),
    ] {
        let resp = app
            .clone()
            .oneshot(json_req(
                "POST",
                "/api/knowledge",
                &json!({"title": title, "content": content, "tags": tags}),
            ))
            .await
            .expect("create");
        assert_eq!(resp.status(), StatusCode::OK);
    }

    let resp = app
        .clone()
        .oneshot(get("/api/knowledge/search?keyword=borrow"))
        .await
        .expect("search");
    assert_eq!(body_json(resp).await.as_array().expect("array").len(), 3);

    // empty keyword matches nothing, not everything
    let resp = app
        .clone()
        .oneshot(get("/api/knowledge/search?keyword="))
        .await
        .expect("search");
    assert!(body_json(resp).await.as_array().expect("array").is_empty());

    let resp = app
        .oneshot(get("/api/knowledge/search"))
        .await
        .expect("search");
    assert!(body_json(resp).await.as_array().expect("array").is_empty());
}

#[tokio::test]
async fn knowledge_missing_id_updates_and_deletes_succeed() {
    let tmp = tempdir().expect("tempdir");
    let app = test_app(tmp.path());

    let resp = app
        .clone()
        .oneshot(json_req(
            "PUT",
            "/api/knowledge/4242",
            &json!({"title": "t", "content": "c"}),
        ))
        .await
        .expect("update");
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = app
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/api/knowledge/4242")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("delete");
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = app.oneshot(get("/api/knowledge")).await.expect("list");
    assert!(body_json(resp).await.as_array().expect("array").is_empty());
}

#[tokio::test]
async fn knowledge_update_changes_row_in_place() {
    let tmp = tempdir().expect("tempdir");
    let app = test_app(tmp.path());

    let resp = app
        .clone()
        .oneshot(json_req(
            "POST",
            "/api/knowledge",
            &json!({"title": "draft", "content": "v1"}),
        ))
        .await
        .expect("create");
    let id = body_json(resp).await["id"].as_i64().expect("id");

    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    let resp = app
        .clone()
        .oneshot(json_req(
            "PUT",
            &format!("/api/knowledge/{id}"),
            &json!({"title": "final", "content": "v2", "category": "posts"}),
        ))
        .await
        .expect("update");
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = app.oneshot(get("/api/knowledge")).await.expect("list");
    let entries = body_json(resp).await;
    let e = &entries.as_array().expect("array")[0];
    assert_eq!(e["id"].as_i64(), Some(id));
    assert_eq!(e["title"], "final");
    assert_eq!(e["category"], "posts");
    assert!(e["updated_at"].as_str() > e["created_at"].as_str());
}

#[tokio::test]
async fn task_create_rejects_empty_content() {
    let tmp = tempdir().expect("tempdir");
    let app = test_app(tmp.path());

    let resp = app
        .clone()
        .oneshot(json_req("POST", "/api/tasks", &json!({"content": ""})))
        .await
        .expect("response");
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = app.oneshot(get("/api/tasks")).await.expect("list");
    assert!(body_json(resp).await.as_array().expect("array").is_empty());
}

#[tokio::test]
async fn tasks_order_by_priority_then_recency() {
    let tmp = tempdir().expect("tempdir");
    let app = test_app(tmp.path());

    for (content, priority) in [
        ("backlog item", "low"),
        ("fire one", "high"),
        ("planned", "normal"),
        ("fire two", "high"),
    ] {
        let resp = app
            .clone()
            .oneshot(json_req(
                "POST",
                "/api/tasks",
                &json!({"content": content, "priority": priority}),
            ))
            .await
            .expect("create");
        assert_eq!(resp.status(), StatusCode::OK);
    }

    let resp = app.oneshot(get("/api/tasks")).await.expect("list");
    let tasks = body_json(resp).await;
    let contents: Vec<&str> = tasks
        .as_array()
        .expect("array")
        .iter()
        .map(|t| t["content"].as_str().expect("content"))
        .collect();
    assert_eq!(contents, vec!["fire two", "fire one", "planned", "backlog item"]);
}

#[tokio::test]
async fn task_toggle_and_missing_id_update() {
    let tmp = tempdir().expect("tempdir");
    let app = test_app(tmp.path());

    let resp = app
        .clone()
        .oneshot(json_req(
            "POST",
            "/api/tasks",
            &json!({"content": "flip me", "priority": "normal"}),
        ))
        .await
        .expect("create");
    let created = body_json(resp).await;
    let id = created["id"].as_i64().expect("id");
    assert_eq!(created["completed"], false);

    let resp = app
        .clone()
        .oneshot(json_req(
            "PUT",
            &format!("/api/tasks/{id}"),
            &json!({"completed": true}),
        ))
        .await
        .expect("update");
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = app.clone().oneshot(get("/api/tasks")).await.expect("list");
    let tasks = body_json(resp).await;
    assert_eq!(tasks.as_array().expect("array")[0]["completed"], true);

    // unknown ids are fine; nothing is reported as missing
    let resp = app
        .oneshot(json_req(
            "PUT",
            "/api/tasks/4242",
            &json!({"completed": true}),
        ))
        .await
        .expect("update");
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn index_serves_embedded_page() {
    let tmp = tempdir().expect("tempdir");
    let app = test_app(tmp.path());

    let resp = app.oneshot(get("/")).await.expect("response");
    assert_eq!(resp.status(), StatusCode::OK);
    let content_type = resp
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(content_type.starts_with("text/html"));
    let bytes = resp
        .into_body()
        .collect()
        .await
        .expect("collect body")
        .to_bytes();
    let page = String::from_utf8_lossy(&bytes);
    assert!(page.contains("<!DOCTYPE html>"));
    assert!(page.contains("Tome"));
}

#[tokio::test]
async fn openapi_document_is_served() {
    let tmp = tempdir().expect("tempdir");
    let app = test_app(tmp.path());

    let resp = app.oneshot(get("/spec/openapi.json")).await.expect("doc");
    assert_eq!(resp.status(), StatusCode::OK);
    let doc = body_json(resp).await;
    assert!(doc["openapi"].is_string());
    assert!(doc["paths"]["/api/knowledge"].is_object());
}
