use axum::routing::get;
use axum::Router;

use crate::{api, AppState};

pub(crate) mod paths {
    pub const ROOT: &str = "/";
    pub const HEALTH: &str = "/api/health";
    pub const KNOWLEDGE: &str = "/api/knowledge";
    pub const KNOWLEDGE_SEARCH: &str = "/api/knowledge/search";
    pub const KNOWLEDGE_ID: &str = "/api/knowledge/{id}";
    pub const TASKS: &str = "/api/tasks";
    pub const TASKS_ID: &str = "/api/tasks/{id}";
    pub const OPENAPI: &str = "/spec/openapi.json";
}

pub(crate) fn build_router() -> Router<AppState> {
    Router::new()
        .route(paths::ROOT, get(api::ui::index))
        .route(paths::HEALTH, get(api::meta::health))
        .route(
            paths::KNOWLEDGE,
            get(api::knowledge::list).post(api::knowledge::create),
        )
        .route(paths::KNOWLEDGE_SEARCH, get(api::knowledge::search))
        .route(
            paths::KNOWLEDGE_ID,
            axum::routing::put(api::knowledge::update).delete(api::knowledge::remove),
        )
        .route(paths::TASKS, get(api::tasks::list).post(api::tasks::create))
        .route(
            paths::TASKS_ID,
            axum::routing::put(api::tasks::update).delete(api::tasks::remove),
        )
        .route(paths::OPENAPI, get(api::meta::openapi_doc))
}
