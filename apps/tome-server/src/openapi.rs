use utoipa::OpenApi;

use crate::api;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Tome",
        description = "Local knowledge-base and task service"
    ),
    paths(
        api::meta::health,
        api::knowledge::list,
        api::knowledge::search,
        api::knowledge::create,
        api::knowledge::update,
        api::knowledge::remove,
        api::tasks::list,
        api::tasks::create,
        api::tasks::update,
        api::tasks::remove,
    ),
    components(schemas(
        api::knowledge::KnowledgeBody,
        api::tasks::TaskCreateBody,
        api::tasks::TaskUpdateBody,
    ))
)]
pub(crate) struct ApiDoc;
