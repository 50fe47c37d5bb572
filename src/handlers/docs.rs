use axum::{Json, response::Html};
use utoipa::OpenApi;

use crate::error::ErrorDetail;
use crate::handlers::{backlog, projects, root};
use crate::types::backlog::{BacklogMetadata, BacklogResponse, WorkItem, WorkItemFilters};
use crate::types::project::{Project, ProjectsPage};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Azure DevOps Backlog API",
        description = "Backlog extraction from Azure DevOps"
    ),
    paths(
        root::root,
        root::health,
        backlog::post_backlog,
        backlog::get_backlog,
        projects::list_projects
    ),
    components(schemas(
        BacklogResponse,
        BacklogMetadata,
        WorkItem,
        WorkItemFilters,
        Project,
        ProjectsPage,
        ErrorDetail
    )),
    tags(
        (name = "Root"),
        (name = "Health"),
        (name = "Backlog", description = "Work item extraction"),
        (name = "Projects", description = "Project discovery")
    )
)]
pub struct ApiDoc;

const DOCS_PAGE: &str = r##"<!DOCTYPE html>
<html>
<head>
  <title>Azure DevOps Backlog API - Docs</title>
  <meta charset="utf-8"/>
  <link rel="stylesheet" href="https://cdn.jsdelivr.net/npm/swagger-ui-dist@5/swagger-ui.css">
</head>
<body>
  <div id="swagger-ui"></div>
  <script src="https://cdn.jsdelivr.net/npm/swagger-ui-dist@5/swagger-ui-bundle.js"></script>
  <script>
    window.ui = SwaggerUIBundle({ url: "/openapi.json", dom_id: "#swagger-ui" });
  </script>
</body>
</html>
"##;

pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

/// Interactive documentation rendering `/openapi.json`.
pub async fn docs_page() -> Html<&'static str> {
    Html(DOCS_PAGE)
}
