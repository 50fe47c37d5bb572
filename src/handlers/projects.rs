use axum::{Json, extract::State};
use tracing::info;

use crate::config::resolve_param;
use crate::error::{BacklogError, ErrorDetail};
use crate::middleware::extract::QueryParams;
use crate::router::BacklogState;
use crate::service::projects;
use crate::types::project::{MAX_PAGE_SIZE, ProjectsPage, ProjectsQuery};

/// List the organization's projects, one page at a time.
#[utoipa::path(
    get,
    path = "/projects",
    tag = "Projects",
    params(ProjectsQuery),
    responses(
        (status = 200, description = "Projects page", body = ProjectsPage),
        (status = 400, description = "Missing organization or credential", body = ErrorDetail),
        (status = 422, description = "Invalid paging parameters", body = ErrorDetail)
    )
)]
pub async fn list_projects(
    State(state): State<BacklogState>,
    QueryParams(query): QueryParams<ProjectsQuery>,
) -> Result<Json<ProjectsPage>, BacklogError> {
    if !(1..=MAX_PAGE_SIZE).contains(&query.top) {
        return Err(BacklogError::Validation(format!(
            "top must be between 1 and {MAX_PAGE_SIZE}"
        )));
    }
    let organization = resolve_param(
        query.organization.as_deref(),
        &state.config.azure_devops_organization,
        "organization",
    )?;
    let pat = resolve_param(
        query.pat.as_deref(),
        state.config.default_pat(),
        "Personal Access Token",
    )?;

    info!(
        org = %organization,
        top = query.top,
        skip = query.skip,
        continuation_token = query.continuation_token.is_some(),
        "Projects request"
    );

    let api = state.api(&organization, &pat);
    let page = projects::list_projects(
        &api,
        query.top,
        query.skip,
        query.continuation_token.as_deref(),
    )
    .await?;
    Ok(Json(page))
}
