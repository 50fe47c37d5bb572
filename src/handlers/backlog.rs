use axum::{Json, extract::State};
use tracing::info;

use crate::config::resolve_param;
use crate::error::{BacklogError, ErrorDetail};
use crate::middleware::extract::{JsonBody, QueryParams};
use crate::router::BacklogState;
use crate::service::backlog::BacklogService;
use crate::service::period::Period;
use crate::types::backlog::{BacklogQuery, BacklogRequest, BacklogResponse};

/// Extract a project's backlog.
///
/// The period is either `start_date`/`end_date` or a whole `year`/`month`;
/// with neither, no creation-date filter is applied. Organization, project
/// and PAT fall back to the service's environment.
#[utoipa::path(
    post,
    path = "/backlog",
    tag = "Backlog",
    request_body = BacklogRequest,
    responses(
        (status = 200, description = "Backlog extracted", body = BacklogResponse),
        (status = 400, description = "Missing credential or invalid period", body = ErrorDetail),
        (status = 422, description = "Invalid request", body = ErrorDetail),
        (status = 503, description = "Azure DevOps unreachable", body = ErrorDetail)
    )
)]
pub async fn post_backlog(
    State(state): State<BacklogState>,
    JsonBody(request): JsonBody<BacklogRequest>,
) -> Result<Json<BacklogResponse>, BacklogError> {
    extract_backlog(&state, request).await.map(Json)
}

/// Query-string variant of `POST /backlog`; list filters are comma separated.
#[utoipa::path(
    get,
    path = "/backlog",
    tag = "Backlog",
    params(BacklogQuery),
    responses(
        (status = 200, description = "Backlog extracted", body = BacklogResponse),
        (status = 400, description = "Missing credential or invalid period", body = ErrorDetail),
        (status = 422, description = "Invalid request", body = ErrorDetail),
        (status = 503, description = "Azure DevOps unreachable", body = ErrorDetail)
    )
)]
pub async fn get_backlog(
    State(state): State<BacklogState>,
    QueryParams(query): QueryParams<BacklogQuery>,
) -> Result<Json<BacklogResponse>, BacklogError> {
    extract_backlog(&state, query.into()).await.map(Json)
}

async fn extract_backlog(
    state: &BacklogState,
    request: BacklogRequest,
) -> Result<BacklogResponse, BacklogError> {
    let config = &state.config;
    let project = request
        .project_name
        .as_deref()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .or_else(|| Some(config.azure_devops_project.trim()).filter(|p| !p.is_empty()))
        .ok_or_else(|| {
            BacklogError::Validation(
                "project_name must be provided in the request or set in the environment"
                    .to_string(),
            )
        })?
        .to_string();
    let organization = resolve_param(
        request.organization.as_deref(),
        &config.azure_devops_organization,
        "organization",
    )?;
    let pat = resolve_param(
        request.pat.as_deref(),
        config.default_pat(),
        "Personal Access Token",
    )?;
    let period = Period::resolve(
        request.start_date.as_deref(),
        request.end_date.as_deref(),
        request.year,
        request.month,
    )?;

    info!(
        org = %organization,
        project = %project,
        pat_from_request = request.pat.is_some(),
        "Backlog request"
    );

    let service = BacklogService::new(state.api(&organization, &pat), project);
    service.fetch(&period, request.filters.as_ref()).await
}
