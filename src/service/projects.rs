use crate::api::azure_devops::AzureDevOpsApi;
use crate::error::BacklogError;
use crate::types::project::{Project, ProjectsPage};
use std::time::Instant;
use tracing::info;

/// One page of the organization's projects.
pub async fn list_projects(
    api: &AzureDevOpsApi,
    top: u32,
    skip: u32,
    continuation_token: Option<&str>,
) -> Result<ProjectsPage, BacklogError> {
    let started = Instant::now();
    let (list, next) = api.projects(top, skip, continuation_token).await?;
    let projects: Vec<Project> = list.value.into_iter().map(Project::from).collect();

    info!(
        org = api.organization(),
        count = projects.len(),
        total = ?list.count,
        has_more = next.is_some(),
        duration_ms = started.elapsed().as_millis() as u64,
        "Projects fetched"
    );

    Ok(ProjectsPage {
        count: projects.len(),
        total_count: list.count,
        projects,
        has_more: next.is_some(),
        continuation_token: next,
    })
}
