use crate::api::azure_devops::AzureDevOpsApi;
use crate::config::{DETAILS_BATCH_SIZE, DETAILS_CONCURRENCY};
use crate::error::BacklogError;
use crate::service::period::{Period, format_day};
use crate::service::wiql::backlog_query;
use crate::types::backlog::{BacklogMetadata, BacklogResponse, WorkItem, WorkItemFilters};
use crate::types::devops::{RawRelation, RawWorkItem};
use futures::{StreamExt, TryStreamExt, stream};
use std::time::Instant;
use tracing::info;

const PARENT_RELATION: &str = "System.LinkTypes.Hierarchy-Reverse";

/// Work item types listed as parents; everything else is a child.
const PARENT_TYPES: &[&str] = &["Epic", "Feature", "User Story", "Product Backlog Item"];

pub fn is_parent_type(work_item_type: &str) -> bool {
    PARENT_TYPES.contains(&work_item_type)
}

/// Extracts backlogs for one project.
pub struct BacklogService {
    api: AzureDevOpsApi,
    project: String,
}

impl BacklogService {
    pub fn new(api: AzureDevOpsApi, project: impl Into<String>) -> Self {
        Self {
            api,
            project: project.into(),
        }
    }

    pub async fn fetch(
        &self,
        period: &Period,
        filters: Option<&WorkItemFilters>,
    ) -> Result<BacklogResponse, BacklogError> {
        let started = Instant::now();
        let org = self.api.organization();
        info!(
            org,
            project = %self.project,
            start = %period.start_label(),
            end = %period.end_label(),
            filters = %filters.map(WorkItemFilters::summary).unwrap_or_else(|| "none".into()),
            "Backlog fetch started"
        );

        let query = backlog_query(&self.project, period, filters);
        let ids = self.api.run_wiql(&self.project, &query).await?;
        let raw_items = self.fetch_details(&ids).await?;

        let items = raw_items
            .into_iter()
            .map(|raw| self.to_work_item(raw))
            .collect::<Vec<_>>();
        let total_items = items.len();
        let (parents, children) = categorize(items);

        info!(
            org,
            project = %self.project,
            items = total_items,
            parents = parents.len(),
            children = children.len(),
            duration_ms = started.elapsed().as_millis() as u64,
            "Backlog fetched"
        );

        Ok(BacklogResponse {
            total_items,
            metadata: BacklogMetadata {
                start_date: period.start_label(),
                end_date: period.end_label(),
                organization: org.to_string(),
                project: self.project.clone(),
                total_parents: parents.len(),
                total_children: children.len(),
                applied_filters: filters.filter(|f| !f.is_empty()).cloned(),
            },
            parents,
            children,
        })
    }

    /// Details in fixed-size batches; batches run concurrently, order is preserved.
    async fn fetch_details(&self, ids: &[u64]) -> Result<Vec<RawWorkItem>, BacklogError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let started = Instant::now();
        let batch_count = ids.len().div_ceil(DETAILS_BATCH_SIZE);

        let chunks: Vec<(usize, Vec<u64>)> = ids
            .chunks(DETAILS_BATCH_SIZE)
            .map(<[u64]>::to_vec)
            .enumerate()
            .collect();

        let batches: Vec<Vec<RawWorkItem>> = stream::iter(chunks)
            .map(|(index, batch)| async move {
                let items = self.api.work_items(&self.project, &batch).await?;
                info!(
                    org = self.api.organization(),
                    project = %self.project,
                    batch = index + 1,
                    of = batch_count,
                    batch_size = batch.len(),
                    received = items.len(),
                    "Fetched work item batch"
                );
                Ok::<_, BacklogError>(items)
            })
            .buffered(DETAILS_CONCURRENCY)
            .try_collect()
            .await?;

        let items: Vec<RawWorkItem> = batches.into_iter().flatten().collect();
        info!(
            org = self.api.organization(),
            project = %self.project,
            total = items.len(),
            duration_ms = started.elapsed().as_millis() as u64,
            "Work item details fetched"
        );
        Ok(items)
    }

    fn to_work_item(&self, raw: RawWorkItem) -> WorkItem {
        let web_url = self
            .api
            .work_item_web_url(&self.project, raw.id)
            .ok()
            .map(String::from);
        map_work_item(raw, web_url)
    }
}

/// First hierarchy-reverse relation: the parent's id and API URL.
pub fn parent_of(relations: Option<&[RawRelation]>) -> (Option<u64>, Option<String>) {
    let Some(relation) = relations
        .unwrap_or_default()
        .iter()
        .find(|r| r.rel.as_deref() == Some(PARENT_RELATION))
    else {
        return (None, None);
    };
    let Some(url) = relation.url.as_deref().filter(|u| !u.is_empty()) else {
        return (None, None);
    };
    let id = url
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .and_then(|segment| segment.parse().ok());
    (id, Some(url.to_string()))
}

pub fn map_work_item(raw: RawWorkItem, web_url: Option<String>) -> WorkItem {
    let (parent_id, parent_link) = parent_of(raw.relations.as_deref());
    let date = |name: &str| raw.str_field(name).as_deref().and_then(format_day);

    WorkItem {
        id: raw.id,
        title: raw.str_field("System.Title").unwrap_or_default(),
        state: raw.str_field("System.State"),
        work_item_type: raw.str_field("System.WorkItemType"),
        tags: raw.str_field("System.Tags"),
        created_by: raw.display_name("System.CreatedBy"),
        assigned_to: raw.display_name("System.AssignedTo"),
        area_path: raw.str_field("System.AreaPath"),
        team_project: raw.str_field("System.TeamProject"),
        iteration_path: raw.str_field("System.IterationPath"),
        completed_work: raw.f64_field("Microsoft.VSTS.Scheduling.CompletedWork"),
        original_estimate: raw.f64_field("Microsoft.VSTS.Scheduling.OriginalEstimate"),
        start_date: date("Microsoft.VSTS.Scheduling.StartDate"),
        finish_date: date("Microsoft.VSTS.Scheduling.FinishDate"),
        created_date: date("System.CreatedDate"),
        changed_date: date("System.ChangedDate"),
        closed_date: date("Microsoft.VSTS.Common.ClosedDate"),
        parent_id,
        parent_link,
        web_url,
    }
}

/// Split into (parents, children) keeping the query order within each side.
pub fn categorize(items: Vec<WorkItem>) -> (Vec<WorkItem>, Vec<WorkItem>) {
    items.into_iter().partition(|item| {
        item.work_item_type
            .as_deref()
            .is_some_and(is_parent_type)
    })
}
