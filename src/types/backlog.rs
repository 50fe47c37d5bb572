use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

/// Optional WIQL refinements applied on top of the project/period query.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, ToSchema)]
pub struct WorkItemFilters {
    /// Work item types (Bug, Task, User Story, ...).
    #[serde(default)]
    pub work_item_types: Option<Vec<String>>,
    /// States (New, Active, Resolved, Closed, ...).
    #[serde(default)]
    pub states: Option<Vec<String>>,
    #[serde(default)]
    pub area_paths: Option<Vec<String>>,
    #[serde(default)]
    pub iteration_paths: Option<Vec<String>>,
    /// Assignee display names.
    #[serde(default)]
    pub assigned_to: Option<Vec<String>>,
    #[serde(default)]
    pub tags: Option<String>,
}

impl WorkItemFilters {
    pub fn is_empty(&self) -> bool {
        self.summary() == "none"
    }

    /// Counts only; filter values can carry names and must stay out of logs.
    pub fn summary(&self) -> String {
        let lists = [
            ("types", &self.work_item_types),
            ("states", &self.states),
            ("areas", &self.area_paths),
            ("iterations", &self.iteration_paths),
            ("assignees", &self.assigned_to),
        ];
        let mut parts: Vec<String> = lists
            .iter()
            .filter_map(|(label, values)| {
                values
                    .as_deref()
                    .filter(|v| !v.is_empty())
                    .map(|v| format!("{label}={}", v.len()))
            })
            .collect();
        if self.tags.as_deref().is_some_and(|t| !t.is_empty()) {
            parts.push("tags=1".to_string());
        }
        if parts.is_empty() {
            "none".to_string()
        } else {
            parts.join("|")
        }
    }
}

/// Body of `POST /backlog`.
///
/// Organization and PAT fall back to the environment when omitted. The
/// period is either `start_date`/`end_date` or a `year`/`month` pair.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct BacklogRequest {
    #[serde(default)]
    pub organization: Option<String>,
    #[serde(default)]
    pub project_name: Option<String>,
    #[serde(default)]
    pub pat: Option<String>,
    /// Inclusive lower bound, `YYYY-MM-DD`.
    #[serde(default)]
    pub start_date: Option<String>,
    /// Inclusive upper bound, `YYYY-MM-DD`.
    #[serde(default)]
    pub end_date: Option<String>,
    #[serde(default)]
    pub year: Option<i32>,
    /// 1-12.
    #[serde(default)]
    pub month: Option<u32>,
    #[serde(default)]
    pub filters: Option<WorkItemFilters>,
}

/// Query string of `GET /backlog`; list filters are comma separated.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct BacklogQuery {
    pub project_name: Option<String>,
    pub organization: Option<String>,
    pub pat: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub year: Option<i32>,
    pub month: Option<u32>,
    /// e.g. `Bug,Task,User Story`
    pub work_item_types: Option<String>,
    pub states: Option<String>,
    pub area_paths: Option<String>,
    pub iteration_paths: Option<String>,
    pub assigned_to: Option<String>,
    pub tags: Option<String>,
}

fn split_list(raw: Option<String>) -> Option<Vec<String>> {
    let values: Vec<String> = raw?
        .split(',')
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .collect();
    (!values.is_empty()).then_some(values)
}

impl From<BacklogQuery> for BacklogRequest {
    fn from(query: BacklogQuery) -> Self {
        let filters = WorkItemFilters {
            work_item_types: split_list(query.work_item_types),
            states: split_list(query.states),
            area_paths: split_list(query.area_paths),
            iteration_paths: split_list(query.iteration_paths),
            assigned_to: split_list(query.assigned_to),
            tags: query.tags.filter(|t| !t.trim().is_empty()),
        };
        BacklogRequest {
            organization: query.organization,
            project_name: query.project_name,
            pat: query.pat,
            start_date: query.start_date,
            end_date: query.end_date,
            year: query.year,
            month: query.month,
            filters: (!filters.is_empty()).then_some(filters),
        }
    }
}

/// A work item reshaped for consumers. Dates are rendered `DD/MM/YYYY`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, ToSchema)]
pub struct WorkItem {
    pub id: u64,
    pub title: String,
    pub state: Option<String>,
    pub work_item_type: Option<String>,
    pub tags: Option<String>,
    pub created_by: Option<String>,
    pub assigned_to: Option<String>,
    pub area_path: Option<String>,
    pub team_project: Option<String>,
    pub iteration_path: Option<String>,
    pub completed_work: Option<f64>,
    pub original_estimate: Option<f64>,
    pub start_date: Option<String>,
    pub finish_date: Option<String>,
    pub created_date: Option<String>,
    pub changed_date: Option<String>,
    pub closed_date: Option<String>,
    pub parent_id: Option<u64>,
    /// API URL of the parent work item.
    pub parent_link: Option<String>,
    /// Browser link to the work item.
    pub web_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, ToSchema)]
pub struct BacklogMetadata {
    /// `YYYY-MM-DD`, or `none` when unbounded.
    pub start_date: String,
    pub end_date: String,
    pub organization: String,
    pub project: String,
    pub total_parents: usize,
    pub total_children: usize,
    pub applied_filters: Option<WorkItemFilters>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, ToSchema)]
pub struct BacklogResponse {
    pub total_items: usize,
    /// Epics, features, user stories and product backlog items.
    pub parents: Vec<WorkItem>,
    pub children: Vec<WorkItem>,
    pub metadata: BacklogMetadata,
}
