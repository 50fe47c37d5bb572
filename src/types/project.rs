use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use super::devops::RawProject;

pub const DEFAULT_PAGE_SIZE: u32 = 100;
pub const MAX_PAGE_SIZE: u32 = 500;

fn default_top() -> u32 {
    DEFAULT_PAGE_SIZE
}

/// Query string of `GET /projects`.
#[derive(Debug, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ProjectsQuery {
    pub organization: Option<String>,
    pub pat: Option<String>,
    /// Page size, 1-500.
    #[serde(default = "default_top")]
    #[param(minimum = 1, maximum = 500)]
    pub top: u32,
    /// Projects to skip.
    #[serde(default)]
    pub skip: u32,
    /// Token returned by the previous page.
    pub continuation_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, ToSchema)]
pub struct Project {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub url: Option<String>,
    /// e.g. `wellFormed`.
    pub state: Option<String>,
    pub revision: Option<u64>,
    /// `private` or `public`.
    pub visibility: Option<String>,
    pub last_update_time: Option<String>,
}

impl From<RawProject> for Project {
    fn from(raw: RawProject) -> Self {
        Self {
            id: raw.id,
            name: raw.name,
            description: raw.description,
            url: raw.url,
            state: raw.state,
            revision: raw.revision,
            visibility: raw.visibility,
            last_update_time: raw.last_update_time,
        }
    }
}

/// One page of projects.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, ToSchema)]
pub struct ProjectsPage {
    /// Projects on this page.
    pub count: usize,
    /// Total reported by Azure DevOps, when it reports one.
    pub total_count: Option<u64>,
    pub projects: Vec<Project>,
    pub continuation_token: Option<String>,
    pub has_more: bool,
}
