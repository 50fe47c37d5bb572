use super::period::Period;
use crate::types::backlog::WorkItemFilters;

/// WIQL string literal; embedded quotes are doubled.
fn literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

fn literal_list(values: &[String]) -> String {
    values
        .iter()
        .map(|v| literal(v))
        .collect::<Vec<_>>()
        .join(", ")
}

fn non_empty(values: &Option<Vec<String>>) -> Option<&[String]> {
    values.as_deref().filter(|v| !v.is_empty())
}

pub fn filter_clauses(filters: &WorkItemFilters) -> Vec<String> {
    let mut clauses = Vec::new();

    if let Some(types) = non_empty(&filters.work_item_types) {
        clauses.push(format!("[System.WorkItemType] IN ({})", literal_list(types)));
    }
    if let Some(states) = non_empty(&filters.states) {
        clauses.push(format!("[System.State] IN ({})", literal_list(states)));
    }
    if let Some(areas) = non_empty(&filters.area_paths) {
        clauses.extend(
            areas
                .iter()
                .map(|area| format!("[System.AreaPath] UNDER {}", literal(area))),
        );
    }
    if let Some(iterations) = non_empty(&filters.iteration_paths) {
        clauses.extend(
            iterations
                .iter()
                .map(|it| format!("[System.IterationPath] UNDER {}", literal(it))),
        );
    }
    if let Some(users) = non_empty(&filters.assigned_to) {
        clauses.push(format!("[System.AssignedTo] IN ({})", literal_list(users)));
    }
    if let Some(tags) = filters.tags.as_deref().filter(|t| !t.is_empty()) {
        clauses.push(format!("[System.Tags] CONTAINS {}", literal(tags)));
    }

    clauses
}

/// Ids of the project's work items, newest first.
pub fn backlog_query(project: &str, period: &Period, filters: Option<&WorkItemFilters>) -> String {
    let mut clauses = vec![format!("[System.TeamProject] = {}", literal(project))];
    if let Some(start) = period.start {
        clauses.push(format!("[System.CreatedDate] >= '{}'", start.format("%Y-%m-%d")));
    }
    if let Some(end) = period.end {
        clauses.push(format!("[System.CreatedDate] <= '{}'", end.format("%Y-%m-%d")));
    }
    if let Some(filters) = filters {
        clauses.extend(filter_clauses(filters));
    }

    format!(
        "SELECT [System.Id] FROM WorkItems WHERE {} ORDER BY [System.CreatedDate] DESC",
        clauses.join(" AND ")
    )
}
