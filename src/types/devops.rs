//! Azure DevOps REST payloads, deserialized as loosely as the service allows.

use serde::Deserialize;
use serde_json::{Map, Value};

/// Result of `POST _apis/wit/wiql`.
#[derive(Debug, Deserialize)]
pub struct WiqlResult {
    #[serde(rename = "workItems", default)]
    pub work_items: Vec<WorkItemReference>,
}

#[derive(Debug, Deserialize)]
pub struct WorkItemReference {
    pub id: u64,
    #[serde(default)]
    pub url: Option<String>,
}

/// The `{ "count": n, "value": [...] }` envelope used by list endpoints.
#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct ValueList<T> {
    #[serde(default)]
    pub count: Option<u64>,
    #[serde(default)]
    pub value: Vec<T>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawWorkItem {
    pub id: u64,
    #[serde(default)]
    pub fields: Map<String, Value>,
    #[serde(default)]
    pub relations: Option<Vec<RawRelation>>,
}

impl RawWorkItem {
    pub fn str_field(&self, name: &str) -> Option<String> {
        self.fields
            .get(name)
            .and_then(Value::as_str)
            .map(str::to_string)
    }

    pub fn f64_field(&self, name: &str) -> Option<f64> {
        self.fields.get(name).and_then(Value::as_f64)
    }

    /// Identity fields are objects; only the display name is kept.
    pub fn display_name(&self, name: &str) -> Option<String> {
        self.fields
            .get(name)
            .and_then(|v| v.get("displayName"))
            .and_then(Value::as_str)
            .map(str::to_string)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawRelation {
    #[serde(default)]
    pub rel: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawProject {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub revision: Option<u64>,
    #[serde(default)]
    pub visibility: Option<String>,
    #[serde(default)]
    pub last_update_time: Option<String>,
}
