use figment::{
    Figment,
    providers::{Env, Serialized},
};
use serde::{Deserialize, Deserializer, Serialize};
use std::time::Duration;
use thiserror::Error as ThisError;
use url::Url;

use crate::error::BacklogError;

/// Azure DevOps REST API version used by every upstream call.
pub const API_VERSION: &str = "7.0";

/// Upper bound of ids returned by a single WIQL query.
pub const WIQL_TOP: u32 = 20_000;

/// Work items per details request; Azure DevOps rejects larger batches.
pub const DETAILS_BATCH_SIZE: usize = 200;

/// Details batches in flight at once.
pub const DETAILS_CONCURRENCY: usize = 4;

const ENV_KEYS: &[&str] = &[
    "azure_devops_pat",
    "azure_devops_organization",
    "azure_devops_project",
    "azure_devops_api_url",
    "api_host",
    "api_port",
    "workers",
    "cors_origins",
    "loglevel",
    "proxy",
    "request_timeout_secs",
    "retry_max_times",
    "retry_min_delay_ms",
];

#[derive(Debug, ThisError)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] Box<figment::Error>),

    #[error("required environment variables are not set: {}", .0.join(", "))]
    MissingVariables(Vec<&'static str>),
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    #[serde(deserialize_with = "optional_string_like")]
    pub azure_devops_pat: Option<String>,
    #[serde(deserialize_with = "string_like")]
    pub azure_devops_organization: String,
    #[serde(deserialize_with = "string_like")]
    pub azure_devops_project: String,
    pub azure_devops_api_url: Url,
    #[serde(deserialize_with = "string_like")]
    pub api_host: String,
    pub api_port: u16,
    /// Runtime worker threads; unset means one per core.
    pub workers: Option<usize>,
    #[serde(deserialize_with = "string_like")]
    pub cors_origins: String,
    #[serde(deserialize_with = "string_like")]
    pub loglevel: String,
    pub proxy: Option<Url>,
    pub request_timeout_secs: u64,
    pub retry_max_times: usize,
    pub retry_min_delay_ms: u64,
}

/// Environment values are parsed as typed data; a digit-only organization
/// or PAT arrives as a number and is turned back into text.
#[derive(Deserialize)]
#[serde(untagged)]
enum StringLike {
    Text(String),
    Unsigned(u64),
    Signed(i64),
    Float(f64),
    Bool(bool),
}

impl From<StringLike> for String {
    fn from(value: StringLike) -> Self {
        match value {
            StringLike::Text(s) => s,
            StringLike::Unsigned(n) => n.to_string(),
            StringLike::Signed(n) => n.to_string(),
            StringLike::Float(n) => n.to_string(),
            StringLike::Bool(b) => b.to_string(),
        }
    }
}

fn string_like<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    StringLike::deserialize(deserializer).map(String::from)
}

fn optional_string_like<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    Option::<StringLike>::deserialize(deserializer).map(|value| value.map(String::from))
}

impl Default for Config {
    fn default() -> Self {
        Self {
            azure_devops_pat: None,
            azure_devops_organization: String::new(),
            azure_devops_project: String::new(),
            azure_devops_api_url: Url::parse("https://dev.azure.com")
                .expect("static Azure DevOps URL is valid"),
            api_host: "0.0.0.0".to_string(),
            api_port: 8000,
            workers: None,
            cors_origins: "*".to_string(),
            loglevel: "info".to_string(),
            proxy: None,
            request_timeout_secs: 30,
            retry_max_times: 2,
            retry_min_delay_ms: 500,
        }
    }
}

impl Config {
    /// Defaults overlaid with the process environment.
    pub fn figment() -> Figment {
        Figment::from(Serialized::defaults(Config::default())).merge(Env::raw().only(ENV_KEYS))
    }

    pub fn load() -> Result<Self, ConfigError> {
        Self::from_figment(Self::figment())
    }

    pub fn from_figment(figment: Figment) -> Result<Self, ConfigError> {
        figment.extract().map_err(|e| ConfigError::Load(Box::new(e)))
    }

    /// Startup check; the service must not run without a PAT.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut missing = Vec::new();
        if self.default_pat().is_empty() {
            missing.push("AZURE_DEVOPS_PAT");
        }
        if missing.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::MissingVariables(missing))
        }
    }

    pub fn default_pat(&self) -> &str {
        self.azure_devops_pat.as_deref().unwrap_or_default().trim()
    }

    pub fn cors_origins(&self) -> Vec<String> {
        self.cors_origins
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(str::to_string)
            .collect()
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.api_host, self.api_port)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }
}

/// Pick the request value, else the configured default, else fail naming `name`.
pub fn resolve_param(
    param: Option<&str>,
    default: &str,
    name: &'static str,
) -> Result<String, BacklogError> {
    param
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .or_else(|| Some(default.trim()).filter(|v| !v.is_empty()))
        .map(str::to_string)
        .ok_or(BacklogError::MissingParameter(name))
}
