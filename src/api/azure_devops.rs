use crate::config::{API_VERSION, WIQL_TOP};
use crate::error::BacklogError;
use crate::types::devops::{RawProject, RawWorkItem, ValueList, WiqlResult};
use backon::{ExponentialBuilder, Retryable};
use base64::Engine;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde_json::json;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};
use url::Url;

const CONTINUATION_HEADER: &str = "x-ms-continuationtoken";

/// `Authorization` value for a PAT: basic auth with an empty user name.
pub fn basic_auth_header(pat: &str) -> String {
    let encoded = base64::engine::general_purpose::STANDARD.encode(format!(":{pat}"));
    format!("Basic {encoded}")
}

/// Azure DevOps REST client bound to one organization and credential.
#[derive(Clone)]
pub struct AzureDevOpsApi {
    client: reqwest::Client,
    base_url: Url,
    organization: String,
    auth: String,
    retry_policy: ExponentialBuilder,
}

impl AzureDevOpsApi {
    pub fn new(
        client: reqwest::Client,
        base_url: Url,
        organization: impl Into<String>,
        pat: &str,
        retry_policy: ExponentialBuilder,
    ) -> Self {
        Self {
            client,
            base_url,
            organization: organization.into(),
            auth: basic_auth_header(pat),
            retry_policy,
        }
    }

    pub fn organization(&self) -> &str {
        &self.organization
    }

    /// `{base}/{organization}/{segments...}` with every segment percent-encoded.
    pub fn endpoint(&self, segments: &[&str]) -> Result<Url, BacklogError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                BacklogError::Internal(format!("base URL {} cannot carry a path", self.base_url))
            })?
            .pop_if_empty()
            .push(&self.organization)
            .extend(segments);
        Ok(url)
    }

    /// Browser link for a work item.
    pub fn work_item_web_url(&self, project: &str, id: u64) -> Result<Url, BacklogError> {
        self.endpoint(&[project, "_workitems", "edit", &id.to_string()])
    }

    /// Send with retries on transient failures; any non-success status is an error.
    async fn send<F>(
        &self,
        context: &'static str,
        build: F,
    ) -> Result<reqwest::Response, BacklogError>
    where
        F: Fn() -> reqwest::RequestBuilder,
    {
        let resp = (|| async {
            let resp = build()
                .header(AUTHORIZATION, &self.auth)
                .header(CONTENT_TYPE, "application/json")
                .send()
                .await?;
            if resp.status().is_server_error() {
                let status = resp.status();
                let body = resp.text().await.unwrap_or_default();
                return Err(BacklogError::UpstreamStatus {
                    status,
                    context,
                    body,
                });
            }
            Ok(resp)
        })
        .retry(self.retry_policy.clone())
        .when(|e: &BacklogError| e.is_retryable())
        .notify(|err, dur: Duration| {
            warn!(
                org = %self.organization,
                context,
                "Azure DevOps call failed ({}), retrying in {:?}",
                err,
                dur
            );
        })
        .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            error!(org = %self.organization, %status, context, body = %body, "Azure DevOps error");
            return Err(BacklogError::UpstreamStatus {
                status,
                context,
                body,
            });
        }
        Ok(resp)
    }

    /// Run a WIQL query and return the matching ids in query order.
    pub async fn run_wiql(&self, project: &str, query: &str) -> Result<Vec<u64>, BacklogError> {
        let started = Instant::now();
        let url = self.endpoint(&[project, "_apis", "wit", "wiql"])?;
        let body = json!({ "query": query });
        let top = WIQL_TOP.to_string();
        debug!(project, wiql_len = query.len(), "WIQL query");

        let resp = self
            .send("querying work items", || {
                self.client
                    .post(url.clone())
                    .query(&[("api-version", API_VERSION), ("$top", top.as_str())])
                    .json(&body)
            })
            .await?;
        let result: WiqlResult = serde_json::from_slice(&resp.bytes().await?)?;
        let ids: Vec<u64> = result.work_items.into_iter().map(|w| w.id).collect();

        info!(
            org = %self.organization,
            project,
            ids = ids.len(),
            duration_ms = started.elapsed().as_millis() as u64,
            "WIQL query executed"
        );
        Ok(ids)
    }

    /// Fetch one batch of work items with their relations.
    pub async fn work_items(
        &self,
        project: &str,
        ids: &[u64],
    ) -> Result<Vec<RawWorkItem>, BacklogError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let url = self.endpoint(&[project, "_apis", "wit", "workitems"])?;
        let ids = ids
            .iter()
            .map(u64::to_string)
            .collect::<Vec<_>>()
            .join(",");

        let resp = self
            .send("fetching work item details", || {
                self.client.get(url.clone()).query(&[
                    ("ids", ids.as_str()),
                    ("api-version", API_VERSION),
                    ("$expand", "relations"),
                ])
            })
            .await?;
        let list: ValueList<RawWorkItem> = serde_json::from_slice(&resp.bytes().await?)?;
        Ok(list.value)
    }

    /// One page of the organization's projects plus the next continuation token.
    pub async fn projects(
        &self,
        top: u32,
        skip: u32,
        continuation_token: Option<&str>,
    ) -> Result<(ValueList<RawProject>, Option<String>), BacklogError> {
        let url = self.endpoint(&["_apis", "projects"])?;
        let mut params = vec![
            ("api-version", API_VERSION.to_string()),
            ("$top", top.to_string()),
            ("$skip", skip.to_string()),
        ];
        if let Some(token) = continuation_token {
            params.push(("continuationToken", token.to_string()));
        }

        let resp = self
            .send("listing projects", || {
                self.client.get(url.clone()).query(&params)
            })
            .await?;
        let next = resp
            .headers()
            .get(CONTINUATION_HEADER)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .map(str::to_string);
        let list: ValueList<RawProject> = serde_json::from_slice(&resp.bytes().await?)?;
        Ok((list, next))
    }
}
