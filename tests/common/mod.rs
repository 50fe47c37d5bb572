#![allow(dead_code)]

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode},
};
use devops_backlog::{BacklogState, Config, backlog_router};
use serde_json::Value;
use tower::ServiceExt;
use url::Url;

pub const ORG: &str = "minha-org";
pub const PROJECT: &str = "meu-projeto";
pub const ENV_PAT: &str = "env-pat";

/// Config pointing at a mock Azure DevOps, with retries disabled.
pub fn config(base_url: &str) -> Config {
    Config {
        azure_devops_api_url: Url::parse(base_url).expect("mock server url"),
        azure_devops_pat: Some(ENV_PAT.to_string()),
        azure_devops_organization: ORG.to_string(),
        retry_max_times: 0,
        retry_min_delay_ms: 1,
        ..Config::default()
    }
}

pub fn app(config: Config) -> Router {
    let state = BacklogState::new(config).expect("failed to build state");
    backlog_router(state)
}

pub async fn call(app: &Router, req: Request<Body>) -> (StatusCode, Vec<u8>) {
    let resp = app.clone().oneshot(req).await.expect("request failed");
    let status = resp.status();
    let body = to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("failed to read response body");
    (status, body.to_vec())
}

pub async fn call_json(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let (status, body) = call(app, req).await;
    let value = serde_json::from_slice(&body).expect("response body was not JSON");
    (status, value)
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .expect("failed to build request")
}

pub fn post_json(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .expect("failed to build request")
}
