use crate::api::azure_devops::AzureDevOpsApi;
use crate::config::Config;
use crate::error::BacklogError;
use crate::handlers::{backlog, docs, projects, root};
use axum::{
    Router,
    http::{HeaderValue, Request, Uri},
    routing::get,
};
use backon::ExponentialBuilder;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{Span, info_span, warn};

#[derive(Clone)]
pub struct BacklogState {
    pub client: reqwest::Client,
    pub config: Arc<Config>,
}

impl BacklogState {
    pub fn new(config: Config) -> Result<Self, BacklogError> {
        let mut builder = reqwest::Client::builder()
            .user_agent(concat!("devops-backlog/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(5))
            .timeout(config.request_timeout());
        if let Some(proxy_url) = config.proxy.as_ref() {
            builder = builder.proxy(reqwest::Proxy::all(proxy_url.as_str())?);
        }
        let client = builder.build()?;
        Ok(Self {
            client,
            config: Arc::new(config),
        })
    }

    pub fn retry_policy(&self) -> ExponentialBuilder {
        let min_delay = Duration::from_millis(self.config.retry_min_delay_ms);
        ExponentialBuilder::default()
            .with_min_delay(min_delay)
            .with_max_delay(min_delay.max(Duration::from_secs(3)))
            .with_max_times(self.config.retry_max_times)
            .with_jitter()
    }

    /// Client for one organization, authenticated with `pat`.
    pub fn api(&self, organization: &str, pat: &str) -> AzureDevOpsApi {
        AzureDevOpsApi::new(
            self.client.clone(),
            self.config.azure_devops_api_url.clone(),
            organization,
            pat,
            self.retry_policy(),
        )
    }
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() || origins.iter().any(|o| o == "*") {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| {
            HeaderValue::from_str(origin)
                .inspect_err(|e| warn!(origin = %origin, error = %e, "ignoring invalid CORS origin"))
                .ok()
        })
        .collect();
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}

/// Path only; query strings can carry a PAT.
fn loggable_path(uri: &Uri) -> &str {
    uri.path()
}

fn request_span<B>(req: &Request<B>) -> Span {
    info_span!(
        "request",
        method = %req.method(),
        path = %loggable_path(req.uri())
    )
}

pub fn backlog_router(state: BacklogState) -> Router {
    let cors = cors_layer(&state.config.cors_origins());

    Router::new()
        .route("/", get(root::root))
        .route("/health", get(root::health))
        .route(
            "/backlog",
            get(backlog::get_backlog).post(backlog::post_backlog),
        )
        .route("/projects", get(projects::list_projects))
        .route("/openapi.json", get(docs::openapi_json))
        .route("/docs", get(docs::docs_page))
        .layer(TraceLayer::new_for_http().make_span_with(request_span))
        .layer(cors)
        .with_state(state)
}
