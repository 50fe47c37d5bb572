use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::{Deserialize, Serialize};
use thiserror::Error as ThisError;
use tracing::{error, warn};
use utoipa::ToSchema;

#[derive(Debug, ThisError)]
pub enum BacklogError {
    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("HTTP request error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A value that may come from the request or the environment came from neither.
    #[error("{0} must be provided in the request or set in the environment")]
    MissingParameter(&'static str),

    #[error("Invalid date format. Use YYYY-MM-DD")]
    InvalidDate,

    #[error("Invalid period: {0}")]
    InvalidPeriod(String),

    #[error("{0}")]
    Validation(String),

    #[error("Azure DevOps returned {status} while {context}: {body}")]
    UpstreamStatus {
        status: StatusCode,
        context: &'static str,
        body: String,
    },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl BacklogError {
    /// Connection failures and upstream 5xx are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            BacklogError::Reqwest(e) => e.is_connect() || e.is_timeout(),
            BacklogError::UpstreamStatus { status, .. } => status.is_server_error(),
            _ => false,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            BacklogError::MissingParameter(_)
            | BacklogError::InvalidDate
            | BacklogError::InvalidPeriod(_) => StatusCode::BAD_REQUEST,
            BacklogError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            BacklogError::UpstreamStatus { status, .. } => *status,
            BacklogError::Reqwest(_) => StatusCode::SERVICE_UNAVAILABLE,
            BacklogError::UrlParse(_) | BacklogError::Json(_) | BacklogError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for BacklogError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();
        let detail = match &self {
            BacklogError::Reqwest(e) => {
                warn!(error = %e, "Azure DevOps unreachable");
                format!("Connection error while calling Azure DevOps: {e}")
            }
            BacklogError::UpstreamStatus {
                status,
                context,
                body,
            } => {
                warn!(%status, context, "Azure DevOps rejected request");
                format!("Azure DevOps error while {context}: {body}")
            }
            BacklogError::UrlParse(_) | BacklogError::Json(_) | BacklogError::Internal(_) => {
                error!(error = %self, "internal error");
                format!("Internal server error: {self}")
            }
            other => other.to_string(),
        };
        (status, Json(ErrorDetail { detail })).into_response()
    }
}

/// Error body returned by every endpoint.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    pub detail: String,
}
