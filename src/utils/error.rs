//! Agent error types and handling
//!
//! Every RPC failure surfaces to the driver as a consistent JSON error body
//! with an appropriate status code. There is no agent-side retry; the driver
//! decides what a failure means for the run.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

/// Agent RPC error types
#[derive(Debug, Error)]
pub enum AgentError {
    /// Invalid request (400)
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Repository pull or checkout failure (500)
    #[error("Git error: {0}")]
    Git(String),

    /// Configuration tool failure: non-zero exit, timeout (500)
    #[error("Puppet run error: {0}")]
    PuppetRun(String),

    /// Report file missing or malformed (500)
    #[error("Report error: {0}")]
    Report(String),

    /// Anything else (500)
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error response body
#[derive(Serialize, Debug)]
pub struct ErrorResponse {
    /// Error type identifier
    pub error: String,
    /// Human-readable error message
    pub message: String,
}

impl IntoResponse for AgentError {
    fn into_response(self) -> Response {
        let (status, error_type) = match &self {
            AgentError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            AgentError::Git(_) => (StatusCode::INTERNAL_SERVER_ERROR, "git_error"),
            AgentError::PuppetRun(_) => (StatusCode::INTERNAL_SERVER_ERROR, "puppet_run_error"),
            AgentError::Report(_) => (StatusCode::INTERNAL_SERVER_ERROR, "report_error"),
            AgentError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        };

        if status.is_server_error() {
            error!(error = %self, error_type = error_type, "RPC error");
        }

        let body = ErrorResponse {
            error: error_type.to_string(),
            message: self.to_string(),
        };

        (status, Json(body)).into_response()
    }
}

impl From<anyhow::Error> for AgentError {
    fn from(err: anyhow::Error) -> Self {
        AgentError::Internal(format!("{err:#}"))
    }
}

/// Result type alias for agent handlers
pub type AgentResult<T> = Result<T, AgentError>;
