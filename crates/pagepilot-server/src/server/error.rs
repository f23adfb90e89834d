use super::dto::ErrorResponse;
use crate::config::ConfigError;
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use pagepilot_agent::{AgentError, ToolError};
use pagepilot_assistant::ProviderError;
use pagepilot_threadstore::ThreadStoreError;
use std::net::SocketAddr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind HTTP listener on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
    #[error("HTTP server error: {0}")]
    Serve(#[from] std::io::Error),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Agent(#[from] AgentError),
    #[error("failed to set up tool backend: {0}")]
    Collaborator(#[from] ToolError),
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error(transparent)]
    ThreadStore(#[from] ThreadStoreError),
}

/// Error body returned by API handlers.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: ErrorResponse,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            body: ErrorResponse {
                error: message.into(),
                thread_id: None,
                last_status: None,
            },
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthenticated(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn body(&self) -> &ErrorResponse {
        &self.body
    }
}

impl From<AgentError> for ApiError {
    fn from(error: AgentError) -> Self {
        let status = match &error {
            AgentError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AgentError::RunFailed { .. }
            | AgentError::ActionLimitExceeded { .. }
            | AgentError::EmptyRequiredAction { .. }
            | AgentError::Provider { .. } => StatusCode::BAD_GATEWAY,
            AgentError::PollTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            AgentError::Cancelled { .. } => StatusCode::SERVICE_UNAVAILABLE,
            AgentError::IncompleteToolOutputs { .. }
            | AgentError::ThreadStore(_)
            | AgentError::InvalidConfiguration(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let message = match &error {
            AgentError::Provider {
                operation, source, ..
            } => match source.status() {
                Some(code) => {
                    format!("assistant provider rejected {operation} with HTTP {code}")
                }
                None => format!("assistant provider unreachable during {operation}"),
            },
            AgentError::RunFailed {
                thread_id,
                run_id,
                status,
                ..
            } => format!("assistant run {run_id} on thread {thread_id} ended with status {status}"),
            AgentError::ThreadStore(_) => "conversation store unavailable".to_string(),
            other => other.to_string(),
        };

        Self {
            status,
            body: ErrorResponse {
                error: message,
                thread_id: error.thread_id().map(str::to_string),
                last_status: error.last_status().map(|status| status.as_str().to_string()),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}
