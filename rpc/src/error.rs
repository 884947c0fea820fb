//! RPC error types.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use perkpass_redemption::{OrchestratorError, RegistryError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RpcError {
    #[error("terminal not found: {0}")]
    TerminalNotFound(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("{0}")]
    Protocol(#[from] OrchestratorError),

    #[error("{0}")]
    Registry(#[from] RegistryError),

    #[error("metrics endpoint is disabled")]
    MetricsDisabled,

    #[error("store error: {0}")]
    Store(String),

    #[error("server error: {0}")]
    Server(String),
}

impl RpcError {
    /// - Unknown terminal or disabled endpoint: 404
    /// - Malformed ids or parameters: 400
    /// - Protocol misuse (pending scan, nothing pending, rebinding): 409
    /// - Store failure: 503, retryable
    /// - Anything else: 500
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::TerminalNotFound(_) | Self::MetricsDisabled => StatusCode::NOT_FOUND,
            Self::InvalidRequest(_) | Self::Registry(RegistryError::InvalidTerminalId) => {
                StatusCode::BAD_REQUEST
            }
            Self::Protocol(_) | Self::Registry(RegistryError::BoundToOtherBusiness { .. }) => {
                StatusCode::CONFLICT
            }
            Self::Store(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Server(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<perkpass_store::StoreError> for RpcError {
    fn from(e: perkpass_store::StoreError) -> Self {
        RpcError::Store(e.to_string())
    }
}

impl IntoResponse for RpcError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::warn!(status = status.as_u16(), error = %self, "request failed");
        }
        let body = Json(serde_json::json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}
