//! Error types for the server.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use portcullis_config::ConfigError;
use portcullis_oidc::OidcError;
use serde::Serialize;
use thiserror::Error;

use crate::routing::RouteError;

/// Server error type.
#[derive(Debug, Error)]
pub enum ServerError {
    /// No valid session.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// No route matched the request path.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Bad request.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Request body larger than the configured limit.
    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    /// Login flow failure.
    #[error(transparent)]
    Auth(#[from] OidcError),

    /// Upstream unreachable or failed mid-response.
    #[error("Proxy error: {0}")]
    Proxy(String),

    /// Route table could not be built.
    #[error(transparent)]
    Route(#[from] RouteError),

    /// Gateway settings rejected at construction.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type for server operations.
pub type Result<T> = std::result::Result<T, ServerError>;

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling.
    pub code: String,
    /// Human-readable error message.
    pub message: String,
}

impl ServerError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ServerError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "unauthorized"),
            ServerError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            ServerError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            ServerError::PayloadTooLarge(_) => (StatusCode::PAYLOAD_TOO_LARGE, "payload_too_large"),
            ServerError::Auth(e) if e.is_client_error() => (StatusCode::BAD_REQUEST, "bad_request"),
            ServerError::Auth(_) => (StatusCode::INTERNAL_SERVER_ERROR, "auth_error"),
            ServerError::Proxy(_) => (StatusCode::BAD_GATEWAY, "proxy_error"),
            ServerError::Route(_) | ServerError::Config(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "config_error")
            }
            ServerError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        }
    }

    /// HTTP status this error renders as.
    pub fn status(&self) -> StatusCode {
        self.status_and_code().0
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        let message = self.to_string();

        if status.is_server_error() {
            tracing::error!(status = %status, code, error = %message, "Server error");
        } else {
            tracing::warn!(status = %status, code, error = %message, "Client error");
        }

        let body = ErrorResponse {
            code: code.to_string(),
            message,
        };

        (status, Json(body)).into_response()
    }
}
