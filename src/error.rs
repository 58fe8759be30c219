//! Error type shared by services, gateways and HTTP handlers.

use crate::transport::http::types::ApiResponse;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Error, Debug)]
pub enum AppError {
    /// Request body or parameter failed validation
    #[error("{0}")]
    Validation(String),

    /// No session, or the BaaS rejected the token
    #[error("Unauthorized")]
    Unauthorized,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    /// Webhook signature missing or wrong
    #[error("Invalid webhook signature")]
    InvalidSignature,

    /// Upstream gateway or BaaS returned an error payload
    #[error("{provider} error: {message}")]
    Gateway {
        provider: &'static str,
        message: String,
    },

    #[error("{0} is not configured")]
    GatewayNotConfigured(&'static str),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn gateway(provider: &'static str, message: impl Into<String>) -> Self {
        AppError::Gateway {
            provider,
            message: message.into(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::Gateway { .. } => StatusCode::BAD_REQUEST,
            AppError::Unauthorized | AppError::InvalidSignature => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::GatewayNotConfigured(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Database(_)
            | AppError::Http(_)
            | AppError::Config(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        (
            status,
            Json(ApiResponse {
                success: false,
                data: None,
                error: Some(self.to_string()),
            }),
        )
            .into_response()
    }
}
