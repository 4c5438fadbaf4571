//! API error handling
//!
//! Author: hephaex@gmail.com

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use newsycle_core::NewsycleError;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// API error response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    /// Error code
    pub code: String,
    /// Human-readable message
    pub message: String,
    /// Additional details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new("BAD_REQUEST", message)
    }

    pub fn internal_error() -> Self {
        Self::new("INTERNAL_ERROR", "Internal server error")
    }
}

/// Application error type
#[derive(Debug)]
pub enum AppError {
    BadRequest(String),
    /// A dependency (news search, model provider) failed
    Upstream { code: &'static str, message: String },
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, ApiError::bad_request(msg)),
            AppError::Upstream { code, message } => (
                StatusCode::BAD_GATEWAY,
                ApiError::new(code, "Upstream service failed").with_details(message),
            ),
            AppError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ApiError::internal_error().with_details(msg),
            ),
        };

        if status.is_server_error() {
            tracing::error!(code = %error.code, details = ?error.details, "Request failed");
        }

        (status, Json(error)).into_response()
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<NewsycleError> for AppError {
    fn from(err: NewsycleError) -> Self {
        match err {
            NewsycleError::ValidationError(msg) => AppError::BadRequest(msg),
            NewsycleError::FetchError(message) => AppError::Upstream {
                code: "FETCH_ERROR",
                message,
            },
            NewsycleError::ExtractionError(message) => AppError::Upstream {
                code: "EXTRACTION_ERROR",
                message,
            },
            NewsycleError::EmbeddingError(message) => AppError::Upstream {
                code: "EMBEDDING_ERROR",
                message,
            },
            NewsycleError::LlmError(message) => AppError::Upstream {
                code: "LLM_ERROR",
                message,
            },
            NewsycleError::ConfigError(msg) => {
                AppError::Internal(format!("Configuration error: {msg}"))
            }
            NewsycleError::Other(err) => AppError::Internal(err.to_string()),
        }
    }
}
