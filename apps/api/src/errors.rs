use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::llm_client::LlmError;

/// Copy shown when a provider failure carries no usable message.
pub const GENERIC_FAILURE_MESSAGE: &str = "Oh no! A spell went wrong. Please try again.";

/// Copy shown after an authentication failure has routed to key selection.
pub const SELECT_KEY_MESSAGE: &str = "Please select your API key to continue the magic.";

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Authentication required")]
    AuthenticationRequired,

    #[error("No image produced: {0}")]
    NoImageProduced(String),

    #[error("Provider failure: {}", .message.as_deref().unwrap_or("<no message>"))]
    Provider { message: Option<String> },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Run superseded by a newer request")]
    Superseded,

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Friendly text for the error banner. Technical detail never appears here.
    pub fn user_message(&self) -> String {
        match self {
            AppError::InvalidInput(msg)
            | AppError::NoImageProduced(msg)
            | AppError::NotFound(msg)
            | AppError::Conflict(msg) => msg.clone(),
            AppError::AuthenticationRequired => SELECT_KEY_MESSAGE.to_string(),
            AppError::Provider { message } => message
                .as_deref()
                .map(str::trim)
                .filter(|m| !m.is_empty())
                .unwrap_or(GENERIC_FAILURE_MESSAGE)
                .to_string(),
            AppError::Superseded => "This book was replaced by a newer request.".to_string(),
            AppError::Internal(_) => GENERIC_FAILURE_MESSAGE.to_string(),
        }
    }

    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::InvalidInput(_) => (StatusCode::BAD_REQUEST, "INVALID_INPUT"),
            AppError::AuthenticationRequired => {
                (StatusCode::UNAUTHORIZED, "AUTHENTICATION_REQUIRED")
            }
            AppError::NoImageProduced(_) => (StatusCode::BAD_GATEWAY, "NO_IMAGE_PRODUCED"),
            AppError::Provider { .. } => (StatusCode::BAD_GATEWAY, "PROVIDER_ERROR"),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            AppError::Conflict(_) => (StatusCode::CONFLICT, "CONFLICT"),
            AppError::Superseded => (StatusCode::CONFLICT, "SUPERSEDED"),
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }
}

impl From<LlmError> for AppError {
    fn from(err: LlmError) -> Self {
        match err {
            LlmError::AuthenticationRequired => AppError::AuthenticationRequired,
            LlmError::NoImageProduced(msg) => AppError::NoImageProduced(msg),
            LlmError::Api { message, .. } => AppError::Provider {
                message: Some(message),
            },
            other => {
                tracing::warn!("Provider call failed without a user-facing message: {other}");
                AppError::Provider { message: None }
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        match &self {
            AppError::Internal(e) => tracing::error!("Internal error: {e:?}"),
            AppError::Provider { .. } | AppError::NoImageProduced(_) => {
                tracing::error!("Provider error: {self}")
            }
            _ => {}
        }

        let body = Json(json!({
            "error": {
                "code": code,
                "message": self.user_message()
            }
        }));

        (status, body).into_response()
    }
}
