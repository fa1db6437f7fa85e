//! Request extractors that report failures through `AppError`.

use axum::extract::{rejection::JsonRejection, FromRequest};

use crate::errors::AppError;

/// Copy shown when a request body cannot be read, e.g. an unknown resolution.
pub const MALFORMED_REQUEST_MESSAGE: &str =
    "That request didn't look quite right. Please check the form and try again.";

/// `axum::Json`, but a bad body becomes `AppError::InvalidInput` and keeps the
/// `{error:{code,message}}` envelope.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct AppJson<T>(pub T);

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        tracing::warn!("Rejected request body: {}", rejection.body_text());
        AppError::InvalidInput(MALFORMED_REQUEST_MESSAGE.to_string())
    }
}
