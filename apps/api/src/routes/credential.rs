use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::credentials::CredentialProvider;
use crate::errors::AppError;
use crate::extract::AppJson;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SelectKeyRequest {
    pub api_key: String,
}

#[derive(Debug, Serialize)]
pub struct CredentialStatus {
    pub has_credential: bool,
    pub selection_requested: bool,
}

/// GET /api/v1/credential
pub async fn handle_credential_status(State(state): State<AppState>) -> Json<CredentialStatus> {
    Json(CredentialStatus {
        has_credential: state.keys.has_credential().await,
        selection_requested: state.keys.selection_requested(),
    })
}

/// PUT /api/v1/credential
///
/// Completes a key selection. The key is never echoed back.
pub async fn handle_select_key(
    State(state): State<AppState>,
    AppJson(request): AppJson<SelectKeyRequest>,
) -> Result<Json<CredentialStatus>, AppError> {
    if !state.keys.select_key(&request.api_key).await {
        return Err(AppError::InvalidInput(
            "That key looks empty. Please paste your API key.".to_string(),
        ));
    }
    Ok(Json(CredentialStatus {
        has_credential: true,
        selection_requested: state.keys.selection_requested(),
    }))
}
