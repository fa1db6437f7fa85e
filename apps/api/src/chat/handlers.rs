//! Axum route handlers for the Chat API.

use axum::{extract::State, Json};
use serde::Deserialize;

use crate::chat::session::{send_message, ChatSession};
use crate::errors::AppError;
use crate::extract::AppJson;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ChatInputRequest {
    pub content: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct SendMessageRequest {
    /// Replaces the buffer before sending. Omit to send what is already buffered.
    pub content: Option<String>,
}

/// GET /api/v1/chat
pub async fn handle_get_chat(State(state): State<AppState>) -> Json<ChatSession> {
    Json(state.chat.read().await.clone())
}

/// PUT /api/v1/chat/input
///
/// Accepted even while a reply is pending; the text waits in the buffer.
pub async fn handle_set_input(
    State(state): State<AppState>,
    AppJson(request): AppJson<ChatInputRequest>,
) -> Json<ChatSession> {
    let mut session = state.chat.write().await;
    session.set_input(request.content);
    Json(session.clone())
}

/// POST /api/v1/chat/messages
///
/// Sends the buffer and returns the transcript once the assistant has answered.
pub async fn handle_send_message(
    State(state): State<AppState>,
    AppJson(request): AppJson<SendMessageRequest>,
) -> Result<Json<ChatSession>, AppError> {
    if let Some(content) = request.content {
        state.chat.write().await.set_input(content);
    }
    let session = send_message(state.chat.clone(), state.llm.clone()).await?;
    Ok(Json(session))
}
