pub mod credential;
pub mod health;

use axum::{
    routing::{get, post, put},
    Router,
};

use crate::book::handlers as book;
use crate::chat::handlers as chat;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Credential selection
        .route(
            "/api/v1/credential",
            get(credential::handle_credential_status).put(credential::handle_select_key),
        )
        // Book API
        .route("/api/v1/books", post(book::handle_create_book))
        .route("/api/v1/books/status", get(book::handle_book_status))
        .route(
            "/api/v1/books/current",
            get(book::handle_get_book).delete(book::handle_discard_book),
        )
        .route("/api/v1/books/current/pdf", get(book::handle_download_pdf))
        // Chat API
        .route("/api/v1/chat", get(chat::handle_get_chat))
        .route("/api/v1/chat/input", put(chat::handle_set_input))
        .route("/api/v1/chat/messages", post(chat::handle_send_message))
        .with_state(state)
}
