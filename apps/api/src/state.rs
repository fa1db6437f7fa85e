use std::sync::Arc;

use tokio::sync::RwLock;

use crate::book::workflow::BookWorkflow;
use crate::chat::session::ChatSession;
use crate::credentials::KeyStore;
use crate::llm_client::GenerativeService;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Generative service used by the chat; the workflow holds its own handle.
    pub llm: Arc<dyn GenerativeService>,
    pub keys: Arc<KeyStore>,
    pub workflow: Arc<BookWorkflow>,
    /// Single brainstorming conversation. Lives for the process lifetime only.
    pub chat: Arc<RwLock<ChatSession>>,
}
