//! Theme brainstorming chat: an append-only transcript with one reply in flight at most.
//!
//! The session shares nothing with the book workflow.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::RwLock;
use tracing::warn;

use crate::errors::AppError;
use crate::llm_client::GenerativeService;
use crate::models::chat::ChatMessage;

pub const GREETING: &str = "Hi there! I can help you think of cool themes for your coloring book. \
    What would you like to create today?";

/// Appended instead of surfacing a provider error.
pub const APOLOGY: &str = "Oops! My magic wand flickered. Can you try saying that again?";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    #[default]
    Ready,
    Waiting,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatSession {
    messages: Vec<ChatMessage>,
    state: SessionState,
    input: String,
}

impl Default for ChatSession {
    fn default() -> Self {
        Self::new()
    }
}

impl ChatSession {
    pub fn new() -> Self {
        Self {
            messages: vec![ChatMessage::assistant(GREETING)],
            state: SessionState::Ready,
            input: String::new(),
        }
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Replaces the input buffer. Accepted in every state.
    pub fn set_input(&mut self, text: impl Into<String>) {
        self.input = text.into();
    }

    /// Moves the buffer into the transcript and returns the transcript to send.
    pub fn begin_send(&mut self) -> Result<Vec<ChatMessage>, AppError> {
        if self.state == SessionState::Waiting {
            return Err(AppError::Conflict(
                "Sparky is still thinking. Your message is saved for later.".to_string(),
            ));
        }
        if self.input.trim().is_empty() {
            return Err(AppError::InvalidInput(
                "Type a message for Sparky first.".to_string(),
            ));
        }

        let content = std::mem::take(&mut self.input);
        self.messages.push(ChatMessage::user(content));
        self.state = SessionState::Waiting;
        Ok(self.messages.clone())
    }

    /// Appends the reply, or the fixed apology when the call failed.
    pub fn finish_send<E: std::fmt::Display>(&mut self, reply: Result<String, E>) {
        let content = match reply {
            Ok(text) => text,
            Err(e) => {
                warn!("Chat reply failed: {e}");
                APOLOGY.to_string()
            }
        };
        self.messages.push(ChatMessage::assistant(content));
        self.state = SessionState::Ready;
    }
}

/// Submits the buffered input and waits for the reply.
///
/// The provider call and the transcript update run on their own task, so a caller that
/// stops waiting (a dropped request) still leaves the session `Ready` with a reply or the
/// apology appended. The lock is released while the call is outstanding so the input
/// buffer stays writable and the `Waiting` state stays observable.
pub async fn send_message(
    session: Arc<RwLock<ChatSession>>,
    service: Arc<dyn GenerativeService>,
) -> Result<ChatSession, AppError> {
    let transcript = session.write().await.begin_send()?;

    let reply_task = tokio::spawn(async move {
        let reply = service.chat(&transcript).await;
        let mut session = session.write().await;
        session.finish_send(reply);
        session.clone()
    });

    reply_task
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Chat reply task failed: {e}")))
}
