//! Book Studio: the single in-memory home of the current book and its run status.
//!
//! At most one book exists at a time, and at most one workflow run is active. Each run
//! carries a token; once a run is superseded (discarded or replaced), every update it
//! attempts is ignored so late results never reach the results view.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::book::ColoringBook;

/// Tags one workflow run. Updates carrying a stale token are dropped.
pub type RunToken = Uuid;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum WorkflowState {
    #[default]
    Idle,
    ValidatingInput,
    EnsuringCredential,
    PlanningScenes,
    RenderingCover,
    /// `page` is 1-based.
    RenderingPages {
        page: usize,
        total: usize,
    },
    Complete,
    Failed,
}

/// Snapshot served to the presentation layer.
#[derive(Debug, Clone, Serialize)]
pub struct StudioStatus {
    pub run_id: Option<RunToken>,
    pub state: WorkflowState,
    pub is_generating: bool,
    pub progress: String,
    pub error: Option<String>,
    pub has_book: bool,
    pub started_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Default)]
struct StudioInner {
    active_run: Option<RunToken>,
    state: WorkflowState,
    progress: String,
    error: Option<String>,
    book: Option<ColoringBook>,
    started_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Default)]
pub struct BookStudio {
    inner: RwLock<StudioInner>,
}

impl BookStudio {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a new run. Fails with `Conflict` while another run is active.
    /// Any previous book and error banner are cleared.
    pub async fn begin(&self) -> Result<RunToken, AppError> {
        let mut inner = self.inner.write().await;
        if inner.active_run.is_some() {
            return Err(AppError::Conflict(
                "A book is already being drawn. Please wait for it to finish.".to_string(),
            ));
        }

        let token = Uuid::new_v4();
        inner.active_run = Some(token);
        inner.state = WorkflowState::ValidatingInput;
        inner.progress.clear();
        inner.error = None;
        inner.book = None;
        inner.started_at = Some(Utc::now());
        Ok(token)
    }

    /// Closes a run whose input failed validation. The studio returns to `Idle`
    /// with the message on the banner. Returns false if the run has been superseded.
    pub async fn reject(&self, token: RunToken, message: String) -> bool {
        let mut inner = self.inner.write().await;
        if inner.active_run != Some(token) {
            return false;
        }
        inner.active_run = None;
        inner.state = WorkflowState::Idle;
        inner.error = Some(message);
        inner.started_at = None;
        true
    }

    /// Moves the run to `state`, replacing the progress label when one is given.
    /// Returns false if the run has been superseded.
    pub async fn advance(&self, token: RunToken, state: WorkflowState, label: Option<&str>) -> bool {
        let mut inner = self.inner.write().await;
        if inner.active_run != Some(token) {
            return false;
        }
        inner.state = state;
        if let Some(label) = label {
            inner.progress = label.to_string();
        }
        true
    }

    /// Publishes the finished book and closes the run.
    pub async fn complete(&self, token: RunToken, book: ColoringBook, label: &str) -> bool {
        let mut inner = self.inner.write().await;
        if inner.active_run != Some(token) {
            return false;
        }
        inner.active_run = None;
        inner.state = WorkflowState::Complete;
        inner.progress = label.to_string();
        inner.book = Some(book);
        true
    }

    /// Closes the run with a user-facing error. Nothing partial is kept.
    pub async fn fail(&self, token: RunToken, message: String) -> bool {
        let mut inner = self.inner.write().await;
        if inner.active_run != Some(token) {
            return false;
        }
        inner.active_run = None;
        inner.state = WorkflowState::Failed;
        inner.progress.clear();
        inner.error = Some(message);
        inner.book = None;
        true
    }

    /// Drops the current book and supersedes any active run, returning to `Idle`.
    pub async fn discard(&self) {
        let mut inner = self.inner.write().await;
        if let Some(token) = inner.active_run.take() {
            warn!("Run {token} superseded; its results will be discarded");
        }
        if inner.book.take().is_some() {
            info!("Coloring book discarded");
        }
        inner.state = WorkflowState::Idle;
        inner.progress.clear();
        inner.error = None;
        inner.started_at = None;
    }

    pub async fn status(&self) -> StudioStatus {
        let inner = self.inner.read().await;
        StudioStatus {
            run_id: inner.active_run,
            state: inner.state,
            is_generating: inner.active_run.is_some(),
            progress: inner.progress.clone(),
            error: inner.error.clone(),
            has_book: inner.book.is_some(),
            started_at: inner.started_at,
        }
    }

    pub async fn current_book(&self) -> Option<ColoringBook> {
        self.inner.read().await.book.clone()
    }
}
