//! Axum route handlers for the Book API.

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use bytes::Bytes;
use tracing::info;

use crate::book::export::{content_disposition, pdf_file_name, render_pdf};
use crate::book::studio::StudioStatus;
use crate::errors::AppError;
use crate::extract::AppJson;
use crate::models::book::{BookInput, ColoringBook};
use crate::state::AppState;

/// POST /api/v1/books
///
/// Validates the form and starts a workflow run in the background.
/// Poll `/api/v1/books/status` for progress.
pub async fn handle_create_book(
    State(state): State<AppState>,
    AppJson(input): AppJson<BookInput>,
) -> Result<(StatusCode, Json<StudioStatus>), AppError> {
    let run = state.workflow.start(input).await?;

    let workflow = state.workflow.clone();
    tokio::spawn(async move {
        // Outcome is recorded in the studio; nothing to return here.
        let _ = workflow.run(run).await;
    });

    let status = state.workflow.studio().status().await;
    Ok((StatusCode::ACCEPTED, Json(status)))
}

/// GET /api/v1/books/status
pub async fn handle_book_status(State(state): State<AppState>) -> Json<StudioStatus> {
    Json(state.workflow.studio().status().await)
}

/// GET /api/v1/books/current
pub async fn handle_get_book(
    State(state): State<AppState>,
) -> Result<Json<ColoringBook>, AppError> {
    current_book(&state).await.map(Json)
}

/// GET /api/v1/books/current/pdf
///
/// Renders the current book on the blocking pool and serves it as a download.
pub async fn handle_download_pdf(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let book = current_book(&state).await?;
    let file_name = pdf_file_name(&book);

    let pdf = tokio::task::spawn_blocking(move || render_pdf(&book))
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("PDF render task failed: {e}")))??;

    info!("Exported {file_name} ({} bytes)", pdf.len());
    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (header::CONTENT_DISPOSITION, content_disposition(&file_name)),
        ],
        Bytes::from(pdf),
    ))
}

/// DELETE /api/v1/books/current
///
/// "Create New": drops the book and supersedes an in-flight run.
pub async fn handle_discard_book(State(state): State<AppState>) -> StatusCode {
    state.workflow.studio().discard().await;
    StatusCode::NO_CONTENT
}

async fn current_book(state: &AppState) -> Result<ColoringBook, AppError> {
    state
        .workflow
        .studio()
        .current_book()
        .await
        .ok_or_else(|| AppError::NotFound("No coloring book yet. Spark the magic first!".to_string()))
}
