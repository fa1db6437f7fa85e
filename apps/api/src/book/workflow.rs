//! Book generation workflow: turns one `GenerationRequest` into a `ColoringBook`.
//!
//! Flow: open run → validate → ensure credential → plan scenes → cover → pages (in order) → publish.
//!
//! One provider call is in flight at a time. Any failed call aborts the run and discards
//! everything drawn so far; there are no retries.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use crate::book::studio::{BookStudio, RunToken, WorkflowState};
use crate::credentials::CredentialProvider;
use crate::errors::AppError;
use crate::llm_client::GenerativeService;
use crate::models::book::{BookInput, ColoringBook, ColoringPage, GenerationRequest};

pub const PLANNING_LABEL: &str = "Sparking some creative ideas...";
pub const COVER_LABEL: &str = "Designing a beautiful cover...";
pub const READY_LABEL: &str = "Ta-da! Your book is ready.";

/// A validated request bound to the run token the studio issued for it.
#[derive(Debug, Clone)]
pub struct WorkflowRun {
    pub token: RunToken,
    pub request: GenerationRequest,
}

pub struct BookWorkflow {
    service: Arc<dyn GenerativeService>,
    credentials: Arc<dyn CredentialProvider>,
    studio: Arc<BookStudio>,
}

impl BookWorkflow {
    pub fn new(
        service: Arc<dyn GenerativeService>,
        credentials: Arc<dyn CredentialProvider>,
        studio: Arc<BookStudio>,
    ) -> Self {
        Self {
            service,
            credentials,
            studio,
        }
    }

    pub fn studio(&self) -> &Arc<BookStudio> {
        &self.studio
    }

    /// Opens a run and validates the input inside it. Blank input closes the run
    /// before any provider call is made.
    pub async fn start(&self, input: BookInput) -> Result<WorkflowRun, AppError> {
        let token = self.studio.begin().await?;

        let request = match GenerationRequest::try_from(input) {
            Ok(request) => request,
            Err(e) => {
                self.studio.reject(token, e.user_message()).await;
                return Err(e);
            }
        };

        info!(
            "Run {token} started: theme={:?}, resolution={}",
            request.theme(),
            request.resolution().as_str()
        );
        Ok(WorkflowRun { token, request })
    }

    /// Drives a run to completion and publishes the book, or records the failure.
    pub async fn run(&self, run: WorkflowRun) -> Result<ColoringBook, AppError> {
        let token = run.token;
        match self.generate(token, &run.request).await {
            Ok(book) => {
                if self.studio.complete(token, book.clone(), READY_LABEL).await {
                    info!("Run {token} complete with {} pages", book.pages.len());
                    Ok(book)
                } else {
                    info!("Run {token} finished after being superseded; result dropped");
                    Err(AppError::Superseded)
                }
            }
            Err(AppError::Superseded) => {
                info!("Run {token} stopped: superseded");
                Err(AppError::Superseded)
            }
            Err(e) => {
                warn!("Run {token} failed: {e}");
                self.studio.fail(token, e.user_message()).await;
                Err(e)
            }
        }
    }

    async fn generate(
        &self,
        token: RunToken,
        request: &GenerationRequest,
    ) -> Result<ColoringBook, AppError> {
        self.step(token, WorkflowState::EnsuringCredential, None)
            .await?;
        if !self.credentials.has_credential().await {
            // Selection completes out of band; the next call reveals whether it worked.
            info!("Run {token}: no API key configured, requesting selection");
            self.credentials.prompt_for_credential().await;
        }

        self.step(token, WorkflowState::PlanningScenes, Some(PLANNING_LABEL))
            .await?;
        let plan = self
            .service
            .fetch_scene_prompts(request.theme(), request.child_name())
            .await;
        info!(
            "Run {token}: {} scenes planned ({:?})",
            plan.prompts.len(),
            plan.source
        );

        self.step(token, WorkflowState::RenderingCover, Some(COVER_LABEL))
            .await?;
        let cover_image = self
            .service
            .generate_image(&cover_prompt(request), request.resolution())
            .await?;

        let total = plan.prompts.len();
        let mut pages = Vec::with_capacity(total);
        for (i, scene) in plan.prompts.iter().enumerate() {
            let label = page_label(i, total);
            self.step(
                token,
                WorkflowState::RenderingPages { page: i + 1, total },
                Some(label.as_str()),
            )
            .await?;

            let image_data = self
                .service
                .generate_image(&page_prompt(scene), request.resolution())
                .await?;
            pages.push(ColoringPage {
                id: format!("page-{i}"),
                image_data,
                description: scene.clone(),
            });
        }

        Ok(ColoringBook {
            theme: request.theme().to_string(),
            child_name: request.child_name().to_string(),
            resolution: request.resolution(),
            cover_image,
            pages,
            created_at: Utc::now(),
        })
    }

    async fn step(
        &self,
        token: RunToken,
        state: WorkflowState,
        label: Option<&str>,
    ) -> Result<(), AppError> {
        if self.studio.advance(token, state, label).await {
            Ok(())
        } else {
            Err(AppError::Superseded)
        }
    }
}

pub fn cover_prompt(request: &GenerationRequest) -> String {
    format!(
        "A high-quality coloring book cover. Large centered text area. \
        Large friendly characters themed as {}. Include elements like stars and sparkles. \
        Focus on {}'s Adventure.",
        request.theme(),
        request.child_name()
    )
}

pub fn page_prompt(scene: &str) -> String {
    format!("Coloring book scene: {scene}")
}

/// `index` is zero-based.
pub fn page_label(index: usize, total: usize) -> String {
    format!("Drawing magical page {} of {}...", index + 1, total)
}
