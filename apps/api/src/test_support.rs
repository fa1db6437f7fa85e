//! Test doubles: a local mock of the Gemini endpoint plus in-process fakes for the
//! generative service and the credential provider.

use std::collections::VecDeque;
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    extract::State,
    http::{HeaderMap, StatusCode, Uri},
    Json, Router,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde_json::Value;

use crate::book::scenes::ScenePlan;
use crate::book::studio::BookStudio;
use crate::credentials::CredentialProvider;
use crate::llm_client::{GenerativeService, LlmError};
use crate::models::book::Resolution;
use crate::models::chat::ChatMessage;

// ────────────────────────────────────────────────────────────────────────────
// Mock Gemini server
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct SeenRequest {
    pub path: String,
    pub api_key: Option<String>,
    pub body: Value,
}

#[derive(Clone)]
struct MockState {
    status: StatusCode,
    body: Value,
    seen: Arc<Mutex<Vec<SeenRequest>>>,
}

pub struct MockGemini {
    pub base_url: String,
    seen: Arc<Mutex<Vec<SeenRequest>>>,
}

impl MockGemini {
    pub fn requests(&self) -> Vec<SeenRequest> {
        self.seen.lock().unwrap().clone()
    }
}

async fn mock_handler(
    State(state): State<MockState>,
    uri: Uri,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    state.seen.lock().unwrap().push(SeenRequest {
        path: uri.path().to_string(),
        api_key: headers
            .get("x-goog-api-key")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
        body,
    });
    (state.status, Json(state.body.clone()))
}

/// Serves `body` with `status` for every request on an ephemeral local port.
pub async fn spawn_mock_gemini(status: StatusCode, body: Value) -> MockGemini {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let state = MockState {
        status,
        body,
        seen: seen.clone(),
    };
    let app = Router::new().fallback(mock_handler).with_state(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    MockGemini {
        base_url: format!("http://{addr}/v1beta"),
        seen,
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Fake credential provider
// ────────────────────────────────────────────────────────────────────────────

pub struct FakeCredentials {
    key: Mutex<Option<String>>,
    /// Key installed when the prompt fires, simulating a successful selection.
    granted_on_prompt: Option<String>,
    prompts: AtomicUsize,
}

impl FakeCredentials {
    pub fn with_key(key: &str) -> Self {
        Self {
            key: Mutex::new(Some(key.to_string())),
            granted_on_prompt: None,
            prompts: AtomicUsize::new(0),
        }
    }

    pub fn without_key() -> Self {
        Self {
            key: Mutex::new(None),
            granted_on_prompt: None,
            prompts: AtomicUsize::new(0),
        }
    }

    pub fn granting_on_prompt(key: &str) -> Self {
        Self {
            key: Mutex::new(None),
            granted_on_prompt: Some(key.to_string()),
            prompts: AtomicUsize::new(0),
        }
    }

    pub fn prompt_count(&self) -> usize {
        self.prompts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CredentialProvider for FakeCredentials {
    async fn has_credential(&self) -> bool {
        self.key.lock().unwrap().is_some()
    }

    async fn prompt_for_credential(&self) {
        self.prompts.fetch_add(1, Ordering::SeqCst);
        if let Some(key) = &self.granted_on_prompt {
            *self.key.lock().unwrap() = Some(key.clone());
        }
    }

    async fn api_key(&self) -> Option<String> {
        self.key.lock().unwrap().clone()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Fake generative service
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Scenes { theme: String, child_name: String },
    Image { prompt: String, resolution: Resolution },
    Chat { transcript: Vec<ChatMessage> },
}

/// A 4x4 white PNG as a data URI.
pub fn tiny_png_data_uri() -> String {
    let img = image::RgbImage::from_pixel(4, 4, image::Rgb([255, 255, 255]));
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    format!("data:image/png;base64,{}", BASE64.encode(buf))
}

#[derive(Default)]
pub struct FakeService {
    calls: Mutex<Vec<Call>>,
    plan: Option<ScenePlan>,
    /// Zero-based image call index that fails, and how.
    image_failure: Option<(usize, fn() -> LlmError)>,
    /// Discards the studio's current run when this image call index starts.
    discard_at: Option<(usize, Arc<BookStudio>)>,
    chat_replies: Mutex<VecDeque<Result<String, LlmError>>>,
}

impl FakeService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_plan(mut self, prompts: &[&str]) -> Self {
        self.plan = Some(ScenePlan::from_model(
            prompts.iter().map(|p| p.to_string()).collect(),
        ));
        self
    }

    pub fn failing_image_at(mut self, index: usize, error: fn() -> LlmError) -> Self {
        self.image_failure = Some((index, error));
        self
    }

    pub fn discarding_at(mut self, index: usize, studio: Arc<BookStudio>) -> Self {
        self.discard_at = Some((index, studio));
        self
    }

    pub fn with_chat_replies(self, replies: Vec<Result<String, LlmError>>) -> Self {
        *self.chat_replies.lock().unwrap() = replies.into();
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn image_prompts(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Image { prompt, .. } => Some(prompt),
                _ => None,
            })
            .collect()
    }

    fn image_calls_so_far(&self) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| matches!(c, Call::Image { .. }))
            .count()
    }
}

#[async_trait]
impl GenerativeService for FakeService {
    async fn fetch_scene_prompts(&self, theme: &str, child_name: &str) -> ScenePlan {
        self.calls.lock().unwrap().push(Call::Scenes {
            theme: theme.to_string(),
            child_name: child_name.to_string(),
        });
        self.plan
            .clone()
            .unwrap_or_else(|| ScenePlan::fallback(theme, child_name))
    }

    async fn generate_image(
        &self,
        prompt: &str,
        resolution: Resolution,
    ) -> Result<String, LlmError> {
        let index = self.image_calls_so_far();
        self.calls.lock().unwrap().push(Call::Image {
            prompt: prompt.to_string(),
            resolution,
        });

        if let Some((at, studio)) = &self.discard_at {
            if *at == index {
                studio.discard().await;
            }
        }

        match self.image_failure {
            Some((at, error)) if at == index => Err(error()),
            _ => Ok(tiny_png_data_uri()),
        }
    }

    async fn chat(&self, transcript: &[ChatMessage]) -> Result<String, LlmError> {
        let turn = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(Call::Chat {
                transcript: transcript.to_vec(),
            });
            calls.iter().filter(|c| matches!(c, Call::Chat { .. })).count()
        };
        self.chat_replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(format!("reply {turn}")))
    }
}
