/// Generative service client: the single point of entry for all Gemini API calls.
///
/// ARCHITECTURAL RULE: No other module may call the Gemini API directly.
/// The workflow and the chat session talk to `dyn GenerativeService` only.
///
/// Models are hardcoded constants, not configuration.
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use tracing::{debug, warn};

use crate::book::scenes::{parse_scene_prompts, ScenePlan};
use crate::credentials::CredentialProvider;
use crate::models::book::Resolution;
use crate::models::chat::{ChatMessage, ChatRole};

pub mod prompts;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
/// Scene planning and chat.
pub const TEXT_MODEL: &str = "gemini-3-pro-preview";
/// Cover and page artwork.
pub const IMAGE_MODEL: &str = "gemini-3-pro-image-preview";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);
const IMAGE_ASPECT_RATIO: &str = "1:1";
const DEFAULT_IMAGE_MIME: &str = "image/png";

/// Provider messages that mean the key is missing, unknown, or rejected.
const AUTH_MARKERS: &[&str] = &[
    "Requested entity was not found",
    "API key not valid",
    "UNAUTHENTICATED",
    "PERMISSION_DENIED",
];

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("LLM returned empty content")]
    EmptyContent,

    #[error("Scene list was not a usable JSON array of strings")]
    SceneListUnparseable,

    #[error("{0}")]
    NoImageProduced(String),

    #[error("API key missing or rejected by the provider")]
    AuthenticationRequired,
}

/// The three things the rest of the service asks of a generative model.
#[async_trait]
pub trait GenerativeService: Send + Sync {
    /// Never fails: an unusable model answer yields the deterministic fallback plan.
    async fn fetch_scene_prompts(&self, theme: &str, child_name: &str) -> ScenePlan;

    /// Returns a `data:` URI holding the first inline image of the response.
    async fn generate_image(&self, prompt: &str, resolution: Resolution)
        -> Result<String, LlmError>;

    /// Sends all but the last message as history and the last one as the new turn.
    async fn chat(&self, transcript: &[ChatMessage]) -> Result<String, LlmError>;
}

// ────────────────────────────────────────────────────────────────────────────
// Wire types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<TextPart<'a>>,
}

impl<'a> Content<'a> {
    fn user(text: &'a str) -> Self {
        Self {
            role: Some("user"),
            parts: vec![TextPart { text }],
        }
    }

    fn system(text: &'a str) -> Self {
        Self {
            role: None,
            parts: vec![TextPart { text }],
        }
    }

    fn from_message(message: &'a ChatMessage) -> Self {
        let role = match message.role {
            ChatRole::User => "user",
            ChatRole::Assistant => "model",
        };
        Self {
            role: Some(role),
            parts: vec![TextPart {
                text: &message.content,
            }],
        }
    }
}

#[derive(Debug, Serialize)]
struct TextPart<'a> {
    text: &'a str,
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_schema: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    image_config: Option<ImageConfig>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ImageConfig {
    aspect_ratio: &'static str,
    image_size: &'static str,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    pub usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
pub struct Candidate {
    pub content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
pub struct CandidateContent {
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    pub text: Option<String>,
    pub inline_data: Option<InlineData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    pub mime_type: Option<String>,
    pub data: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageMetadata {
    #[serde(default)]
    pub prompt_token_count: u32,
    #[serde(default)]
    pub candidates_token_count: u32,
}

impl GenerateContentResponse {
    fn first_parts(&self) -> Option<&[Part]> {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|c| c.parts.as_slice())
            .filter(|parts| !parts.is_empty())
    }

    /// Concatenated text parts of the first candidate, if any text is present.
    pub fn text(&self) -> Option<String> {
        let text: String = self
            .first_parts()?
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect();
        (!text.trim().is_empty()).then_some(text)
    }

    /// The first inline image payload as a `data:` URI.
    pub fn first_image(&self) -> Result<String, LlmError> {
        let parts = self.first_parts().ok_or_else(|| {
            LlmError::NoImageProduced("The magic failed to manifest an image.".to_string())
        })?;

        parts
            .iter()
            .find_map(|p| p.inline_data.as_ref())
            .map(|img| {
                let mime = img.mime_type.as_deref().unwrap_or(DEFAULT_IMAGE_MIME);
                format!("data:{mime};base64,{}", img.data)
            })
            .ok_or_else(|| {
                LlmError::NoImageProduced("No magic drawing found in the response.".to_string())
            })
    }
}

#[derive(Debug, Deserialize)]
struct GoogleError {
    error: GoogleErrorBody,
}

#[derive(Debug, Deserialize)]
struct GoogleErrorBody {
    message: String,
    #[serde(default)]
    status: Option<String>,
}

// ────────────────────────────────────────────────────────────────────────────
// Client
// ────────────────────────────────────────────────────────────────────────────

/// The production `GenerativeService`, backed by the Gemini `generateContent` endpoint.
/// The API key is read from the credential provider on every call, so a key selected
/// mid-session takes effect on the next request.
#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    base_url: String,
    credentials: Arc<dyn CredentialProvider>,
}

impl GeminiClient {
    pub fn new(
        base_url: impl Into<String>,
        credentials: Arc<dyn CredentialProvider>,
    ) -> Result<Self, LlmError> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            credentials,
        })
    }

    /// Makes one `generateContent` call. No retries.
    async fn generate_content(
        &self,
        model: &str,
        request: &GenerateContentRequest<'_>,
    ) -> Result<GenerateContentResponse, LlmError> {
        let api_key = self
            .credentials
            .api_key()
            .await
            .ok_or(LlmError::AuthenticationRequired)?;

        let url = format!("{}/models/{}:generateContent", self.base_url, model);
        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", api_key)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let (message, provider_status) = match serde_json::from_str::<GoogleError>(&body) {
                Ok(e) => (e.error.message, e.error.status.unwrap_or_default()),
                Err(_) => (body, String::new()),
            };

            if is_auth_failure(status.as_u16(), &provider_status, &message) {
                warn!("Gemini rejected credentials ({}): {}", status, message);
                return Err(LlmError::AuthenticationRequired);
            }

            warn!("Gemini API returned {}: {}", status, message);
            return Err(LlmError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: GenerateContentResponse = response.json().await?;
        if let Some(usage) = &parsed.usage_metadata {
            debug!(
                "Gemini call succeeded: model={}, prompt_tokens={}, candidate_tokens={}",
                model, usage.prompt_token_count, usage.candidates_token_count
            );
        }
        Ok(parsed)
    }

    async fn request_scene_prompts(
        &self,
        theme: &str,
        child_name: &str,
    ) -> Result<Vec<String>, LlmError> {
        let system = prompts::scene_system_prompt(theme, child_name);
        let request = GenerateContentRequest {
            contents: vec![Content::user(prompts::SCENE_LIST_REQUEST)],
            system_instruction: Some(Content::system(&system)),
            generation_config: Some(GenerationConfig {
                response_mime_type: Some("application/json"),
                response_schema: Some(scene_list_schema()),
                ..Default::default()
            }),
        };

        let response = self.generate_content(TEXT_MODEL, &request).await?;
        let text = response.text().ok_or(LlmError::EmptyContent)?;
        parse_scene_prompts(strip_json_fences(&text)).ok_or(LlmError::SceneListUnparseable)
    }

    async fn request_image(
        &self,
        prompt: &str,
        resolution: Resolution,
    ) -> Result<String, LlmError> {
        let full_prompt = prompts::coloring_image_prompt(prompt);
        let request = GenerateContentRequest {
            contents: vec![Content::user(&full_prompt)],
            system_instruction: None,
            generation_config: Some(GenerationConfig {
                image_config: Some(ImageConfig {
                    aspect_ratio: IMAGE_ASPECT_RATIO,
                    image_size: resolution.as_str(),
                }),
                ..Default::default()
            }),
        };

        self.generate_content(IMAGE_MODEL, &request)
            .await?
            .first_image()
    }
}

#[async_trait]
impl GenerativeService for GeminiClient {
    async fn fetch_scene_prompts(&self, theme: &str, child_name: &str) -> ScenePlan {
        match self.request_scene_prompts(theme, child_name).await {
            Ok(prompts) => {
                debug!("Model planned {} scenes", prompts.len());
                ScenePlan::from_model(prompts)
            }
            Err(e) => {
                warn!("Scene planning failed, using fallback scenes: {e}");
                ScenePlan::fallback(theme, child_name)
            }
        }
    }

    async fn generate_image(
        &self,
        prompt: &str,
        resolution: Resolution,
    ) -> Result<String, LlmError> {
        match self.request_image(prompt, resolution).await {
            Err(LlmError::AuthenticationRequired) => {
                self.credentials.prompt_for_credential().await;
                Err(LlmError::AuthenticationRequired)
            }
            other => other,
        }
    }

    async fn chat(&self, transcript: &[ChatMessage]) -> Result<String, LlmError> {
        let (last, history) = transcript.split_last().ok_or(LlmError::EmptyContent)?;

        let mut contents: Vec<Content> = history.iter().map(Content::from_message).collect();
        contents.push(Content::user(&last.content));

        let request = GenerateContentRequest {
            contents,
            system_instruction: Some(Content::system(prompts::CHAT_PERSONA)),
            generation_config: None,
        };

        let response = self.generate_content(TEXT_MODEL, &request).await?;
        Ok(response
            .text()
            .unwrap_or_else(|| prompts::SLEEPY_CHAT_REPLY.to_string()))
    }
}

fn scene_list_schema() -> serde_json::Value {
    json!({
        "type": "ARRAY",
        "items": {
            "type": "STRING",
            "description": prompts::SCENE_ITEM_DESCRIPTION
        }
    })
}

fn is_auth_failure(status: u16, provider_status: &str, message: &str) -> bool {
    matches!(status, 401 | 403)
        || AUTH_MARKERS
            .iter()
            .any(|marker| message.contains(marker) || provider_status == *marker)
}

/// Strips ```json ... ``` or ``` ... ``` code fences from model output.
fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    if let Some(stripped) = text.strip_prefix("```json") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else if let Some(stripped) = text.strip_prefix("```") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else {
        text
    }
}
