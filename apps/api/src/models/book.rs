use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;

/// Shown when the name or theme is blank. No provider call is made.
pub const MISSING_INPUT_MESSAGE: &str = "We need a name and a theme for the magic to work!";

/// Image size bucket requested from the image model.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Resolution {
    #[default]
    #[serde(rename = "1K")]
    OneK,
    #[serde(rename = "2K")]
    TwoK,
    #[serde(rename = "4K")]
    FourK,
}

impl Resolution {
    /// Wire value for `imageConfig.imageSize`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Resolution::OneK => "1K",
            Resolution::TwoK => "2K",
            Resolution::FourK => "4K",
        }
    }
}

/// Raw form input, before validation.
#[derive(Debug, Clone, Deserialize)]
pub struct BookInput {
    #[serde(default)]
    pub child_name: String,
    #[serde(default)]
    pub theme: String,
    #[serde(default)]
    pub resolution: Resolution,
}

/// A validated request. Immutable once a run has started.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationRequest {
    child_name: String,
    theme: String,
    resolution: Resolution,
}

impl GenerationRequest {
    /// Trims both fields and rejects the request if either ends up empty.
    pub fn new(child_name: &str, theme: &str, resolution: Resolution) -> Result<Self, AppError> {
        let child_name = child_name.trim();
        let theme = theme.trim();
        if child_name.is_empty() || theme.is_empty() {
            return Err(AppError::InvalidInput(MISSING_INPUT_MESSAGE.to_string()));
        }
        Ok(Self {
            child_name: child_name.to_string(),
            theme: theme.to_string(),
            resolution,
        })
    }

    pub fn child_name(&self) -> &str {
        &self.child_name
    }

    pub fn theme(&self) -> &str {
        &self.theme
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }
}

impl TryFrom<BookInput> for GenerationRequest {
    type Error = AppError;

    fn try_from(input: BookInput) -> Result<Self, Self::Error> {
        GenerationRequest::new(&input.child_name, &input.theme, input.resolution)
    }
}

/// One interior page. `description` is the scene prompt that produced `image_data`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColoringPage {
    pub id: String,
    /// `data:<mime>;base64,<payload>` URI.
    pub image_data: String,
    pub description: String,
}

/// The finished artifact of one successful workflow run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColoringBook {
    pub theme: String,
    pub child_name: String,
    pub resolution: Resolution,
    pub cover_image: String,
    pub pages: Vec<ColoringPage>,
    pub created_at: DateTime<Utc>,
}
