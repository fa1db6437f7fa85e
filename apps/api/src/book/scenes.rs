//! Scene planning: the ordered list of page descriptions for one book.
//!
//! Two paths, neither of them an error: the model's structured list, or a
//! deterministic template built from the theme and the child's name.

use serde::Serialize;

/// Number of interior pages a book asks the model for.
pub const SCENE_COUNT: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SceneSource {
    Model,
    Fallback,
}

/// Page descriptions in page order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScenePlan {
    pub prompts: Vec<String>,
    pub source: SceneSource,
}

impl ScenePlan {
    pub fn from_model(prompts: Vec<String>) -> Self {
        Self {
            prompts,
            source: SceneSource::Model,
        }
    }

    pub fn fallback(theme: &str, child_name: &str) -> Self {
        Self {
            prompts: fallback_scene_prompts(theme, child_name),
            source: SceneSource::Fallback,
        }
    }
}

/// Same inputs always give the same five descriptions.
pub fn fallback_scene_prompts(theme: &str, child_name: &str) -> Vec<String> {
    vec![
        format!("{child_name} having a fun adventure with {theme}"),
        format!("{theme} exploration scene"),
        format!("A friendly character in the {theme} world"),
        format!("Magic {theme} landscape"),
        format!("Happy {child_name} and friends in {theme}"),
    ]
}

/// Parses the model's JSON array of scene strings.
///
/// Returns `None` when the payload is not an array of strings or holds no usable scene,
/// so the caller can take the fallback path. The count is not enforced.
pub fn parse_scene_prompts(text: &str) -> Option<Vec<String>> {
    let scenes: Vec<String> = serde_json::from_str(text).ok()?;
    let scenes: Vec<String> = scenes
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    (!scenes.is_empty()).then_some(scenes)
}
