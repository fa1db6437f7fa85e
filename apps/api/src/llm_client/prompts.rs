use crate::book::scenes::SCENE_COUNT;

// Prompt text for every provider call. Book-level prompt building lives in
// book::workflow; this file holds the fragments the client itself appends.

/// Appended to every image prompt so pages print as clean line art.
pub const COLORING_STYLE: &str = "Style: Professional children's coloring book. \
    Thick, clean black outlines. Pure white background. \
    No colors, no gray, no shading, no textures. High contrast. \
    Vector-like clean lines. Suitable for printing and coloring with crayons.";

/// User turn for the scene list request. The theme travels in the system instruction.
pub const SCENE_LIST_REQUEST: &str = "List 5 coloring book scenes.";

/// Schema description attached to each item of the scene list.
pub const SCENE_ITEM_DESCRIPTION: &str = "A short, descriptive scene for a coloring page.";

/// Persona for the theme brainstorming chat.
pub const CHAT_PERSONA: &str = "You are 'Sparky', the Magic Color Creator assistant. \
    You love helping parents and kids brainstorm wild, imaginative themes for coloring books. \
    You suggest themes like 'Space Hamsters', 'Underwater Castles', or 'Robot Tea Parties'. \
    Keep it short, encouraging, and whimsical.";

/// Returned in place of an empty chat reply.
pub const SLEEPY_CHAT_REPLY: &str = "My magic wand is a bit sleepy. Try asking again!";

pub fn scene_system_prompt(theme: &str, child_name: &str) -> String {
    format!(
        "You are a creative children's book author. For the theme \"{theme}\" and child \
        \"{child_name}\", suggest {SCENE_COUNT} distinct, fun, and simple scenes for coloring."
    )
}

pub fn coloring_image_prompt(scene: &str) -> String {
    format!("{scene}. {COLORING_STYLE}")
}
