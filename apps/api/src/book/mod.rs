// Coloring book generation: scene planning, the run workflow, the in-memory studio
// holding the current book, and PDF export.
// All provider calls go through llm_client; nothing here talks HTTP to Gemini.

pub mod export;
pub mod handlers;
pub mod scenes;
pub mod studio;
pub mod workflow;
