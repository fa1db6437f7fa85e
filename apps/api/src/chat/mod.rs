// Theme brainstorming chat, independent of book generation.

pub mod handlers;
pub mod session;
