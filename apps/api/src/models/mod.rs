pub mod book;
pub mod chat;
