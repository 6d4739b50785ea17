pub mod chat;
pub mod document;
pub mod models;
pub mod vote;
