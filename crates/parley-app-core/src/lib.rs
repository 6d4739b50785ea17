//! Chat turn pipeline for parley.
//!
//! [`ChatService`] ties the pieces together: it validates a turn, resolves
//! or creates the chat, generates and evaluates alternatives, persists the
//! user message and streams the tool-augmented answer as a data stream.

pub mod alternatives;
pub mod chat;
pub mod entities;
pub mod error;
pub mod llm;
pub mod stream;
pub mod title;
pub mod tools;

#[cfg(any(test, feature = "test-util"))]
pub mod testing;

pub use chat::{Caller, ChatConfig, ChatService, TurnOptions, TurnRequest, TurnStream};
pub use entities::{SqliteStore, Store};
pub use error::ChatError;
