//! Typed failures of the chat pipeline.
//!
//! The HTTP layer decides which status code each kind maps to; nothing in
//! here knows about HTTP.

use thiserror::Error;

use crate::llm::LlmError;

#[derive(Debug, Error)]
pub enum ChatError {
    /// No session, or the session does not own the resource.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The request is malformed or incomplete.
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("not found: {0}")]
    NotFound(String),

    /// A language-model call failed.
    #[error("upstream error: {0}")]
    Upstream(#[from] LlmError),

    #[error("database error: {0}")]
    Persistence(#[from] sqlx::Error),

    /// The turn exceeded its time budget.
    #[error("timed out")]
    Timeout,
}
