//! Unified server error type.
//!
//! Every handler returns `Result<T, ServerError>`, which implements
//! [`axum::response::IntoResponse`] so errors become a JSON body
//! `{"error": "..."}` with a matching status code.
//!
//! Internal errors (database, upstream model, timeouts) are logged in full
//! but only a generic message is returned to the caller.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use parley_app_core::ChatError;
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

/// Generic failure text of the turn endpoint.
pub const TURN_FAILURE_MESSAGE: &str = "An error occurred while processing your request!";

#[derive(Debug, Error)]
pub enum ServerError {
    /// No session, or the session does not own the resource.
    #[error("unauthorized")]
    Unauthorized,

    #[error("not found: {0}")]
    NotFound(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    /// Propagated from the chat pipeline.
    #[error(transparent)]
    Chat(#[from] ChatError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ServerError {
    /// Mapping used by `POST /api/chat`: apart from auth and validation
    /// failures every error surfaces as a 404 with a generic message.
    pub fn from_turn(e: ChatError) -> Self {
        match e {
            ChatError::Unauthorized(_) => ServerError::Unauthorized,
            ChatError::BadRequest(m) => ServerError::BadRequest(m),
            other => {
                error!(error = %other, "turn failed before streaming");
                ServerError::NotFound(TURN_FAILURE_MESSAGE.to_owned())
            }
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, client_message) = match self {
            ServerError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized".to_owned()),
            ServerError::NotFound(m) => (StatusCode::NOT_FOUND, m),
            ServerError::BadRequest(m) => (StatusCode::BAD_REQUEST, m),

            ServerError::Chat(ChatError::Unauthorized(m)) => {
                warn!(reason = %m, "request rejected");
                (StatusCode::UNAUTHORIZED, "Unauthorized".to_owned())
            }
            ServerError::Chat(ChatError::BadRequest(m)) => (StatusCode::BAD_REQUEST, m),
            ServerError::Chat(ChatError::NotFound(m)) => (StatusCode::NOT_FOUND, m),
            ServerError::Chat(e) => {
                error!(error = %e, "chat pipeline error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal server error".to_owned())
            }

            ServerError::Internal(m) => {
                error!(message = %m, "internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal server error".to_owned())
            }
        };
        (status, Json(json!({ "error": client_message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_app_core::llm::LlmError;
    use tracing_test::traced_test;

    #[test]
    fn turn_errors_hide_upstream_failures() {
        assert!(matches!(
            ServerError::from_turn(ChatError::Unauthorized("x".into())),
            ServerError::Unauthorized
        ));
        assert!(matches!(
            ServerError::from_turn(ChatError::BadRequest("x".into())),
            ServerError::BadRequest(_)
        ));
        let upstream = ServerError::from_turn(ChatError::Upstream(LlmError::UnknownModel("m".into())));
        assert!(matches!(upstream, ServerError::NotFound(ref m) if m == TURN_FAILURE_MESSAGE));
        assert!(matches!(ServerError::from_turn(ChatError::Timeout), ServerError::NotFound(_)));
    }

    #[test]
    fn status_codes_follow_the_error_kind() {
        let status = |e: ServerError| e.into_response().status();
        assert_eq!(status(ServerError::Unauthorized), StatusCode::UNAUTHORIZED);
        assert_eq!(status(ChatError::NotFound("c".into()).into()), StatusCode::NOT_FOUND);
        assert_eq!(status(ChatError::BadRequest("c".into()).into()), StatusCode::BAD_REQUEST);
        assert_eq!(status(ChatError::Timeout.into()), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            status(ServerError::Internal("boom".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    #[traced_test]
    fn hidden_turn_failures_are_logged() {
        let _ = ServerError::from_turn(ChatError::Timeout);
        assert!(logs_contain("turn failed before streaming"));
    }
}
