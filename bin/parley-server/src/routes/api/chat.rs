//! The turn endpoint and chat deletion.
//!
//! `POST /api/chat` answers with a data stream: one `<code>:<json>` line per
//! part. Failures before the first byte are typed errors; failures after it
//! appear in the stream as an error part.

use std::convert::Infallible;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::http::header::{CONTENT_TYPE, HeaderName};
use axum::http::HeaderValue;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use futures::StreamExt;
use parley_app_core::TurnRequest;
use parley_app_core::stream::{DATA_STREAM_HEADER, DATA_STREAM_VERSION};
use serde_json::{Value, json};
use tracing::{debug, warn};
use utoipa::OpenApi;

use crate::auth::Session;
use crate::error::{ServerError, TURN_FAILURE_MESSAGE};
use crate::schemas::api::chat::DeleteChatQuery;
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(paths(post_chat, delete_chat))]
pub struct ChatApi;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/chat", post(post_chat).delete(delete_chat))
}

/// Run one chat turn (`POST /api/chat`).
///
/// Body: `{id, messages, selectedChatModel, data?: {count, evaluators}}`.
#[utoipa::path(
    post,
    path = "/api/chat",
    tag = "chat",
    request_body = Value,
    responses(
        (status = 200, description = "Data stream of the assistant answer", content_type = "text/plain"),
        (status = 400, description = "No user message or unknown model"),
        (status = 401, description = "No session, or the chat belongs to another user"),
        (status = 404, description = "The turn could not be started"),
    )
)]
pub async fn post_chat(
    State(state): State<Arc<AppState>>,
    session: Session,
    body: Result<Json<TurnRequest>, JsonRejection>,
) -> Result<Response, ServerError> {
    let Json(request) = body.map_err(|e| {
        warn!(error = %e, "malformed turn request");
        ServerError::NotFound(TURN_FAILURE_MESSAGE.to_owned())
    })?;
    debug!(
        chat_id = %request.id,
        model = %request.selected_chat_model,
        messages = request.messages.len(),
        "turn request"
    );

    let stream = state
        .chat
        .start_turn(session.caller(), request)
        .await
        .map_err(ServerError::from_turn)?;

    let body = Body::from_stream(stream.map(|part| Ok::<_, Infallible>(part.to_bytes())));
    let headers = [
        (CONTENT_TYPE, HeaderValue::from_static("text/plain; charset=utf-8")),
        (HeaderName::from_static(DATA_STREAM_HEADER), HeaderValue::from_static(DATA_STREAM_VERSION)),
    ];
    Ok((headers, body).into_response())
}

/// Delete a chat with its messages and votes (`DELETE /api/chat?id=`).
#[utoipa::path(
    delete,
    path = "/api/chat",
    tag = "chat",
    params(DeleteChatQuery),
    responses(
        (status = 200, description = "Chat deleted", body = Value),
        (status = 401, description = "No session, or the chat belongs to another user"),
        (status = 404, description = "Missing id or unknown chat"),
    )
)]
pub async fn delete_chat(
    State(state): State<Arc<AppState>>,
    session: Session,
    Query(query): Query<DeleteChatQuery>,
) -> Result<Json<Value>, ServerError> {
    state.chat.delete_chat(session.caller(), query.id.as_deref()).await?;
    Ok(Json(json!({ "message": "Chat deleted" })))
}
