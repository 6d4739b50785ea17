//! The caller's chats and their stored messages.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use utoipa::OpenApi;

use crate::auth::Session;
use crate::error::ServerError;
use crate::schemas::api::chat::{ChatIdQuery, ChatResponse, MessageResponse};
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(paths(get_history, get_messages), components(schemas(ChatResponse, MessageResponse)))]
pub struct HistoryApi;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/history", get(get_history))
        .route("/messages", get(get_messages))
}

/// Chats of the caller, newest first.
#[utoipa::path(
    get,
    path = "/api/history",
    tag = "history",
    responses(
        (status = 200, description = "Chats of the caller", body = [ChatResponse]),
        (status = 401, description = "No session"),
    )
)]
pub async fn get_history(
    State(state): State<Arc<AppState>>,
    session: Session,
) -> Result<Json<Vec<ChatResponse>>, ServerError> {
    let chats = state.chat.history(session.caller()).await?;
    Ok(Json(chats.into_iter().map(ChatResponse::from).collect()))
}

/// Stored messages of a chat, in creation order.
#[utoipa::path(
    get,
    path = "/api/messages",
    tag = "history",
    params(ChatIdQuery),
    responses(
        (status = 200, description = "Messages of the chat", body = [MessageResponse]),
        (status = 400, description = "Missing chatId"),
        (status = 401, description = "No session, or the chat belongs to another user"),
        (status = 404, description = "Unknown chat"),
    )
)]
pub async fn get_messages(
    State(state): State<Arc<AppState>>,
    session: Session,
    Query(query): Query<ChatIdQuery>,
) -> Result<Json<Vec<MessageResponse>>, ServerError> {
    let chat_id = query
        .chat_id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ServerError::BadRequest("chatId is required".into()))?;
    let messages = state.chat.messages(session.caller(), &chat_id).await?;
    let messages = messages
        .into_iter()
        .map(MessageResponse::try_from)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| ServerError::Internal(e.to_string()))?;
    Ok(Json(messages))
}
