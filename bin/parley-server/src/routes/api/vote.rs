//! Message votes.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use parley_types::VoteType;
use serde_json::{Value, json};
use utoipa::OpenApi;
use validator::Validate;

use crate::auth::Session;
use crate::error::ServerError;
use crate::schemas::api::chat::ChatIdQuery;
use crate::schemas::api::vote::{VoteRequest, VoteResponse};
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(paths(get_votes, patch_vote), components(schemas(VoteRequest, VoteResponse)))]
pub struct VoteApi;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/vote", get(get_votes).patch(patch_vote))
}

/// Votes of a chat owned by the caller.
#[utoipa::path(
    get,
    path = "/api/vote",
    tag = "vote",
    params(ChatIdQuery),
    responses(
        (status = 200, description = "Votes of the chat", body = [VoteResponse]),
        (status = 400, description = "Missing chatId"),
        (status = 401, description = "No session, or the chat belongs to another user"),
        (status = 404, description = "Unknown chat"),
    )
)]
pub async fn get_votes(
    State(state): State<Arc<AppState>>,
    session: Session,
    Query(query): Query<ChatIdQuery>,
) -> Result<Json<Vec<VoteResponse>>, ServerError> {
    let chat_id = query
        .chat_id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ServerError::BadRequest("chatId is required".into()))?;
    let votes = state.chat.votes(session.caller(), &chat_id).await?;
    Ok(Json(votes.into_iter().map(VoteResponse::from).collect()))
}

/// Up- or down-vote a message; the last vote wins.
#[utoipa::path(
    patch,
    path = "/api/vote",
    tag = "vote",
    request_body = VoteRequest,
    responses(
        (status = 200, description = "Message voted", body = Value),
        (status = 400, description = "Missing or invalid field"),
        (status = 401, description = "No session, or the chat belongs to another user"),
        (status = 404, description = "Unknown chat, or the message is not part of it"),
    )
)]
pub async fn patch_vote(
    State(state): State<Arc<AppState>>,
    session: Session,
    Json(req): Json<VoteRequest>,
) -> Result<Json<Value>, ServerError> {
    req.validate().map_err(|e| ServerError::BadRequest(e.to_string()))?;
    let vote: VoteType = req
        .vote_type
        .parse()
        .map_err(|_| ServerError::BadRequest(format!("invalid vote type: {}", req.vote_type)))?;
    state
        .chat
        .vote(session.caller(), &req.chat_id, &req.message_id, vote)
        .await?;
    Ok(Json(json!({ "message": "Message voted" })))
}
