use parley_types::Vote;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

/// `PATCH /api/vote` body.
#[derive(Debug, Clone, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct VoteRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "chatId is required"))]
    pub chat_id: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "messageId is required"))]
    pub message_id: String,
    /// `"up"` or `"down"`.
    #[serde(default, rename = "type")]
    #[validate(length(min = 1, message = "type is required"))]
    pub vote_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VoteResponse {
    pub chat_id: String,
    pub message_id: String,
    pub is_upvoted: bool,
}

impl From<Vote> for VoteResponse {
    fn from(vote: Vote) -> Self {
        Self {
            chat_id: vote.chat_id,
            message_id: vote.message_id,
            is_upvoted: vote.is_upvoted,
        }
    }
}
