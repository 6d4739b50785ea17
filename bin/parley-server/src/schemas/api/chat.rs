use parley_types::{Chat, Message};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::{IntoParams, ToSchema};

/// `DELETE /api/chat?id=`
#[derive(Debug, Deserialize, IntoParams)]
pub struct DeleteChatQuery {
    pub id: Option<String>,
}

/// Query naming a chat, e.g. `GET /api/vote?chatId=`.
#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(rename_all = "camelCase")]
pub struct ChatIdQuery {
    pub chat_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChatResponse {
    pub id: String,
    pub title: String,
    pub user_id: String,
    pub created_at: String,
}

impl From<Chat> for ChatResponse {
    fn from(chat: Chat) -> Self {
        Self {
            id: chat.id,
            title: chat.title,
            user_id: chat.user_id,
            created_at: chat.created_at.to_rfc3339(),
        }
    }
}

/// A stored message. `parts` ends with the turn metadata segment.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MessageResponse {
    pub id: String,
    pub chat_id: String,
    pub role: String,
    pub parts: Vec<Value>,
    pub attachments: Vec<Value>,
    pub created_at: String,
}

impl TryFrom<Message> for MessageResponse {
    type Error = serde_json::Error;

    fn try_from(message: Message) -> Result<Self, Self::Error> {
        let parts = message.parts.iter().map(serde_json::to_value).collect::<Result<_, _>>()?;
        let attachments = message
            .attachments
            .iter()
            .map(serde_json::to_value)
            .collect::<Result<_, _>>()?;
        Ok(Self {
            id: message.id,
            chat_id: message.chat_id,
            role: message.role.to_string(),
            parts,
            attachments,
            created_at: message.created_at.to_rfc3339(),
        })
    }
}
