use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

/// A conversation. Created lazily on its first turn and owned by exactly one
/// user for its whole lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chat {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
}

impl Chat {
    pub fn new(id: impl Into<String>, user_id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            user_id: user_id.into(),
            title: title.into(),
            created_at: Utc::now(),
        }
    }

    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.user_id == user_id
    }
}

/// Direction of a vote as sent by the client (`"up"` / `"down"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum VoteType {
    Up,
    Down,
}

impl VoteType {
    pub fn is_upvote(self) -> bool {
        matches!(self, VoteType::Up)
    }
}

/// At most one vote per `(chat_id, message_id)`; the last write wins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vote {
    pub chat_id: String,
    pub message_id: String,
    pub is_upvoted: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vote_type_parses_lowercase() {
        assert_eq!("up".parse::<VoteType>().ok(), Some(VoteType::Up));
        assert_eq!("down".parse::<VoteType>().ok(), Some(VoteType::Down));
        assert!("sideways".parse::<VoteType>().is_err());
    }

    #[test]
    fn chat_serializes_camel_case() {
        let chat = Chat::new("c1", "u1", "Greeting");
        let json = serde_json::to_value(&chat).unwrap();
        assert_eq!(json["userId"], "u1");
        assert!(json.get("createdAt").is_some());
        assert!(chat.is_owned_by("u1"));
        assert!(!chat.is_owned_by("u2"));
    }
}
