//! Chat model catalog.
//!
//! Ids are what the browser sends as `selectedChatModel`. Which upstream
//! model serves an id is decided by `parley_app_core::llm::ModelRegistry`.

use serde::Serialize;

pub const DEFAULT_CHAT_MODEL: &str = "chat-model";
/// Model used for alternative generation unless configured otherwise.
pub const DEFAULT_ALTERNATIVE_MODEL: &str = "chat-model-4o-mini";
pub const TITLE_MODEL: &str = "title-model";
pub const ARTIFACT_MODEL: &str = "artifact-model";

/// How a model surfaces its chain of thought.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "kind", content = "tag")]
pub enum Reasoning {
    /// Reasoning is inlined in the text between `<tag>` and `</tag>`.
    Tagged(&'static str),
    /// The provider reports reasoning separately.
    Native,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ChatModel {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<Reasoning>,
}

impl ChatModel {
    /// Reasoning models run without tool access.
    pub fn is_reasoning(&self) -> bool {
        self.reasoning.is_some()
    }
}

/// Models selectable by users.
pub const CHAT_MODELS: &[ChatModel] = &[
    ChatModel {
        id: "chat-model",
        name: "Chat model",
        description: "Primary model for all-purpose chat",
        reasoning: None,
    },
    ChatModel {
        id: "chat-model-reasoning",
        name: "Reasoning model",
        description: "Uses advanced reasoning",
        reasoning: Some(Reasoning::Tagged("think")),
    },
    ChatModel {
        id: "chat-model-4o",
        name: "4o",
        description: "Primary model for all-purpose chat",
        reasoning: None,
    },
    ChatModel {
        id: "chat-model-4o-mini",
        name: "4o mini",
        description: "Smaller and faster model",
        reasoning: None,
    },
    ChatModel {
        id: "reasoning-model-o3-mini",
        name: "o3 mini",
        description: "Reasoning model",
        reasoning: Some(Reasoning::Tagged("reasoning")),
    },
    ChatModel {
        id: "reasoning-model-o1-mini",
        name: "o1 mini",
        description: "Reasoning model",
        reasoning: Some(Reasoning::Native),
    },
];

pub fn find_model(id: &str) -> Option<&'static ChatModel> {
    CHAT_MODELS.iter().find(|m| m.id == id)
}

pub fn is_reasoning_model(id: &str) -> bool {
    find_model(id).is_some_and(ChatModel::is_reasoning)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reasoning_models_are_flagged() {
        assert!(is_reasoning_model("chat-model-reasoning"));
        assert!(is_reasoning_model("reasoning-model-o3-mini"));
        assert!(is_reasoning_model("reasoning-model-o1-mini"));
        assert!(!is_reasoning_model(DEFAULT_CHAT_MODEL));
        assert!(!is_reasoning_model("no-such-model"));
    }

    #[test]
    fn internal_models_are_not_listed() {
        assert!(find_model(TITLE_MODEL).is_none());
        assert!(find_model(ARTIFACT_MODEL).is_none());
        assert!(find_model(DEFAULT_ALTERNATIVE_MODEL).is_some());
    }
}
