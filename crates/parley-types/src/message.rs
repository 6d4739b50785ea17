//! Messages and their content segments.
//!
//! A message is an ordered list of [`MessagePart`]s. Auxiliary turn data
//! (alternatives, the evaluator selection) travels as a
//! [`MessagePart::Metadata`] segment that is always the last part of a
//! stored message; [`Message::metadata`] relies on that ordering.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::{AsRefStr, Display, EnumString};

use crate::evaluation::EvaluationResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Data,
}

/// A file reference attached to a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    pub url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ToolInvocationState {
    PartialCall,
    Call,
    Result,
}

/// One tool call made by the model, with its result once available.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolInvocation {
    pub state: ToolInvocationState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step: Option<u32>,
    pub tool_call_id: String,
    pub tool_name: String,
    #[serde(default)]
    pub args: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
}

/// An alternative completion generated for the same prompt before the main
/// streamed answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssistantAlternative {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evaluations: Option<Vec<EvaluationResult>>,
}

impl AssistantAlternative {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            evaluations: None,
        }
    }
}

/// Turn metadata attached identically to the user message and the assistant
/// message of a turn. Written once at creation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageMetadata {
    #[serde(default)]
    pub assistant_messages: Vec<AssistantAlternative>,
    #[serde(default)]
    pub evaluation_set: Vec<String>,
}

/// A content segment of a message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum MessagePart {
    Text {
        text: String,
    },
    Reasoning {
        reasoning: String,
    },
    ToolInvocation {
        #[serde(rename = "toolInvocation")]
        tool_invocation: ToolInvocation,
    },
    StepStart,
    Metadata {
        metadata: MessageMetadata,
    },
    /// Part types this server does not interpret (sources, files, ...).
    /// They are accepted on input and dropped before storage.
    #[serde(other)]
    Unsupported,
}

impl MessagePart {
    pub fn text(text: impl Into<String>) -> Self {
        MessagePart::Text { text: text.into() }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            MessagePart::Text { text } => Some(text),
            _ => None,
        }
    }

    pub fn is_metadata(&self) -> bool {
        matches!(self, MessagePart::Metadata { .. })
    }
}

/// Returns `parts` with any existing metadata (and uninterpreted parts)
/// removed and `metadata` appended as the trailing segment.
pub fn attach_metadata(parts: Vec<MessagePart>, metadata: MessageMetadata) -> Vec<MessagePart> {
    let mut out: Vec<MessagePart> = parts
        .into_iter()
        .filter(|p| !p.is_metadata() && !matches!(p, MessagePart::Unsupported))
        .collect();
    out.push(MessagePart::Metadata { metadata });
    out
}

/// A message as sent by the browser in the turn request history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UiMessage {
    pub id: String,
    pub role: Role,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub parts: Vec<MessagePart>,
    #[serde(default, rename = "experimental_attachments", skip_serializing_if = "Option::is_none")]
    pub attachments: Option<Vec<Attachment>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl UiMessage {
    pub fn user(id: impl Into<String>, text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            id: id.into(),
            role: Role::User,
            content: text.clone(),
            parts: vec![MessagePart::text(text)],
            attachments: None,
            created_at: None,
        }
    }

    /// Content parts of the message; older clients only send `content`, in
    /// which case it becomes a single text part.
    pub fn content_parts(&self) -> Vec<MessagePart> {
        if self.parts.is_empty() && !self.content.is_empty() {
            return vec![MessagePart::text(self.content.clone())];
        }
        self.parts.clone()
    }

    /// Visible text of the message, text parts joined by newlines.
    pub fn text(&self) -> String {
        let joined = join_text(&self.parts);
        if joined.is_empty() {
            self.content.clone()
        } else {
            joined
        }
    }

    pub fn attachments(&self) -> Vec<Attachment> {
        self.attachments.clone().unwrap_or_default()
    }
}

/// Returns the most recent user-authored message of a history.
pub fn most_recent_user_message(messages: &[UiMessage]) -> Option<&UiMessage> {
    messages.iter().rev().find(|m| m.role == Role::User)
}

/// A persisted message. Insert-only: corrections are new messages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub chat_id: String,
    pub role: Role,
    pub parts: Vec<MessagePart>,
    pub attachments: Vec<Attachment>,
    pub created_at: DateTime<Utc>,
}

impl Message {
    pub fn new(
        id: impl Into<String>,
        chat_id: impl Into<String>,
        role: Role,
        parts: Vec<MessagePart>,
        metadata: MessageMetadata,
        attachments: Vec<Attachment>,
    ) -> Self {
        Self {
            id: id.into(),
            chat_id: chat_id.into(),
            role,
            parts: attach_metadata(parts, metadata),
            attachments,
            created_at: Utc::now(),
        }
    }

    /// Builds the stored form of an inbound message.
    pub fn from_ui(message: &UiMessage, chat_id: impl Into<String>, metadata: MessageMetadata) -> Self {
        Self::new(
            message.id.clone(),
            chat_id,
            message.role,
            message.content_parts(),
            metadata,
            message.attachments(),
        )
    }

    /// The trailing metadata segment, if present.
    pub fn metadata(&self) -> Option<&MessageMetadata> {
        match self.parts.last() {
            Some(MessagePart::Metadata { metadata }) => Some(metadata),
            _ => None,
        }
    }

    pub fn text(&self) -> String {
        join_text(&self.parts)
    }
}

fn join_text(parts: &[MessagePart]) -> String {
    parts
        .iter()
        .filter_map(MessagePart::as_text)
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_owned()
}
