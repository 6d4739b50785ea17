//! Language-model collaborators.
//!
//! [`LanguageModel`] is the seam between the chat pipeline and any hosted
//! provider. [`openai_compat::OpenAiCompatible`] talks to every
//! OpenAI-compatible endpoint; [`reasoning::TaggedReasoning`] wraps a model
//! whose chain of thought is inlined between tags; [`ModelRegistry`] maps
//! the ids clients select to configured models.

pub mod openai_compat;
pub mod prompts;
pub mod reasoning;
pub mod registry;

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;
use parley_types::Attachment;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

pub use registry::{ModelRegistry, ProviderSettings};

/// An incremental event from a streaming completion.
#[derive(Debug, Clone, PartialEq)]
pub enum LlmEvent {
    /// A chunk of answer text.
    Text(String),
    /// A chunk of reasoning / chain-of-thought text.
    Reasoning(String),
    /// A chunk of a tool call being built; see [`ToolCallBuilder`].
    ToolCall {
        index: usize,
        id: Option<String>,
        function_name: Option<String>,
        arguments_delta: String,
    },
    /// Token usage reported at the end of the stream.
    Usage {
        prompt_tokens: u32,
        completion_tokens: u32,
    },
}

pub type LlmEventStream = Pin<Box<dyn Stream<Item = Result<LlmEvent, LlmError>> + Send>>;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("API error ({status}): {body}")]
    Api { status: u16, body: String },

    #[error("network error: {0}")]
    Network(String),

    #[error("stream parse error: {0}")]
    StreamParse(String),

    #[error("unknown model: {0}")]
    UnknownModel(String),
}

impl From<reqwest::Error> for LlmError {
    fn from(e: reqwest::Error) -> Self {
        LlmError::Network(e.to_string())
    }
}

/// A tool as advertised to the model.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolDef {
    pub name: String,
    pub description: String,
    /// JSON schema of the tool input.
    pub parameters: Value,
}

/// A complete tool call requested by the model.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    /// Raw JSON arguments as produced by the model.
    pub arguments: String,
}

impl ToolCall {
    /// Arguments parsed as JSON. Empty arguments mean `{}`; unparseable
    /// arguments are kept as a JSON string so the tool can report them.
    pub fn parsed_arguments(&self) -> Value {
        if self.arguments.trim().is_empty() {
            return Value::Object(Default::default());
        }
        serde_json::from_str(&self.arguments).unwrap_or_else(|_| Value::String(self.arguments.clone()))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PromptMessage {
    System {
        content: String,
    },
    User {
        content: String,
        attachments: Vec<Attachment>,
    },
    Assistant {
        content: Option<String>,
        tool_calls: Vec<ToolCall>,
    },
    Tool {
        tool_call_id: String,
        content: String,
    },
}

impl PromptMessage {
    pub fn user(content: impl Into<String>) -> Self {
        PromptMessage::User {
            content: content.into(),
            attachments: Vec::new(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        PromptMessage::Assistant {
            content: Some(content.into()),
            tool_calls: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompletionRequest {
    pub system: Option<String>,
    pub messages: Vec<PromptMessage>,
    /// Tools the model may call. Empty disables tool use.
    pub tools: Vec<ToolDef>,
}

impl CompletionRequest {
    /// A single-prompt request without tools.
    pub fn prompt(system: Option<String>, prompt: impl Into<String>) -> Self {
        Self {
            system,
            messages: vec![PromptMessage::user(prompt)],
            tools: Vec::new(),
        }
    }
}

/// A completion-capable model.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Upstream model name, for logging.
    fn model_id(&self) -> &str;

    /// Run a completion to the end and return its text.
    async fn generate(&self, request: &CompletionRequest) -> Result<String, LlmError>;

    /// Start a streaming completion.
    async fn stream(&self, request: &CompletionRequest) -> Result<LlmEventStream, LlmError>;
}

/// Highest number of parallel tool calls accepted from one completion.
pub const MAX_TOOL_CALLS: usize = 128;

/// Accumulates tool call deltas into complete [`ToolCall`] values.
#[derive(Default)]
pub struct ToolCallBuilder {
    entries: Vec<ToolCallEntry>,
}

#[derive(Default)]
struct ToolCallEntry {
    id: String,
    name: String,
    arguments: String,
}

impl ToolCallBuilder {
    /// Merge one delta. The index is provider input, so anything at or past
    /// [`MAX_TOOL_CALLS`] is a malformed stream.
    pub fn push(&mut self, index: usize, id: Option<&str>, name: Option<&str>, args: &str) -> Result<(), LlmError> {
        if index >= MAX_TOOL_CALLS {
            return Err(LlmError::StreamParse(format!("tool call index {index} out of range")));
        }
        if index >= self.entries.len() {
            self.entries.resize_with(index + 1, ToolCallEntry::default);
        }
        let entry = &mut self.entries[index];
        if let Some(id) = id {
            entry.id.push_str(id);
        }
        if let Some(name) = name {
            entry.name.push_str(name);
        }
        entry.arguments.push_str(args);
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Finished tool calls; entries that never received a name are dropped.
    #[must_use]
    pub fn finish(self) -> Vec<ToolCall> {
        self.entries
            .into_iter()
            .filter(|e| !e.name.is_empty())
            .map(|e| ToolCall {
                id: if e.id.is_empty() {
                    format!("call_{}", uuid::Uuid::new_v4().simple())
                } else {
                    e.id
                },
                name: e.name,
                arguments: e.arguments,
            })
            .collect()
    }
}
