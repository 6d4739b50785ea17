//! Shared types for parley.
//!
//! Everything in here is plain data plus pure functions: the chat/message
//! model persisted by `parley-app-core`, the model catalog, and the
//! evaluators that score generated text identically on client and server.

pub mod chat;
pub mod document;
pub mod evaluation;
pub mod message;
pub mod models;

pub use chat::{Chat, Vote, VoteType};
pub use document::{Document, DocumentKind, Suggestion};
pub use evaluation::{EvaluationResult, EvaluationValue, Evaluator, EvaluatorRegistry};
pub use message::{
    AssistantAlternative, Attachment, Message, MessageMetadata, MessagePart, Role,
    ToolInvocation, ToolInvocationState, UiMessage,
};
pub use models::{ChatModel, Reasoning};
