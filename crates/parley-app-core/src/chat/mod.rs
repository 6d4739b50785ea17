//! Turn orchestration and the chat-facing operations around it.
//!
//! A turn moves through `received → authorized → chat-resolved →
//! alternatives-generated → user-message-persisted → streaming →
//! completed | stream-error`. Everything up to persisting the user message
//! happens before [`ChatService::start_turn`] returns, so failures there are
//! reported as typed errors. From then on the turn runs in a background task
//! that feeds the returned stream; it keeps going if the client goes away.

mod agent;
pub mod convert;

use std::sync::Arc;
use std::time::Duration;

use parley_types::message::most_recent_user_message;
use parley_types::models::DEFAULT_ALTERNATIVE_MODEL;
use parley_types::{
    Chat, Document, EvaluatorRegistry, Message, MessageMetadata, Role, Suggestion, UiMessage, Vote, VoteType,
};
use serde::{Deserialize, Deserializer, Serialize};
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{Instrument, error, info, warn};

use crate::alternatives::{AlternativeGenerator, MAX_ALTERNATIVES, annotate};
use crate::entities::Store;
use crate::error::ChatError;
use crate::llm::prompts::system_prompt;
use crate::llm::{CompletionRequest, ModelRegistry};
use crate::stream::{STREAM_ERROR_MESSAGE, StreamPart};
use crate::title::generate_title;
use crate::tools::{DataSink, ToolContext, ToolRegistry};

use agent::{TurnOutcome, TurnRunner};

/// Stream of wire parts for one turn.
pub type TurnStream = ReceiverStream<StreamPart>;

const STREAM_BUFFER: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatConfig {
    /// Model calls per turn, tool round-trips included.
    pub max_steps: usize,
    /// Wall-clock budget of a whole turn.
    pub max_duration: Duration,
    /// Pause between streamed words.
    pub stream_delay: Duration,
    pub alternative_model: String,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            max_steps: 5,
            max_duration: Duration::from_secs(60),
            stream_delay: Duration::from_millis(10),
            alternative_model: DEFAULT_ALTERNATIVE_MODEL.to_owned(),
        }
    }
}

/// The authenticated user behind a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub user_id: String,
}

impl Caller {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self { user_id: user_id.into() }
    }
}

/// Body of a turn request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnRequest {
    pub id: String,
    pub messages: Vec<UiMessage>,
    pub selected_chat_model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<TurnOptions>,
}

/// Optional alternative generation for a turn.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnOptions {
    /// `null` and non-positive counts mean no alternatives.
    #[serde(default, deserialize_with = "lenient_count")]
    pub count: usize,
    #[serde(default)]
    pub evaluators: Vec<String>,
}

fn lenient_count<'de, D: Deserializer<'de>>(deserializer: D) -> Result<usize, D::Error> {
    let raw = Option::<i64>::deserialize(deserializer)?;
    Ok(raw.map_or(0, |n| usize::try_from(n.max(0)).unwrap_or(usize::MAX)))
}

/// Evaluator ids without duplicates, first occurrence kept.
fn dedup_keys(keys: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(keys.len());
    for key in keys {
        if !out.contains(key) {
            out.push(key.clone());
        }
    }
    out
}

fn require(caller: Option<&Caller>) -> Result<&Caller, ChatError> {
    caller.ok_or_else(|| ChatError::Unauthorized("no session".to_owned()))
}

#[derive(Debug, Clone)]
pub struct ChatService<S> {
    store: S,
    models: Arc<ModelRegistry>,
    tools: Arc<ToolRegistry>,
    evaluators: Arc<EvaluatorRegistry>,
    alternatives: AlternativeGenerator,
    config: Arc<ChatConfig>,
}

impl<S: Store> ChatService<S> {
    pub fn new(store: S, models: Arc<ModelRegistry>, tools: Arc<ToolRegistry>, config: ChatConfig) -> Self {
        let alternatives = AlternativeGenerator::new(models.clone(), config.alternative_model.clone());
        Self {
            store,
            models,
            tools,
            evaluators: Arc::new(EvaluatorRegistry::builtin()),
            alternatives,
            config: Arc::new(config),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn models(&self) -> &ModelRegistry {
        &self.models
    }

    // ── Turn ─────────────────────────────────────────────────────────────────

    /// Validate and prepare a turn, then start streaming it.
    pub async fn start_turn(&self, caller: Option<&Caller>, request: TurnRequest) -> Result<TurnStream, ChatError> {
        let deadline = Instant::now() + self.config.max_duration;
        let caller = require(caller)?;
        let prepared = tokio::time::timeout_at(deadline, self.prepare(caller, &request))
            .await
            .map_err(|_| ChatError::Timeout)??;
        Ok(self.spawn_stream(caller, request, prepared, deadline))
    }

    async fn prepare(&self, caller: &Caller, request: &TurnRequest) -> Result<MessageMetadata, ChatError> {
        let user_message = most_recent_user_message(&request.messages)
            .ok_or_else(|| ChatError::BadRequest("No user message found".to_owned()))?;
        if !self.models.is_selectable(&request.selected_chat_model) {
            return Err(ChatError::BadRequest(format!(
                "unknown model: {}",
                request.selected_chat_model
            )));
        }
        let options = request.data.clone().unwrap_or_default();
        if options.count > MAX_ALTERNATIVES {
            return Err(ChatError::BadRequest(format!(
                "at most {} alternatives may be requested",
                MAX_ALTERNATIVES
            )));
        }

        self.resolve_chat(caller, &request.id, user_message).await?;

        let evaluation_set = dedup_keys(&options.evaluators);
        let texts = self.alternatives.generate_many(user_message, options.count).await?;
        let selected = self.evaluators.select(&evaluation_set);
        let metadata = MessageMetadata {
            assistant_messages: annotate(texts, &selected),
            evaluation_set,
        };

        let stored = Message::from_ui(user_message, &request.id, metadata.clone());
        self.store.save_messages(std::slice::from_ref(&stored)).await?;
        info!(
            chat_id = %request.id,
            message_id = %stored.id,
            alternatives = metadata.assistant_messages.len(),
            "user message saved"
        );
        Ok(metadata)
    }

    /// Create the chat on its first turn, or check that the caller owns it.
    async fn resolve_chat(&self, caller: &Caller, chat_id: &str, user_message: &UiMessage) -> Result<Chat, ChatError> {
        if let Some(chat) = self.store.get_chat_by_id(chat_id).await? {
            if !chat.is_owned_by(&caller.user_id) {
                warn!(chat_id, user_id = %caller.user_id, "turn on a foreign chat rejected");
                return Err(ChatError::Unauthorized("chat belongs to another user".to_owned()));
            }
            return Ok(chat);
        }
        let title = generate_title(&self.models, user_message).await?;
        let chat = Chat::new(chat_id, caller.user_id.clone(), title);
        self.store.save_chat(&chat).await?;
        info!(chat_id, user_id = %caller.user_id, title = %chat.title, "chat created");
        Ok(chat)
    }

    fn spawn_stream(&self, caller: &Caller, request: TurnRequest, metadata: MessageMetadata, deadline: Instant) -> TurnStream {
        let (tx, rx) = mpsc::channel(STREAM_BUFFER);
        let model_id = request.selected_chat_model;
        let chat_id = request.id;
        let use_tools = self.models.supports_tools(&model_id);

        let completion = CompletionRequest {
            system: Some(system_prompt(&model_id)),
            messages: convert::to_prompt(&request.messages),
            tools: if use_tools { self.tools.defs() } else { Vec::new() },
        };
        let service = self.clone();
        let user_id = caller.user_id.clone();

        tokio::spawn(async move {
            let model = match service.models.get(&model_id) {
                Ok(model) => model,
                Err(e) => {
                    error!(error = %e, "turn model vanished");
                    let _ = tx.send(StreamPart::Error(STREAM_ERROR_MESSAGE.to_owned())).await;
                    return;
                }
            };
            let runner = TurnRunner {
                model,
                tools: service.tools.clone(),
                use_tools,
                ctx: ToolContext {
                    user_id,
                    data: DataSink::new(tx.clone()),
                },
                tx: tx.clone(),
                max_steps: service.config.max_steps,
                stream_delay: service.config.stream_delay,
            };

            let outcome = match tokio::time::timeout_at(deadline, runner.run(completion)).await {
                Ok(result) => result,
                Err(_) => Err(ChatError::Timeout),
            };
            match outcome {
                Ok(outcome) => {
                    if let Err(e) = service.persist_response(&chat_id, outcome, metadata).await {
                        error!(chat_id = %chat_id, error = %e, "failed to save assistant message");
                    }
                }
                Err(e) => {
                    error!(chat_id = %chat_id, model = %model_id, error = %e, "turn stream failed");
                    let _ = tx.send(StreamPart::Error(STREAM_ERROR_MESSAGE.to_owned())).await;
                }
            }
        }
        .in_current_span());

        ReceiverStream::new(rx)
    }

    /// Store the assistant message of a completed turn with the turn's
    /// metadata.
    async fn persist_response(&self, chat_id: &str, outcome: TurnOutcome, metadata: MessageMetadata) -> Result<(), ChatError> {
        let message = Message::new(outcome.message_id, chat_id, Role::Assistant, outcome.parts, metadata, Vec::new());
        self.store.save_messages(std::slice::from_ref(&message)).await?;
        info!(
            chat_id,
            message_id = %message.id,
            completion_tokens = outcome.usage.completion_tokens,
            "assistant message saved"
        );
        Ok(())
    }

    // ── Chats ────────────────────────────────────────────────────────────────

    /// Delete a chat owned by the caller.
    pub async fn delete_chat(&self, caller: Option<&Caller>, id: Option<&str>) -> Result<(), ChatError> {
        let id = id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| ChatError::NotFound("Not Found".to_owned()))?;
        let caller = require(caller)?;
        self.owned_chat(caller, id).await?;
        self.store.delete_chat_by_id(id).await?;
        info!(chat_id = id, user_id = %caller.user_id, "chat deleted");
        Ok(())
    }

    /// The caller's chats, newest first.
    pub async fn history(&self, caller: Option<&Caller>) -> Result<Vec<Chat>, ChatError> {
        let caller = require(caller)?;
        Ok(self.store.get_chats_by_user_id(&caller.user_id).await?)
    }

    /// Messages of a caller-owned chat in creation order.
    pub async fn messages(&self, caller: Option<&Caller>, chat_id: &str) -> Result<Vec<Message>, ChatError> {
        let caller = require(caller)?;
        self.owned_chat(caller, chat_id).await?;
        Ok(self.store.get_messages_by_chat_id(chat_id).await?)
    }

    async fn owned_chat(&self, caller: &Caller, chat_id: &str) -> Result<Chat, ChatError> {
        let chat = self
            .store
            .get_chat_by_id(chat_id)
            .await?
            .ok_or_else(|| ChatError::NotFound("Chat not found".to_owned()))?;
        if !chat.is_owned_by(&caller.user_id) {
            return Err(ChatError::Unauthorized("chat belongs to another user".to_owned()));
        }
        Ok(chat)
    }

    // ── Votes ────────────────────────────────────────────────────────────────

    pub async fn votes(&self, caller: Option<&Caller>, chat_id: &str) -> Result<Vec<Vote>, ChatError> {
        let caller = require(caller)?;
        self.owned_chat(caller, chat_id).await?;
        Ok(self.store.get_votes_by_chat_id(chat_id).await?)
    }

    pub async fn vote(&self, caller: Option<&Caller>, chat_id: &str, message_id: &str, vote: VoteType) -> Result<(), ChatError> {
        let caller = require(caller)?;
        self.owned_chat(caller, chat_id).await?;
        if !self.store.vote_message(chat_id, message_id, vote).await? {
            return Err(ChatError::NotFound("Message not found".to_owned()));
        }
        info!(chat_id, message_id, vote = %vote, "message voted");
        Ok(())
    }

    // ── Documents ────────────────────────────────────────────────────────────

    /// Every version of a caller-owned document, oldest first.
    pub async fn documents(&self, caller: Option<&Caller>, id: &str) -> Result<Vec<Document>, ChatError> {
        let caller = require(caller)?;
        let versions = self.store.get_documents_by_id(id).await?;
        let Some(first) = versions.first() else {
            return Err(ChatError::NotFound("Document not found".to_owned()));
        };
        if first.user_id != caller.user_id {
            return Err(ChatError::Unauthorized("document belongs to another user".to_owned()));
        }
        Ok(versions)
    }

    pub async fn suggestions(&self, caller: Option<&Caller>, document_id: &str) -> Result<Vec<Suggestion>, ChatError> {
        let caller = require(caller)?;
        let doc = self
            .store
            .get_document_by_id(document_id)
            .await?
            .ok_or_else(|| ChatError::NotFound("Document not found".to_owned()))?;
        if doc.user_id != caller.user_id {
            return Err(ChatError::Unauthorized("document belongs to another user".to_owned()));
        }
        Ok(self.store.get_suggestions_by_document_id(document_id).await?)
    }
}
