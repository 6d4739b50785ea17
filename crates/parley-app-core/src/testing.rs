//! A scripted [`LanguageModel`] for tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use futures::StreamExt;

use crate::llm::{CompletionRequest, LanguageModel, LlmError, LlmEvent, LlmEventStream};

enum Script {
    Events(Vec<LlmEvent>),
    /// Emits the events, then never yields again.
    Stall(Vec<LlmEvent>),
    Fail(String),
}

enum Reply {
    Text(String),
    Fail(String),
    Stall,
}

/// Replies from queues filled up front. When a queue runs dry the model
/// answers with its default reply.
pub struct ScriptedModel {
    id: String,
    default_reply: String,
    generations: Mutex<VecDeque<Reply>>,
    streams: Mutex<VecDeque<Script>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl Default for ScriptedModel {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedModel {
    pub fn new() -> Self {
        Self {
            id: "scripted".to_owned(),
            default_reply: "Hello there!".to_owned(),
            generations: Mutex::new(VecDeque::new()),
            streams: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn with_reply(mut self, reply: &str) -> Self {
        self.default_reply = reply.to_owned();
        self
    }

    /// Queue the result of the next `generate` call.
    pub fn with_generation(self, text: &str) -> Self {
        lock(&self.generations).push_back(Reply::Text(text.to_owned()));
        self
    }

    /// Make the next `generate` call fail.
    pub fn with_failed_generation(self, message: &str) -> Self {
        lock(&self.generations).push_back(Reply::Fail(message.to_owned()));
        self
    }

    /// Make the next `generate` call hang.
    pub fn with_stalled_generation(self) -> Self {
        lock(&self.generations).push_back(Reply::Stall);
        self
    }

    /// Queue the events of the next `stream` call.
    pub fn with_stream(self, events: Vec<LlmEvent>) -> Self {
        lock(&self.streams).push_back(Script::Events(events));
        self
    }

    pub fn with_stream_text(self, chunks: &[&str]) -> Self {
        self.with_stream(chunks.iter().map(|c| LlmEvent::Text((*c).to_owned())).collect())
    }

    /// Queue a stream that hangs after `chunks`.
    pub fn with_stalled_stream(self, chunks: &[&str]) -> Self {
        let events = chunks.iter().map(|c| LlmEvent::Text((*c).to_owned())).collect();
        lock(&self.streams).push_back(Script::Stall(events));
        self
    }

    /// Make the next `stream` call fail before producing anything.
    pub fn with_failed_stream(self, message: &str) -> Self {
        lock(&self.streams).push_back(Script::Fail(message.to_owned()));
        self
    }

    /// Every request received so far, in order.
    pub fn requests(&self) -> Vec<CompletionRequest> {
        lock(&self.requests).clone()
    }

    fn record(&self, request: &CompletionRequest) {
        lock(&self.requests).push(request.clone());
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn upstream(message: String) -> LlmError {
    LlmError::Api { status: 500, body: message }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    fn model_id(&self) -> &str {
        &self.id
    }

    async fn generate(&self, request: &CompletionRequest) -> Result<String, LlmError> {
        self.record(request);
        let reply = lock(&self.generations).pop_front();
        match reply {
            Some(Reply::Text(text)) => Ok(text),
            Some(Reply::Fail(message)) => Err(upstream(message)),
            Some(Reply::Stall) => std::future::pending().await,
            None => Ok(self.default_reply.clone()),
        }
    }

    async fn stream(&self, request: &CompletionRequest) -> Result<LlmEventStream, LlmError> {
        self.record(request);
        let script = lock(&self.streams).pop_front();
        let events = match script {
            Some(Script::Events(events)) => events,
            Some(Script::Stall(events)) => {
                let head = futures::stream::iter(events.into_iter().map(Ok));
                return Ok(Box::pin(head.chain(futures::stream::pending())));
            }
            Some(Script::Fail(message)) => return Err(upstream(message)),
            None => vec![LlmEvent::Text(self.default_reply.clone())],
        };
        Ok(Box::pin(futures::stream::iter(events.into_iter().map(Ok))))
    }
}
