//! The streamed, tool-augmented completion of a turn.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use parley_types::{MessagePart, ToolInvocation, ToolInvocationState};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::error::ChatError;
use crate::llm::{CompletionRequest, LanguageModel, LlmEvent, PromptMessage, ToolCallBuilder};
use crate::stream::{FinishReason, StreamPart, Usage, WordChunker};
use crate::tools::{ToolContext, ToolRegistry};

/// What a finished run produced, ready to be stored as the assistant message.
#[derive(Debug)]
pub(crate) struct TurnOutcome {
    pub message_id: String,
    pub parts: Vec<MessagePart>,
    pub usage: Usage,
}

pub(crate) struct TurnRunner {
    pub model: Arc<dyn LanguageModel>,
    pub tools: Arc<ToolRegistry>,
    pub use_tools: bool,
    pub ctx: ToolContext,
    pub tx: mpsc::Sender<StreamPart>,
    pub max_steps: usize,
    pub stream_delay: Duration,
}

impl TurnRunner {
    /// Sends are best effort: a departed client must not stop the turn.
    async fn emit(&self, part: StreamPart) {
        let _ = self.tx.send(part).await;
    }

    async fn emit_text(&self, chunk: String) {
        self.emit(StreamPart::Text(chunk)).await;
        if !self.stream_delay.is_zero() {
            tokio::time::sleep(self.stream_delay).await;
        }
    }

    pub async fn run(&self, mut request: CompletionRequest) -> Result<TurnOutcome, ChatError> {
        let message_id = uuid::Uuid::new_v4().to_string();
        let mut parts = Vec::new();
        let mut total = Usage::default();
        let mut finish_reason = FinishReason::Stop;

        for step in 0..self.max_steps {
            self.emit(StreamPart::StartStep {
                message_id: message_id.clone(),
            })
            .await;
            parts.push(MessagePart::StepStart);

            let mut stream = self.model.stream(&request).await?;
            let mut chunker = WordChunker::default();
            let mut text = String::new();
            let mut reasoning = String::new();
            let mut builder = ToolCallBuilder::default();
            let mut usage = Usage::default();

            while let Some(event) = stream.next().await {
                match event? {
                    LlmEvent::Text(delta) => {
                        text.push_str(&delta);
                        for word in chunker.push(&delta) {
                            self.emit_text(word).await;
                        }
                    }
                    LlmEvent::Reasoning(delta) => {
                        reasoning.push_str(&delta);
                        self.emit(StreamPart::Reasoning(delta)).await;
                    }
                    LlmEvent::ToolCall {
                        index,
                        id,
                        function_name,
                        arguments_delta,
                    } => builder.push(index, id.as_deref(), function_name.as_deref(), &arguments_delta)?,
                    LlmEvent::Usage {
                        prompt_tokens,
                        completion_tokens,
                    } => {
                        usage = Usage {
                            prompt_tokens,
                            completion_tokens,
                        }
                    }
                }
            }
            if let Some(rest) = chunker.finish() {
                self.emit_text(rest).await;
            }
            total.add(usage);

            if !reasoning.is_empty() {
                parts.push(MessagePart::Reasoning { reasoning });
            }
            if !text.is_empty() {
                parts.push(MessagePart::text(text.clone()));
            }

            let calls = if self.use_tools { builder.finish() } else { Vec::new() };
            if calls.is_empty() {
                finish_reason = FinishReason::Stop;
                self.emit(StreamPart::FinishStep {
                    finish_reason,
                    usage,
                    is_continued: false,
                })
                .await;
                break;
            }

            let mut tool_messages = Vec::with_capacity(calls.len());
            for call in &calls {
                let args = call.parsed_arguments();
                debug!(tool = %call.name, step, "executing tool call");
                self.emit(StreamPart::ToolCall {
                    tool_call_id: call.id.clone(),
                    tool_name: call.name.clone(),
                    args: args.clone(),
                })
                .await;
                let result = self.tools.execute(&call.name, args.clone(), &self.ctx).await;
                self.emit(StreamPart::ToolResult {
                    tool_call_id: call.id.clone(),
                    result: result.clone(),
                })
                .await;
                tool_messages.push(PromptMessage::Tool {
                    tool_call_id: call.id.clone(),
                    content: result.to_string(),
                });
                parts.push(MessagePart::ToolInvocation {
                    tool_invocation: ToolInvocation {
                        state: ToolInvocationState::Result,
                        step: u32::try_from(step).ok(),
                        tool_call_id: call.id.clone(),
                        tool_name: call.name.clone(),
                        args,
                        result: Some(result),
                    },
                });
            }

            request.messages.push(PromptMessage::Assistant {
                content: (!text.is_empty()).then_some(text),
                tool_calls: calls,
            });
            request.messages.extend(tool_messages);
            finish_reason = FinishReason::ToolCalls;
            self.emit(StreamPart::FinishStep {
                finish_reason,
                usage,
                is_continued: false,
            })
            .await;
        }

        self.emit(StreamPart::FinishMessage {
            finish_reason,
            usage: total,
        })
        .await;
        info!(
            message_id = %message_id,
            model = self.model.model_id(),
            prompt_tokens = total.prompt_tokens,
            completion_tokens = total.completion_tokens,
            "turn stream finished"
        );
        Ok(TurnOutcome {
            message_id,
            parts,
            usage: total,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedModel;
    use crate::tools::DataSink;
    use serde_json::json;

    async fn run(model: ScriptedModel, use_tools: bool, max_steps: usize) -> (Result<TurnOutcome, ChatError>, Vec<StreamPart>, Arc<ScriptedModel>) {
        let model = Arc::new(model);
        let (tx, mut rx) = mpsc::channel(256);
        let runner = TurnRunner {
            model: model.clone(),
            tools: Arc::new(ToolRegistry::new()),
            use_tools,
            ctx: ToolContext { user_id: "u1".into(), data: DataSink::disabled() },
            tx,
            max_steps,
            stream_delay: Duration::ZERO,
        };
        let outcome = runner.run(CompletionRequest::prompt(None, "hi")).await;
        drop(runner);
        let mut parts = Vec::new();
        while let Some(part) = rx.recv().await {
            parts.push(part);
        }
        (outcome, parts, model)
    }

    fn tool_call_events() -> Vec<LlmEvent> {
        vec![LlmEvent::ToolCall {
            index: 0,
            id: Some("call_1".into()),
            function_name: Some("queryDatabase".into()),
            arguments_delta: "{\"query\":\"x\"}".into(),
        }]
    }

    #[tokio::test]
    async fn plain_answer_is_word_chunked() {
        let model = ScriptedModel::new().with_stream_text(&["Hel", "lo wor", "ld"]);
        let (outcome, parts, _) = run(model, true, 5).await;
        let outcome = outcome.unwrap();

        let texts: Vec<&str> = parts
            .iter()
            .filter_map(|p| match p {
                StreamPart::Text(t) => Some(t.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(texts, vec!["Hello ", "world"]);
        assert!(matches!(parts[0], StreamPart::StartStep { .. }));
        assert!(matches!(
            parts.last(),
            Some(StreamPart::FinishMessage { finish_reason: FinishReason::Stop, .. })
        ));
        assert_eq!(outcome.parts, vec![MessagePart::StepStart, MessagePart::text("Hello world")]);
    }

    #[tokio::test]
    async fn tool_calls_loop_back_into_the_model() {
        let model = ScriptedModel::new()
            .with_stream(tool_call_events())
            .with_stream_text(&["Nothing ", "found."]);
        let (outcome, parts, model) = run(model, true, 5).await;
        let outcome = outcome.unwrap();

        assert!(parts.iter().any(|p| matches!(p, StreamPart::ToolCall { tool_name, .. } if tool_name == "queryDatabase")));
        let result = parts
            .iter()
            .find_map(|p| match p {
                StreamPart::ToolResult { result, .. } => Some(result.clone()),
                _ => None,
            })
            .unwrap();
        assert_eq!(result, json!({ "success": false, "message": "tool not found: queryDatabase" }));

        let requests = model.requests();
        assert_eq!(requests.len(), 2);
        assert!(matches!(requests[1].messages.last(), Some(PromptMessage::Tool { tool_call_id, .. }) if tool_call_id == "call_1"));

        assert_eq!(outcome.parts.len(), 4);
        assert!(matches!(&outcome.parts[1], MessagePart::ToolInvocation { tool_invocation } if tool_invocation.state == ToolInvocationState::Result));
        assert_eq!(outcome.parts[3], MessagePart::text("Nothing found."));
    }

    #[tokio::test]
    async fn step_limit_stops_the_loop() {
        let model = ScriptedModel::new().with_stream(tool_call_events()).with_stream(tool_call_events());
        let (outcome, parts, model) = run(model, true, 2).await;
        assert!(outcome.is_ok());
        assert_eq!(model.requests().len(), 2);
        assert!(matches!(
            parts.last(),
            Some(StreamPart::FinishMessage { finish_reason: FinishReason::ToolCalls, .. })
        ));
    }

    #[tokio::test]
    async fn tools_are_ignored_when_disabled() {
        let mut events = vec![LlmEvent::Reasoning("thinking".into())];
        events.extend(tool_call_events());
        events.push(LlmEvent::Text("done".into()));
        let (outcome, parts, model) = run(ScriptedModel::new().with_stream(events), false, 5).await;
        assert_eq!(model.requests().len(), 1);
        assert!(parts.contains(&StreamPart::Reasoning("thinking".into())));
        assert!(!parts.iter().any(|p| matches!(p, StreamPart::ToolCall { .. })));
        let outcome = outcome.unwrap();
        assert_eq!(outcome.parts[1], MessagePart::Reasoning { reasoning: "thinking".into() });
    }

    #[tokio::test]
    async fn upstream_failure_is_returned() {
        let (outcome, _, _) = run(ScriptedModel::new().with_failed_stream("boom"), true, 5).await;
        assert!(matches!(outcome, Err(ChatError::Upstream(_))));
    }
}
