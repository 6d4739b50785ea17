//! Data-stream wire format of the turn endpoint.
//!
//! Each part is one line `<code>:<json>\n`. Clients dispatch on the code.

mod chunker;

pub use chunker::WordChunker;

use bytes::Bytes;
use serde::Serialize;
use serde_json::{Value, json};

/// Response header announcing the stream protocol.
pub const DATA_STREAM_HEADER: &str = "x-vercel-ai-data-stream";
pub const DATA_STREAM_VERSION: &str = "v1";

/// Client-facing text of a failed stream.
pub const STREAM_ERROR_MESSAGE: &str = "Oops, an error occured!";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FinishReason {
    Stop,
    ToolCalls,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

impl Usage {
    /// Counts come from the provider; totals saturate instead of wrapping.
    pub fn add(&mut self, other: Usage) {
        self.prompt_tokens = self.prompt_tokens.saturating_add(other.prompt_tokens);
        self.completion_tokens = self.completion_tokens.saturating_add(other.completion_tokens);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StreamPart {
    StartStep { message_id: String },
    Text(String),
    Reasoning(String),
    /// Side-channel items, e.g. document deltas written by tools.
    Data(Vec<Value>),
    Error(String),
    ToolCall { tool_call_id: String, tool_name: String, args: Value },
    ToolResult { tool_call_id: String, result: Value },
    FinishStep { finish_reason: FinishReason, usage: Usage, is_continued: bool },
    FinishMessage { finish_reason: FinishReason, usage: Usage },
}

impl StreamPart {
    pub fn code(&self) -> char {
        match self {
            StreamPart::Text(_) => '0',
            StreamPart::Data(_) => '2',
            StreamPart::Error(_) => '3',
            StreamPart::ToolCall { .. } => '9',
            StreamPart::ToolResult { .. } => 'a',
            StreamPart::FinishMessage { .. } => 'd',
            StreamPart::FinishStep { .. } => 'e',
            StreamPart::StartStep { .. } => 'f',
            StreamPart::Reasoning(_) => 'g',
        }
    }

    fn payload(&self) -> Value {
        match self {
            StreamPart::StartStep { message_id } => json!({ "messageId": message_id }),
            StreamPart::Text(text) | StreamPart::Reasoning(text) | StreamPart::Error(text) => {
                Value::String(text.clone())
            }
            StreamPart::Data(items) => Value::Array(items.clone()),
            StreamPart::ToolCall { tool_call_id, tool_name, args } => {
                json!({ "toolCallId": tool_call_id, "toolName": tool_name, "args": args })
            }
            StreamPart::ToolResult { tool_call_id, result } => {
                json!({ "toolCallId": tool_call_id, "result": result })
            }
            StreamPart::FinishStep { finish_reason, usage, is_continued } => json!({
                "finishReason": finish_reason,
                "usage": usage,
                "isContinued": is_continued,
            }),
            StreamPart::FinishMessage { finish_reason, usage } => {
                json!({ "finishReason": finish_reason, "usage": usage })
            }
        }
    }

    /// The wire line, newline included.
    pub fn encode(&self) -> String {
        format!("{}:{}\n", self.code(), self.payload())
    }

    pub fn to_bytes(&self) -> Bytes {
        Bytes::from(self.encode())
    }
}
