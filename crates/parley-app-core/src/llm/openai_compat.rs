//! Client for OpenAI-compatible chat-completion endpoints.
//!
//! OpenAI and Groq both speak this protocol, so one client type serves every
//! provider in the registry. Streaming uses server-sent events; each `data:`
//! line carries one JSON chunk and the stream ends with `data: [DONE]`.

use std::collections::VecDeque;
use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use super::{
    CompletionRequest, LanguageModel, LlmError, LlmEvent, LlmEventStream, PromptMessage,
    ProviderSettings, ToolDef,
};

/// A model served by an OpenAI-compatible endpoint.
#[derive(Debug, Clone)]
pub struct OpenAiCompatible {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
}

impl OpenAiCompatible {
    pub fn new(client: reqwest::Client, provider: &ProviderSettings, model: impl Into<String>) -> Self {
        Self {
            client,
            base_url: provider.base_url.trim_end_matches('/').to_owned(),
            api_key: provider.api_key.clone(),
            model: model.into(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    fn body<'a>(&'a self, request: &'a CompletionRequest, stream: bool) -> WireRequest<'a> {
        let mut messages = Vec::with_capacity(request.messages.len() + 1);
        if let Some(system) = &request.system {
            messages.push(WireMessage::System {
                content: system.clone(),
            });
        }
        messages.extend(request.messages.iter().map(to_wire_message));
        WireRequest {
            model: &self.model,
            messages,
            tools: request.tools.iter().map(to_wire_tool).collect(),
            stream,
            stream_options: stream.then_some(StreamOptions { include_usage: true }),
        }
    }

    async fn send(&self, body: &WireRequest<'_>) -> Result<reqwest::Response, LlmError> {
        let mut builder = self.client.post(self.endpoint()).json(body);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }
        let response = builder.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }
}

#[async_trait]
impl LanguageModel for OpenAiCompatible {
    fn model_id(&self) -> &str {
        &self.model
    }

    async fn generate(&self, request: &CompletionRequest) -> Result<String, LlmError> {
        let body = self.body(request, false);
        let response = self.send(&body).await?;
        let parsed: CompletionResponse = response
            .json()
            .await
            .map_err(|e| LlmError::StreamParse(format!("completion response: {e}")))?;
        let text = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();
        debug!(model = %self.model, output_len = text.len(), "completion done");
        Ok(text)
    }

    async fn stream(&self, request: &CompletionRequest) -> Result<LlmEventStream, LlmError> {
        let body = self.body(request, true);
        let response = self.send(&body).await?;
        debug!(model = %self.model, "completion stream opened");
        Ok(sse_events(Box::pin(response.bytes_stream())))
    }
}

// ── SSE decoding ─────────────────────────────────────────────────────────────

/// Splits a byte stream into SSE `data:` payloads. Bytes are buffered until a
/// full line is available so multi-byte characters may straddle chunks.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
}

impl SseDecoder {
    /// Feed a chunk; returns the data payloads of every completed line.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);
        let mut out = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            if let Some(data) = data_of(&String::from_utf8_lossy(&line)) {
                out.push(data);
            }
        }
        out
    }

    /// Payload of a trailing line that was not newline-terminated.
    pub fn finish(&mut self) -> Option<String> {
        let rest = std::mem::take(&mut self.buffer);
        data_of(&String::from_utf8_lossy(&rest))
    }
}

fn data_of(line: &str) -> Option<String> {
    let line = line.trim_end_matches(['\r', '\n']);
    let data = line.strip_prefix("data:")?;
    let data = data.strip_prefix(' ').unwrap_or(data);
    if data.is_empty() {
        None
    } else {
        Some(data.to_owned())
    }
}

#[derive(Debug, PartialEq)]
pub enum SseData {
    Events(Vec<LlmEvent>),
    Done,
}

/// Interpret one `data:` payload.
pub fn parse_sse_data(data: &str) -> Result<SseData, LlmError> {
    if data == "[DONE]" {
        return Ok(SseData::Done);
    }

    // Providers report upstream failures inline.
    if let Ok(err) = serde_json::from_str::<StreamError>(data) {
        let status = err
            .error
            .code
            .as_ref()
            .and_then(Value::as_u64)
            .and_then(|c| u16::try_from(c).ok())
            .unwrap_or(500);
        return Err(LlmError::Api {
            status,
            body: err.error.message,
        });
    }

    let chunk: StreamChunk = serde_json::from_str(data)
        .map_err(|e| LlmError::StreamParse(format!("SSE chunk {data}: {e}")))?;

    let mut events = Vec::new();
    for choice in chunk.choices {
        let delta = choice.delta;
        if let Some(reasoning) = delta.reasoning_content.or(delta.reasoning) {
            if !reasoning.is_empty() {
                events.push(LlmEvent::Reasoning(reasoning));
            }
        }
        if let Some(content) = delta.content {
            if !content.is_empty() {
                events.push(LlmEvent::Text(content));
            }
        }
        for tc in delta.tool_calls.unwrap_or_default() {
            let (name, args) = match tc.function {
                Some(f) => (f.name, f.arguments.unwrap_or_default()),
                None => (None, String::new()),
            };
            events.push(LlmEvent::ToolCall {
                index: tc.index,
                id: tc.id,
                function_name: name,
                arguments_delta: args,
            });
        }
        if let Some(reason) = choice.finish_reason {
            debug!(reason, "SSE finish_reason received");
        }
    }
    if let Some(usage) = chunk.usage {
        events.push(LlmEvent::Usage {
            prompt_tokens: usage.prompt_tokens,
            completion_tokens: usage.completion_tokens,
        });
    }
    Ok(SseData::Events(events))
}

type ByteStream = Pin<Box<dyn Stream<Item = reqwest::Result<Bytes>> + Send>>;

struct SseState {
    body: ByteStream,
    decoder: SseDecoder,
    pending: VecDeque<Result<LlmEvent, LlmError>>,
    done: bool,
}

impl SseState {
    fn absorb(&mut self, data: &str) {
        if self.done {
            return;
        }
        match parse_sse_data(data) {
            Ok(SseData::Events(events)) => self.pending.extend(events.into_iter().map(Ok)),
            Ok(SseData::Done) => self.done = true,
            Err(e) => {
                self.pending.push_back(Err(e));
                self.done = true;
            }
        }
    }
}

fn sse_events(body: ByteStream) -> LlmEventStream {
    let state = SseState {
        body,
        decoder: SseDecoder::default(),
        pending: VecDeque::new(),
        done: false,
    };
    Box::pin(futures::stream::unfold(state, |mut st| async move {
        loop {
            if let Some(event) = st.pending.pop_front() {
                return Some((event, st));
            }
            if st.done {
                return None;
            }
            match st.body.next().await {
                Some(Ok(bytes)) => {
                    for data in st.decoder.push(&bytes) {
                        st.absorb(&data);
                    }
                }
                Some(Err(e)) => {
                    st.pending.push_back(Err(e.into()));
                    st.done = true;
                }
                None => {
                    if let Some(data) = st.decoder.finish() {
                        st.absorb(&data);
                    }
                    st.done = true;
                }
            }
        }
    }))
}

// ── Wire types ───────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct WireRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<WireTool<'a>>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    stream_options: Option<StreamOptions>,
}

#[derive(Serialize)]
struct StreamOptions {
    include_usage: bool,
}

#[derive(Serialize)]
#[serde(tag = "role", rename_all = "lowercase")]
enum WireMessage {
    System {
        content: String,
    },
    User {
        content: WireUserContent,
    },
    Assistant {
        #[serde(skip_serializing_if = "Option::is_none")]
        content: Option<String>,
        #[serde(skip_serializing_if = "Vec::is_empty")]
        tool_calls: Vec<WireToolCall>,
    },
    Tool {
        tool_call_id: String,
        content: String,
    },
}

#[derive(Serialize)]
#[serde(untagged)]
enum WireUserContent {
    Text(String),
    Parts(Vec<WireContentPart>),
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum WireContentPart {
    Text { text: String },
    ImageUrl { image_url: WireImageUrl },
}

#[derive(Serialize)]
struct WireImageUrl {
    url: String,
}

#[derive(Serialize)]
struct WireToolCall {
    id: String,
    #[serde(rename = "type")]
    call_type: &'static str,
    function: WireFunctionCall,
}

#[derive(Serialize)]
struct WireFunctionCall {
    name: String,
    arguments: String,
}

#[derive(Serialize)]
struct WireTool<'a> {
    #[serde(rename = "type")]
    tool_type: &'static str,
    function: WireFunction<'a>,
}

#[derive(Serialize)]
struct WireFunction<'a> {
    name: &'a str,
    description: &'a str,
    parameters: &'a Value,
}

fn to_wire_message(msg: &PromptMessage) -> WireMessage {
    match msg {
        PromptMessage::System { content } => WireMessage::System {
            content: content.clone(),
        },
        PromptMessage::User {
            content,
            attachments,
        } => {
            let images: Vec<WireContentPart> = attachments
                .iter()
                .filter(|a| {
                    a.content_type
                        .as_deref()
                        .is_some_and(|t| t.starts_with("image/"))
                })
                .map(|a| WireContentPart::ImageUrl {
                    image_url: WireImageUrl { url: a.url.clone() },
                })
                .collect();
            if images.is_empty() {
                WireMessage::User {
                    content: WireUserContent::Text(content.clone()),
                }
            } else {
                let mut parts = vec![WireContentPart::Text {
                    text: content.clone(),
                }];
                parts.extend(images);
                WireMessage::User {
                    content: WireUserContent::Parts(parts),
                }
            }
        }
        PromptMessage::Assistant {
            content,
            tool_calls,
        } => WireMessage::Assistant {
            content: content.clone(),
            tool_calls: tool_calls
                .iter()
                .map(|tc| WireToolCall {
                    id: tc.id.clone(),
                    call_type: "function",
                    function: WireFunctionCall {
                        name: tc.name.clone(),
                        arguments: tc.arguments.clone(),
                    },
                })
                .collect(),
        },
        PromptMessage::Tool {
            tool_call_id,
            content,
        } => WireMessage::Tool {
            tool_call_id: tool_call_id.clone(),
            content: content.clone(),
        },
    }
}

fn to_wire_tool(tool: &ToolDef) -> WireTool<'_> {
    WireTool {
        tool_type: "function",
        function: WireFunction {
            name: &tool.name,
            description: &tool.description,
            parameters: &tool.parameters,
        },
    }
}

#[derive(Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<CompletionChoice>,
}

#[derive(Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Deserialize)]
struct CompletionMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
    usage: Option<WireUsage>,
}

#[derive(Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: Delta,
    finish_reason: Option<String>,
}

#[derive(Deserialize, Default)]
struct Delta {
    content: Option<String>,
    reasoning_content: Option<String>,
    reasoning: Option<String>,
    tool_calls: Option<Vec<DeltaToolCall>>,
}

#[derive(Deserialize)]
struct DeltaToolCall {
    #[serde(default)]
    index: usize,
    id: Option<String>,
    function: Option<DeltaFunction>,
}

#[derive(Deserialize)]
struct DeltaFunction {
    name: Option<String>,
    arguments: Option<String>,
}

#[derive(Deserialize)]
struct WireUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[derive(Deserialize)]
struct StreamError {
    error: StreamErrorBody,
}

#[derive(Deserialize)]
struct StreamErrorBody {
    message: String,
    code: Option<Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ToolCall;
    use futures::TryStreamExt;
    use httpmock::prelude::*;

    fn provider(base_url: String) -> ProviderSettings {
        ProviderSettings {
            name: "test".into(),
            base_url,
            api_key: Some("sk-test".into()),
        }
    }

    #[test]
    fn decoder_handles_split_lines_and_utf8() {
        let mut decoder = SseDecoder::default();
        let payload = "data: {\"x\":\"h\u{e9}\"}\n\ndata: [DONE]\n".as_bytes();
        let (a, b) = payload.split_at(12);
        assert!(decoder.push(a).is_empty());
        let out = decoder.push(b);
        assert_eq!(out, vec!["{\"x\":\"h\u{e9}\"}".to_owned(), "[DONE]".to_owned()]);
        assert_eq!(decoder.finish(), None);
    }

    #[test]
    fn decoder_flushes_unterminated_line() {
        let mut decoder = SseDecoder::default();
        assert!(decoder.push(b": keep-alive\ndata: [DONE]").is_empty());
        assert_eq!(decoder.finish().as_deref(), Some("[DONE]"));
    }

    #[test]
    fn parses_text_reasoning_tool_and_usage_chunks() {
        let chunk = r#"{"choices":[{"delta":{"reasoning_content":"thinking","content":"Hi","tool_calls":[{"index":0,"id":"call_1","function":{"name":"getWeather","arguments":"{}"}}]}}],"usage":{"prompt_tokens":3,"completion_tokens":4}}"#;
        let SseData::Events(events) = parse_sse_data(chunk).unwrap() else {
            panic!("expected events");
        };
        assert_eq!(
            events,
            vec![
                LlmEvent::Reasoning("thinking".into()),
                LlmEvent::Text("Hi".into()),
                LlmEvent::ToolCall {
                    index: 0,
                    id: Some("call_1".into()),
                    function_name: Some("getWeather".into()),
                    arguments_delta: "{}".into(),
                },
                LlmEvent::Usage { prompt_tokens: 3, completion_tokens: 4 },
            ]
        );
        assert_eq!(parse_sse_data("[DONE]").unwrap(), SseData::Done);
    }

    #[test]
    fn inline_errors_become_api_errors() {
        let err = parse_sse_data(r#"{"error":{"message":"rate limited","code":429}}"#).unwrap_err();
        assert!(matches!(err, LlmError::Api { status: 429, .. }));
        assert!(matches!(parse_sse_data("{not json").unwrap_err(), LlmError::StreamParse(_)));
    }

    #[test]
    fn request_body_carries_system_tools_and_tool_results() {
        let model = OpenAiCompatible::new(reqwest::Client::new(), &provider("http://x/v1/".into()), "gpt-4o");
        assert_eq!(model.endpoint(), "http://x/v1/chat/completions");
        let request = CompletionRequest {
            system: Some("be brief".into()),
            messages: vec![
                PromptMessage::user("weather?"),
                PromptMessage::Assistant {
                    content: None,
                    tool_calls: vec![ToolCall { id: "c1".into(), name: "getWeather".into(), arguments: "{}".into() }],
                },
                PromptMessage::Tool { tool_call_id: "c1".into(), content: "{\"ok\":true}".into() },
            ],
            tools: vec![ToolDef {
                name: "getWeather".into(),
                description: "weather".into(),
                parameters: serde_json::json!({ "type": "object" }),
            }],
        };
        let json = serde_json::to_value(model.body(&request, true)).unwrap();
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], "weather?");
        assert_eq!(json["messages"][2]["tool_calls"][0]["function"]["name"], "getWeather");
        assert!(json["messages"][2].get("content").is_none());
        assert_eq!(json["messages"][3]["tool_call_id"], "c1");
        assert_eq!(json["tools"][0]["type"], "function");
        assert_eq!(json["stream_options"]["include_usage"], true);
    }

    #[tokio::test]
    async fn streams_events_from_sse_endpoint() {
        let server = MockServer::start_async().await;
        let body = concat!(
            "data: {\"choices\":[{\"delta\":{\"content\":\"Hello\"}}]}\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\" world\"},\"finish_reason\":\"stop\"}]}\n\n",
            "data: [DONE]\n\n",
        );
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/v1/chat/completions")
                    .header("authorization", "Bearer sk-test")
                    .json_body_partial(r#"{"model":"gpt-4o","stream":true}"#);
                then.status(200)
                    .header("content-type", "text/event-stream")
                    .body(body);
            })
            .await;

        let model = OpenAiCompatible::new(reqwest::Client::new(), &provider(server.url("/v1")), "gpt-4o");
        let stream = model
            .stream(&CompletionRequest::prompt(None, "hi"))
            .await
            .unwrap();
        let events: Vec<LlmEvent> = stream.try_collect().await.unwrap();
        assert_eq!(
            events,
            vec![LlmEvent::Text("Hello".into()), LlmEvent::Text(" world".into())]
        );
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn generate_returns_message_content() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/v1/chat/completions")
                    .json_body_partial(r#"{"stream":false}"#);
                then.status(200)
                    .json_body(serde_json::json!({
                        "choices": [{ "message": { "role": "assistant", "content": "A title" } }]
                    }));
            })
            .await;

        let model = OpenAiCompatible::new(reqwest::Client::new(), &provider(server.url("/v1")), "gpt-4o");
        let text = model.generate(&CompletionRequest::prompt(None, "hi")).await.unwrap();
        assert_eq!(text, "A title");
    }

    #[tokio::test]
    async fn http_errors_surface_status_and_body() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/v1/chat/completions");
                then.status(401).body("bad key");
            })
            .await;

        let model = OpenAiCompatible::new(reqwest::Client::new(), &provider(server.url("/v1")), "gpt-4o");
        let err = model.generate(&CompletionRequest::prompt(None, "hi")).await.unwrap_err();
        match err {
            LlmError::Api { status, body } => {
                assert_eq!(status, 401);
                assert_eq!(body, "bad key");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }
}
