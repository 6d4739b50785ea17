//! Reasoning extraction for models that inline their chain of thought
//! between `<tag>` and `</tag>` in the answer text.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use futures::StreamExt;

use super::{CompletionRequest, LanguageModel, LlmError, LlmEvent, LlmEventStream};

/// Incremental splitter of tagged text into answer and reasoning chunks.
///
/// Tags may be split across chunks; a trailing fragment that could still
/// become a tag is held back until the next push or [`flush`](Self::flush).
#[derive(Debug)]
pub struct ReasoningExtractor {
    open: String,
    close: String,
    inside: bool,
    buffer: String,
}

impl ReasoningExtractor {
    pub fn new(tag: &str) -> Self {
        Self {
            open: format!("<{tag}>"),
            close: format!("</{tag}>"),
            inside: false,
            buffer: String::new(),
        }
    }

    pub fn push(&mut self, chunk: &str) -> Vec<LlmEvent> {
        self.buffer.push_str(chunk);
        let mut out = Vec::new();
        loop {
            let marker = if self.inside { &self.close } else { &self.open };
            if let Some(pos) = self.buffer.find(marker.as_str()) {
                let end = pos + marker.len();
                let before = self.buffer[..pos].to_owned();
                self.buffer.drain(..end);
                self.emit(before, &mut out);
                self.inside = !self.inside;
                continue;
            }

            let hold = partial_suffix(&self.buffer, marker);
            let split = self.buffer.len() - hold;
            let ready: String = self.buffer.drain(..split).collect();
            self.emit(ready, &mut out);
            return out;
        }
    }

    /// Emit whatever is still buffered, including an unfinished tag.
    pub fn flush(&mut self) -> Vec<LlmEvent> {
        let rest = std::mem::take(&mut self.buffer);
        let mut out = Vec::new();
        self.emit(rest, &mut out);
        out
    }

    fn emit(&self, text: String, out: &mut Vec<LlmEvent>) {
        if text.is_empty() {
            return;
        }
        out.push(if self.inside {
            LlmEvent::Reasoning(text)
        } else {
            LlmEvent::Text(text)
        });
    }
}

/// Length of the longest suffix of `text` that is a proper prefix of `marker`.
/// Markers start with `<`, so the split point is always a char boundary.
fn partial_suffix(text: &str, marker: &str) -> usize {
    (1..marker.len())
        .rev()
        .find(|&k| text.ends_with(&marker[..k]))
        .unwrap_or(0)
}

/// Route tagged text of `stream` into reasoning events.
pub fn extract_reasoning(stream: LlmEventStream, tag: &str) -> LlmEventStream {
    struct State {
        inner: LlmEventStream,
        extractor: ReasoningExtractor,
        pending: VecDeque<Result<LlmEvent, LlmError>>,
        done: bool,
    }

    let state = State {
        inner: stream,
        extractor: ReasoningExtractor::new(tag),
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
            match st.inner.next().await {
                Some(Ok(LlmEvent::Text(text))) => {
                    st.pending.extend(st.extractor.push(&text).into_iter().map(Ok));
                }
                Some(other) => st.pending.push_back(other),
                None => {
                    st.pending.extend(st.extractor.flush().into_iter().map(Ok));
                    st.done = true;
                }
            }
        }
    }))
}

/// A model whose reasoning arrives inline between tags.
pub struct TaggedReasoning {
    inner: Arc<dyn LanguageModel>,
    tag: String,
}

impl TaggedReasoning {
    pub fn new(inner: Arc<dyn LanguageModel>, tag: impl Into<String>) -> Self {
        Self {
            inner,
            tag: tag.into(),
        }
    }
}

#[async_trait]
impl LanguageModel for TaggedReasoning {
    fn model_id(&self) -> &str {
        self.inner.model_id()
    }

    /// Answer text only; reasoning is dropped.
    async fn generate(&self, request: &CompletionRequest) -> Result<String, LlmError> {
        let raw = self.inner.generate(request).await?;
        let mut extractor = ReasoningExtractor::new(&self.tag);
        let mut events = extractor.push(&raw);
        events.extend(extractor.flush());
        Ok(events
            .into_iter()
            .filter_map(|e| match e {
                LlmEvent::Text(t) => Some(t),
                _ => None,
            })
            .collect())
    }

    async fn stream(&self, request: &CompletionRequest) -> Result<LlmEventStream, LlmError> {
        let inner = self.inner.stream(request).await?;
        Ok(extract_reasoning(inner, &self.tag))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(tag: &str, chunks: &[&str]) -> Vec<LlmEvent> {
        let mut extractor = ReasoningExtractor::new(tag);
        let mut out: Vec<LlmEvent> = Vec::new();
        for chunk in chunks {
            out.extend(extractor.push(chunk));
        }
        out.extend(extractor.flush());
        // Merge adjacent events of the same kind for easier assertions.
        let mut merged: Vec<LlmEvent> = Vec::new();
        for event in out {
            match (merged.last_mut(), event) {
                (Some(LlmEvent::Text(a)), LlmEvent::Text(b)) => a.push_str(&b),
                (Some(LlmEvent::Reasoning(a)), LlmEvent::Reasoning(b)) => a.push_str(&b),
                (_, e) => merged.push(e),
            }
        }
        merged
    }

    #[test]
    fn splits_reasoning_from_answer() {
        assert_eq!(
            run("think", &["<think>plan</think>Answer"]),
            vec![LlmEvent::Reasoning("plan".into()), LlmEvent::Text("Answer".into())]
        );
    }

    #[test]
    fn handles_tags_split_across_chunks() {
        assert_eq!(
            run("think", &["Hi <th", "ink>so", "me</thi", "nk> bye"]),
            vec![
                LlmEvent::Text("Hi ".into()),
                LlmEvent::Reasoning("some".into()),
                LlmEvent::Text(" bye".into()),
            ]
        );
    }

    #[test]
    fn lone_angle_bracket_is_released_on_flush() {
        assert_eq!(run("think", &["a < b <"]), vec![LlmEvent::Text("a < b <".into())]);
    }

    #[test]
    fn multibyte_text_is_not_split_mid_char() {
        assert_eq!(
            run("reasoning", &["héllo <reas", "oning>ü</reasoning>ñ"]),
            vec![
                LlmEvent::Text("héllo ".into()),
                LlmEvent::Reasoning("ü".into()),
                LlmEvent::Text("ñ".into()),
            ]
        );
    }

    #[tokio::test]
    async fn stream_adapter_passes_other_events_through() {
        let events = vec![
            Ok(LlmEvent::Text("<think>x".into())),
            Ok(LlmEvent::Text("</think>y".into())),
            Ok(LlmEvent::Usage { prompt_tokens: 1, completion_tokens: 2 }),
        ];
        let stream: LlmEventStream = Box::pin(futures::stream::iter(events));
        let out: Vec<LlmEvent> = extract_reasoning(stream, "think")
            .map(|e| e.unwrap())
            .collect()
            .await;
        assert_eq!(
            out,
            vec![
                LlmEvent::Reasoning("x".into()),
                LlmEvent::Text("y".into()),
                LlmEvent::Usage { prompt_tokens: 1, completion_tokens: 2 },
            ]
        );
    }
}
