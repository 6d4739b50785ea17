//! Alternative completions generated before the streamed answer.

use std::sync::Arc;

use parley_types::{AssistantAlternative, EvaluatorRegistry, UiMessage};
use tracing::debug;

use crate::error::ChatError;
use crate::llm::{CompletionRequest, ModelRegistry, PromptMessage};

/// Upper bound on alternatives per turn.
pub const MAX_ALTERNATIVES: usize = 10;

#[derive(Debug, Clone)]
pub struct AlternativeGenerator {
    models: Arc<ModelRegistry>,
    default_model: String,
}

impl AlternativeGenerator {
    pub fn new(models: Arc<ModelRegistry>, default_model: impl Into<String>) -> Self {
        Self {
            models,
            default_model: default_model.into(),
        }
    }

    /// One completion for `message`, with `model` or the default model.
    pub async fn generate(&self, message: &UiMessage, model: Option<&str>) -> Result<String, ChatError> {
        let model_id = model.unwrap_or(&self.default_model);
        let model = self.models.get(model_id)?;
        let request = CompletionRequest {
            system: None,
            messages: vec![PromptMessage::User {
                content: message.text(),
                attachments: message.attachments(),
            }],
            tools: Vec::new(),
        };
        let text = model.generate(&request).await?;
        debug!(model = model_id, len = text.len(), "alternative generated");
        Ok(text)
    }

    /// `count` completions, one after another. The first failure aborts
    /// the batch.
    pub async fn generate_many(&self, message: &UiMessage, count: usize) -> Result<Vec<String>, ChatError> {
        if count > MAX_ALTERNATIVES {
            return Err(ChatError::BadRequest(format!(
                "at most {MAX_ALTERNATIVES} alternatives may be requested"
            )));
        }
        let mut texts = Vec::with_capacity(count);
        for _ in 0..count {
            texts.push(self.generate(message, None).await?);
        }
        Ok(texts)
    }
}

/// Wrap `texts` as alternatives; with a non-empty `evaluators` selection each
/// carries its evaluation results.
pub fn annotate(texts: Vec<String>, evaluators: &EvaluatorRegistry) -> Vec<AssistantAlternative> {
    texts
        .into_iter()
        .map(|text| {
            let evaluations = (!evaluators.is_empty()).then(|| evaluators.evaluate(&text));
            AssistantAlternative { text, evaluations }
        })
        .collect()
}
