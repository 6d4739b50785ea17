//! Chat titles from the first user message.

use parley_types::UiMessage;
use parley_types::models::TITLE_MODEL;
use tracing::debug;

use crate::error::ChatError;
use crate::llm::prompts::TITLE_PROMPT;
use crate::llm::{CompletionRequest, ModelRegistry};

pub const MAX_TITLE_CHARS: usize = 80;
pub const FALLBACK_TITLE: &str = "New chat";

/// Ask the title model to summarise `message`.
pub async fn generate_title(models: &ModelRegistry, message: &UiMessage) -> Result<String, ChatError> {
    let model = models.get(TITLE_MODEL)?;
    let request = CompletionRequest::prompt(Some(TITLE_PROMPT.to_owned()), message.text());
    let raw = model.generate(&request).await?;
    let title = clean_title(&raw);
    debug!(title = %title, "chat title generated");
    Ok(title)
}

/// First line, trimmed, without surrounding quotes, capped at
/// [`MAX_TITLE_CHARS`] characters.
pub fn clean_title(raw: &str) -> String {
    let line = raw.trim().lines().next().unwrap_or_default();
    let unquoted = line.trim().trim_matches(|c| c == '"' || c == '\'' || c == '`').trim();
    if unquoted.is_empty() {
        return FALLBACK_TITLE.to_owned();
    }
    unquoted.chars().take(MAX_TITLE_CHARS).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedModel;
    use std::sync::Arc;

    #[test]
    fn cleans_model_output() {
        assert_eq!(clean_title("  \"Rust borrow checker\"\n"), "Rust borrow checker");
        assert_eq!(clean_title("Title\nextra words"), "Title");
        assert_eq!(clean_title("  "), FALLBACK_TITLE);
        assert_eq!(clean_title(&"é".repeat(100)).chars().count(), MAX_TITLE_CHARS);
    }

    #[tokio::test]
    async fn asks_the_title_model() {
        let model = Arc::new(ScriptedModel::new().with_generation("\"Greeting\""));
        let mut models = ModelRegistry::new();
        models.register(TITLE_MODEL, model.clone());
        let title = generate_title(&models, &UiMessage::user("m1", "hello")).await.unwrap();
        assert_eq!(title, "Greeting");
        assert_eq!(model.requests()[0].system.as_deref(), Some(TITLE_PROMPT));
    }
}
