use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use chrono::Utc;
use parley_types::Suggestion;
use parley_types::models::ARTIFACT_MODEL;
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use super::document::{DocumentOutput, load_owned};
use super::{Tool, ToolContext};
use crate::entities::DocumentStore;
use crate::llm::prompts::SUGGESTIONS_PROMPT;
use crate::llm::{CompletionRequest, ModelRegistry};

const MAX_SUGGESTIONS: usize = 5;

pub struct RequestSuggestions<S> {
    models: Arc<ModelRegistry>,
    store: S,
}

impl<S> RequestSuggestions<S> {
    pub fn new(models: Arc<ModelRegistry>, store: S) -> Self {
        Self { models, store }
    }
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SuggestionsInput {
    /// The id of the document to request suggestions for.
    document_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DraftSuggestion {
    original_sentence: String,
    suggested_sentence: String,
    #[serde(default)]
    description: Option<String>,
}

/// Parse the model's reply, tolerating a surrounding code fence.
fn parse_drafts(reply: &str) -> Result<Vec<DraftSuggestion>, String> {
    let trimmed = reply.trim();
    let body = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.strip_suffix("```"))
        .unwrap_or(trimmed);
    serde_json::from_str(body.trim()).map_err(|e| format!("could not parse suggestions: {e}"))
}

impl<S: DocumentStore> Tool for RequestSuggestions<S> {
    type Input = SuggestionsInput;
    type Output = DocumentOutput;

    fn name(&self) -> &'static str {
        "requestSuggestions"
    }

    fn description(&self) -> &'static str {
        "Request suggestions for a document"
    }

    fn execute<'a>(
        &'a self,
        input: SuggestionsInput,
        ctx: &'a ToolContext,
    ) -> Pin<Box<dyn Future<Output = Result<DocumentOutput, String>> + Send + 'a>> {
        Box::pin(async move {
            let Some(doc) = load_owned(&self.store, &input.document_id, &ctx.user_id).await? else {
                return Ok(DocumentOutput::not_found());
            };

            let model = self.models.get(ARTIFACT_MODEL).map_err(|e| e.to_string())?;
            let request = CompletionRequest::prompt(
                Some(SUGGESTIONS_PROMPT.to_owned()),
                doc.content.clone().unwrap_or_default(),
            );
            let reply = model.generate(&request).await.map_err(|e| e.to_string())?;

            let now = Utc::now();
            let suggestions: Vec<Suggestion> = parse_drafts(&reply)?
                .into_iter()
                .take(MAX_SUGGESTIONS)
                .map(|d| Suggestion {
                    id: uuid::Uuid::new_v4().to_string(),
                    document_id: doc.id.clone(),
                    document_created_at: doc.created_at,
                    original_text: d.original_sentence,
                    suggested_text: d.suggested_sentence,
                    description: d.description,
                    is_resolved: false,
                    user_id: ctx.user_id.clone(),
                    created_at: now,
                })
                .collect();

            for suggestion in &suggestions {
                ctx.data.write(json!({ "type": "suggestion", "content": suggestion })).await;
            }
            self.store.save_suggestions(&suggestions).await.map_err(|e| e.to_string())?;
            ctx.data.write(json!({ "type": "finish", "content": "" })).await;
            info!(document_id = %doc.id, count = suggestions.len(), "suggestions saved");
            Ok(DocumentOutput::done(&doc, "Suggestions have been added to the document"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::SqliteStore;
    use crate::testing::ScriptedModel;
    use crate::tools::{DataSink, ToolRegistry};
    use parley_types::{Document, DocumentKind};

    #[test]
    fn parses_fenced_and_bare_arrays() {
        let bare = r#"[{"originalSentence":"a","suggestedSentence":"b","description":"c"}]"#;
        assert_eq!(parse_drafts(bare).unwrap().len(), 1);
        let fenced = format!("```json\n{bare}\n```");
        assert_eq!(parse_drafts(&fenced).unwrap()[0].suggested_sentence, "b");
        assert!(parse_drafts("no idea").is_err());
    }

    #[tokio::test]
    async fn stores_at_most_five_suggestions() {
        let store = SqliteStore::in_memory().await.unwrap();
        store
            .save_document(&Document {
                id: "d1".into(),
                created_at: Utc::now(),
                title: "Essay".into(),
                content: Some("Teh cat sat.".into()),
                kind: DocumentKind::Text,
                user_id: "u1".into(),
            })
            .await
            .unwrap();

        let drafts: Vec<_> = (0..7)
            .map(|i| json!({ "originalSentence": format!("s{i}"), "suggestedSentence": format!("t{i}") }))
            .collect();
        let model = ScriptedModel::new().with_generation(&serde_json::to_string(&drafts).unwrap());
        let mut models = ModelRegistry::new();
        models.register(ARTIFACT_MODEL, Arc::new(model));
        let mut tools = ToolRegistry::new();
        tools.register(RequestSuggestions::new(Arc::new(models), store.clone()));

        let ctx = ToolContext { user_id: "u1".into(), data: DataSink::disabled() };
        let out = tools.execute("requestSuggestions", json!({ "documentId": "d1" }), &ctx).await;
        assert_eq!(out["success"], true);
        assert_eq!(out["id"], "d1");

        let stored = store.get_suggestions_by_document_id("d1").await.unwrap();
        assert_eq!(stored.len(), MAX_SUGGESTIONS);
        assert_eq!(stored[0].original_text, "s0");
    }
}
