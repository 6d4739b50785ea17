use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use chrono::Utc;
use futures::StreamExt;
use parley_types::models::ARTIFACT_MODEL;
use parley_types::{Document, DocumentKind};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

use super::{DataSink, Tool, ToolContext};
use crate::entities::DocumentStore;
use crate::llm::prompts::{create_document_prompt, update_document_prompt};
use crate::llm::{CompletionRequest, LlmEvent, ModelRegistry};

/// Result of the document tools, also used by `requestSuggestions`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentOutput {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<DocumentKind>,
    pub message: String,
}

impl DocumentOutput {
    pub(crate) fn done(doc: &Document, message: &str) -> Self {
        Self {
            success: true,
            id: Some(doc.id.clone()),
            title: Some(doc.title.clone()),
            kind: Some(doc.kind),
            message: message.to_owned(),
        }
    }

    pub(crate) fn not_found() -> Self {
        Self {
            success: false,
            id: None,
            title: None,
            kind: None,
            message: "Document not found".to_owned(),
        }
    }
}

/// Stream a completion of the artifact model into `sink` as `text-delta`
/// items and return the full text.
async fn write_content(models: &ModelRegistry, request: &CompletionRequest, sink: &DataSink) -> Result<String, String> {
    let model = models.get(ARTIFACT_MODEL).map_err(|e| e.to_string())?;
    let mut stream = model.stream(request).await.map_err(|e| e.to_string())?;
    let mut content = String::new();
    while let Some(event) = stream.next().await {
        if let LlmEvent::Text(delta) = event.map_err(|e| e.to_string())? {
            sink.write(json!({ "type": "text-delta", "content": delta })).await;
            content.push_str(&delta);
        }
    }
    Ok(content)
}

/// Latest version of a document owned by `user_id`.
pub(crate) async fn load_owned<S: DocumentStore>(store: &S, id: &str, user_id: &str) -> Result<Option<Document>, String> {
    let doc = store.get_document_by_id(id).await.map_err(|e| e.to_string())?;
    Ok(doc.filter(|d| d.user_id == user_id))
}

pub struct CreateDocument<S> {
    models: Arc<ModelRegistry>,
    store: S,
}

impl<S> CreateDocument<S> {
    pub fn new(models: Arc<ModelRegistry>, store: S) -> Self {
        Self { models, store }
    }
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct CreateDocumentInput {
    title: String,
    kind: DocumentKind,
}

impl<S: DocumentStore> Tool for CreateDocument<S> {
    type Input = CreateDocumentInput;
    type Output = DocumentOutput;

    fn name(&self) -> &'static str {
        "createDocument"
    }

    fn description(&self) -> &'static str {
        "Create a document for writing or content creation activities. The content is generated from the title and kind."
    }

    fn execute<'a>(
        &'a self,
        input: CreateDocumentInput,
        ctx: &'a ToolContext,
    ) -> Pin<Box<dyn Future<Output = Result<DocumentOutput, String>> + Send + 'a>> {
        Box::pin(async move {
            let id = uuid::Uuid::new_v4().to_string();
            let sink = &ctx.data;
            sink.write(json!({ "type": "kind", "content": input.kind })).await;
            sink.write(json!({ "type": "id", "content": id })).await;
            sink.write(json!({ "type": "title", "content": input.title })).await;
            sink.write(json!({ "type": "clear", "content": "" })).await;

            let request = CompletionRequest::prompt(Some(create_document_prompt(input.kind).to_owned()), input.title.clone());
            let content = write_content(&self.models, &request, sink).await?;

            let doc = Document {
                id,
                created_at: Utc::now(),
                title: input.title,
                content: Some(content),
                kind: input.kind,
                user_id: ctx.user_id.clone(),
            };
            self.store.save_document(&doc).await.map_err(|e| e.to_string())?;
            sink.write(json!({ "type": "finish", "content": "" })).await;
            info!(document_id = %doc.id, kind = %doc.kind, "document created");
            Ok(DocumentOutput::done(&doc, "A document was created and is now visible to the user."))
        })
    }
}

pub struct UpdateDocument<S> {
    models: Arc<ModelRegistry>,
    store: S,
}

impl<S> UpdateDocument<S> {
    pub fn new(models: Arc<ModelRegistry>, store: S) -> Self {
        Self { models, store }
    }
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct UpdateDocumentInput {
    /// The id of the document to update.
    id: String,
    /// The description of changes that need to be made.
    description: String,
}

impl<S: DocumentStore> Tool for UpdateDocument<S> {
    type Input = UpdateDocumentInput;
    type Output = DocumentOutput;

    fn name(&self) -> &'static str {
        "updateDocument"
    }

    fn description(&self) -> &'static str {
        "Update a document with the given description."
    }

    fn execute<'a>(
        &'a self,
        input: UpdateDocumentInput,
        ctx: &'a ToolContext,
    ) -> Pin<Box<dyn Future<Output = Result<DocumentOutput, String>> + Send + 'a>> {
        Box::pin(async move {
            let Some(current) = load_owned(&self.store, &input.id, &ctx.user_id).await? else {
                return Ok(DocumentOutput::not_found());
            };

            let sink = &ctx.data;
            sink.write(json!({ "type": "clear", "content": "" })).await;
            let system = update_document_prompt(current.content.as_deref().unwrap_or_default(), current.kind);
            let request = CompletionRequest::prompt(Some(system), input.description);
            let content = write_content(&self.models, &request, sink).await?;

            let doc = Document {
                created_at: Utc::now(),
                content: Some(content),
                ..current
            };
            self.store.save_document(&doc).await.map_err(|e| e.to_string())?;
            sink.write(json!({ "type": "finish", "content": "" })).await;
            info!(document_id = %doc.id, "document updated");
            Ok(DocumentOutput::done(&doc, "The document has been updated successfully."))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::SqliteStore;
    use crate::stream::StreamPart;
    use crate::testing::ScriptedModel;
    use crate::tools::ToolRegistry;
    use tokio::sync::mpsc;

    fn registry(model: ScriptedModel, store: SqliteStore) -> ToolRegistry {
        let mut models = ModelRegistry::new();
        models.register(ARTIFACT_MODEL, Arc::new(model));
        let models = Arc::new(models);
        let mut tools = ToolRegistry::new();
        tools.register(CreateDocument::new(models.clone(), store.clone()));
        tools.register(UpdateDocument::new(models, store));
        tools
    }

    fn drain(rx: &mut mpsc::Receiver<StreamPart>) -> Vec<serde_json::Value> {
        let mut items = Vec::new();
        while let Ok(part) = rx.try_recv() {
            if let StreamPart::Data(mut data) = part {
                items.append(&mut data);
            }
        }
        items
    }

    #[tokio::test]
    async fn create_streams_and_persists_document() {
        let store = SqliteStore::in_memory().await.unwrap();
        let model = ScriptedModel::new().with_stream_text(&["# Rust", " essay"]);
        let tools = registry(model, store.clone());
        let (tx, mut rx) = mpsc::channel(32);
        let ctx = ToolContext { user_id: "u1".into(), data: DataSink::new(tx) };

        let out = tools
            .execute("createDocument", json!({ "title": "Rust", "kind": "text" }), &ctx)
            .await;
        assert_eq!(out["success"], true);
        let id = out["id"].as_str().unwrap().to_owned();

        let items = drain(&mut rx);
        let types: Vec<&str> = items.iter().map(|i| i["type"].as_str().unwrap()).collect();
        assert_eq!(types, vec!["kind", "id", "title", "clear", "text-delta", "text-delta", "finish"]);

        let doc = store.get_document_by_id(&id).await.unwrap().unwrap();
        assert_eq!(doc.content.as_deref(), Some("# Rust essay"));
        assert_eq!(doc.user_id, "u1");
    }

    #[tokio::test]
    async fn update_appends_a_version_for_the_owner_only() {
        let store = SqliteStore::in_memory().await.unwrap();
        let original = Document {
            id: "d1".into(),
            created_at: Utc::now() - chrono::Duration::seconds(5),
            title: "Notes".into(),
            content: Some("old".into()),
            kind: DocumentKind::Text,
            user_id: "u1".into(),
        };
        store.save_document(&original).await.unwrap();
        let model = ScriptedModel::new().with_stream_text(&["new"]);
        let tools = registry(model, store.clone());

        let stranger = ToolContext { user_id: "u2".into(), data: DataSink::disabled() };
        let denied = tools
            .execute("updateDocument", json!({ "id": "d1", "description": "x" }), &stranger)
            .await;
        assert_eq!(denied["success"], false);

        let owner = ToolContext { user_id: "u1".into(), data: DataSink::disabled() };
        let out = tools
            .execute("updateDocument", json!({ "id": "d1", "description": "rewrite" }), &owner)
            .await;
        assert_eq!(out["success"], true);
        let versions = store.get_documents_by_id("d1").await.unwrap();
        assert_eq!(versions.len(), 2);
        assert_eq!(versions[1].content.as_deref(), Some("new"));
        assert_eq!(versions[1].title, "Notes");
    }
}
