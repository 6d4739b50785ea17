use parley_types::{Document, Suggestion};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Deserialize, IntoParams)]
pub struct DocumentQuery {
    pub id: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(rename_all = "camelCase")]
pub struct SuggestionsQuery {
    pub document_id: Option<String>,
}

/// One version of a document.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DocumentResponse {
    pub id: String,
    pub created_at: String,
    pub title: String,
    pub content: Option<String>,
    /// `text`, `code` or `sheet`.
    pub kind: String,
    pub user_id: String,
}

impl From<Document> for DocumentResponse {
    fn from(doc: Document) -> Self {
        Self {
            id: doc.id,
            created_at: doc.created_at.to_rfc3339(),
            title: doc.title,
            content: doc.content,
            kind: doc.kind.to_string(),
            user_id: doc.user_id,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SuggestionResponse {
    pub id: String,
    pub document_id: String,
    pub document_created_at: String,
    pub original_text: String,
    pub suggested_text: String,
    pub description: Option<String>,
    pub is_resolved: bool,
    pub created_at: String,
}

impl From<Suggestion> for SuggestionResponse {
    fn from(s: Suggestion) -> Self {
        Self {
            id: s.id,
            document_id: s.document_id,
            document_created_at: s.document_created_at.to_rfc3339(),
            original_text: s.original_text,
            suggested_text: s.suggested_text,
            description: s.description,
            is_resolved: s.is_resolved,
            created_at: s.created_at.to_rfc3339(),
        }
    }
}
