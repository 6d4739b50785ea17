//! Documents written by the document tools, and their suggestions.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use utoipa::OpenApi;

use crate::auth::Session;
use crate::error::ServerError;
use crate::schemas::api::document::{DocumentQuery, DocumentResponse, SuggestionResponse, SuggestionsQuery};
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    paths(get_document, get_suggestions),
    components(schemas(DocumentResponse, SuggestionResponse))
)]
pub struct DocumentApi;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/document", get(get_document))
        .route("/suggestions", get(get_suggestions))
}

/// Every version of a document, oldest first.
#[utoipa::path(
    get,
    path = "/api/document",
    tag = "document",
    params(DocumentQuery),
    responses(
        (status = 200, description = "Document versions", body = [DocumentResponse]),
        (status = 400, description = "Missing id"),
        (status = 401, description = "No session, or the document belongs to another user"),
        (status = 404, description = "Unknown document"),
    )
)]
pub async fn get_document(
    State(state): State<Arc<AppState>>,
    session: Session,
    Query(query): Query<DocumentQuery>,
) -> Result<Json<Vec<DocumentResponse>>, ServerError> {
    let id = query
        .id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ServerError::BadRequest("Missing id".into()))?;
    let versions = state.chat.documents(session.caller(), &id).await?;
    Ok(Json(versions.into_iter().map(DocumentResponse::from).collect()))
}

/// Suggestions made for a document.
#[utoipa::path(
    get,
    path = "/api/suggestions",
    tag = "document",
    params(SuggestionsQuery),
    responses(
        (status = 200, description = "Suggestions", body = [SuggestionResponse]),
        (status = 400, description = "Missing documentId"),
        (status = 401, description = "No session, or the document belongs to another user"),
        (status = 404, description = "Unknown document"),
    )
)]
pub async fn get_suggestions(
    State(state): State<Arc<AppState>>,
    session: Session,
    Query(query): Query<SuggestionsQuery>,
) -> Result<Json<Vec<SuggestionResponse>>, ServerError> {
    let document_id = query
        .document_id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ServerError::BadRequest("Missing documentId".into()))?;
    let suggestions = state.chat.suggestions(session.caller(), &document_id).await?;
    Ok(Json(suggestions.into_iter().map(SuggestionResponse::from).collect()))
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use axum::http::StatusCode;
    use chrono::Utc;
    use parley_app_core::entities::DocumentStore;
    use parley_app_core::testing::ScriptedModel;
    use parley_types::{Document, DocumentKind};

    fn doc(content: &str) -> Document {
        Document {
            id: "d1".into(),
            created_at: Utc::now(),
            title: "Essay".into(),
            content: Some(content.into()),
            kind: DocumentKind::Text,
            user_id: "alice".into(),
        }
    }

    #[tokio::test]
    async fn versions_are_owner_only() {
        let app = TestApp::new(ScriptedModel::new()).await;
        app.chat().store().save_document(&doc("v1")).await.unwrap();
        app.chat().store().save_document(&doc("v2")).await.unwrap();

        let versions = body_json(app.send(get("/api/document?id=d1", Some(ALICE))).await).await;
        assert_eq!(versions.as_array().unwrap().len(), 2);
        assert_eq!(versions[1]["content"], "v2");
        assert_eq!(versions[0]["kind"], "text");

        assert_eq!(app.send(get("/api/document?id=d1", Some(BOB))).await.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(app.send(get("/api/document?id=d9", Some(ALICE))).await.status(), StatusCode::NOT_FOUND);
        assert_eq!(app.send(get("/api/document", Some(ALICE))).await.status(), StatusCode::BAD_REQUEST);

        let suggestions = body_json(app.send(get("/api/suggestions?documentId=d1", Some(ALICE))).await).await;
        assert_eq!(suggestions, serde_json::json!([]));
    }
}
