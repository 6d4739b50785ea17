use std::future::Future;

use parley_types::{Document, DocumentKind, Suggestion};

use super::{SqliteStore, decode_enum, decode_time, encode_time};

pub trait DocumentStore: Send + Sync + 'static {
    /// Append a version; `(id, created_at)` identifies it.
    fn save_document(&self, document: &Document) -> impl Future<Output = Result<(), sqlx::Error>> + Send;
    /// Every version of a document, oldest first.
    fn get_documents_by_id(&self, id: &str) -> impl Future<Output = Result<Vec<Document>, sqlx::Error>> + Send;
    /// The latest version of a document.
    fn get_document_by_id(&self, id: &str) -> impl Future<Output = Result<Option<Document>, sqlx::Error>> + Send;
    fn save_suggestions(&self, suggestions: &[Suggestion]) -> impl Future<Output = Result<(), sqlx::Error>> + Send;
    fn get_suggestions_by_document_id(
        &self,
        document_id: &str,
    ) -> impl Future<Output = Result<Vec<Suggestion>, sqlx::Error>> + Send;
}

type DocumentRow = (String, String, String, Option<String>, String, String);

fn document_from_row((id, created_at, title, content, kind, user_id): DocumentRow) -> Result<Document, sqlx::Error> {
    Ok(Document {
        id,
        created_at: decode_time(&created_at),
        title,
        content,
        kind: decode_enum::<DocumentKind>("kind", &kind)?,
        user_id,
    })
}

impl DocumentStore for SqliteStore {
    async fn save_document(&self, document: &Document) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO documents (id, created_at, title, content, kind, user_id) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )
        .bind(&document.id)
        .bind(encode_time(&document.created_at))
        .bind(&document.title)
        .bind(&document.content)
        .bind(document.kind.as_ref())
        .bind(&document.user_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_documents_by_id(&self, id: &str) -> Result<Vec<Document>, sqlx::Error> {
        let rows: Vec<DocumentRow> = sqlx::query_as(
            "SELECT id, created_at, title, content, kind, user_id FROM documents \
             WHERE id = ?1 ORDER BY created_at ASC",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(document_from_row).collect()
    }

    async fn get_document_by_id(&self, id: &str) -> Result<Option<Document>, sqlx::Error> {
        let row: Option<DocumentRow> = sqlx::query_as(
            "SELECT id, created_at, title, content, kind, user_id FROM documents \
             WHERE id = ?1 ORDER BY created_at DESC LIMIT 1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(document_from_row).transpose()
    }

    async fn save_suggestions(&self, suggestions: &[Suggestion]) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        for s in suggestions {
            sqlx::query(
                "INSERT INTO suggestions (id, document_id, document_created_at, original_text, \
                 suggested_text, description, is_resolved, user_id, created_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            )
            .bind(&s.id)
            .bind(&s.document_id)
            .bind(encode_time(&s.document_created_at))
            .bind(&s.original_text)
            .bind(&s.suggested_text)
            .bind(&s.description)
            .bind(s.is_resolved)
            .bind(&s.user_id)
            .bind(encode_time(&s.created_at))
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await
    }

    async fn get_suggestions_by_document_id(&self, document_id: &str) -> Result<Vec<Suggestion>, sqlx::Error> {
        #[allow(clippy::type_complexity)]
        let rows: Vec<(String, String, String, String, String, Option<String>, bool, String, String)> =
            sqlx::query_as(
                "SELECT id, document_id, document_created_at, original_text, suggested_text, \
                 description, is_resolved, user_id, created_at FROM suggestions \
                 WHERE document_id = ?1 ORDER BY created_at ASC, rowid ASC",
            )
            .bind(document_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows
            .into_iter()
            .map(
                |(id, document_id, document_created_at, original_text, suggested_text, description, is_resolved, user_id, created_at)| {
                    Suggestion {
                        id,
                        document_id,
                        document_created_at: decode_time(&document_created_at),
                        original_text,
                        suggested_text,
                        description,
                        is_resolved,
                        user_id,
                        created_at: decode_time(&created_at),
                    }
                },
            )
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn version(content: &str, age_minutes: i64) -> Document {
        Document {
            id: "d1".into(),
            created_at: Utc::now() - Duration::minutes(age_minutes),
            title: "Essay".into(),
            content: Some(content.into()),
            kind: DocumentKind::Text,
            user_id: "u1".into(),
        }
    }

    #[tokio::test]
    async fn latest_version_wins() {
        let store = SqliteStore::in_memory().await.unwrap();
        store.save_document(&version("draft", 10)).await.unwrap();
        store.save_document(&version("final", 1)).await.unwrap();

        let all = store.get_documents_by_id("d1").await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].content.as_deref(), Some("draft"));

        let latest = store.get_document_by_id("d1").await.unwrap().unwrap();
        assert_eq!(latest.content.as_deref(), Some("final"));
        assert!(store.get_document_by_id("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn suggestions_reference_a_document_version() {
        let store = SqliteStore::in_memory().await.unwrap();
        let doc = version("Teh text.", 0);
        store.save_document(&doc).await.unwrap();
        let suggestion = Suggestion {
            id: "s1".into(),
            document_id: doc.id.clone(),
            document_created_at: doc.created_at,
            original_text: "Teh text.".into(),
            suggested_text: "The text.".into(),
            description: Some("typo".into()),
            is_resolved: false,
            user_id: "u1".into(),
            created_at: Utc::now(),
        };
        store.save_suggestions(&[suggestion]).await.unwrap();

        let stored = store.get_suggestions_by_document_id("d1").await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].suggested_text, "The text.");
    }
}
