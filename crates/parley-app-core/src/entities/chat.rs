use std::future::Future;

use parley_types::Chat;

use super::{SqliteStore, decode_time, encode_time};

pub trait ChatStore: Send + Sync + 'static {
    fn get_chat_by_id(&self, id: &str) -> impl Future<Output = Result<Option<Chat>, sqlx::Error>> + Send;
    fn save_chat(&self, chat: &Chat) -> impl Future<Output = Result<(), sqlx::Error>> + Send;
    /// Remove a chat together with its messages and votes.
    fn delete_chat_by_id(&self, id: &str) -> impl Future<Output = Result<(), sqlx::Error>> + Send;
    /// Chats owned by `user_id`, newest first.
    fn get_chats_by_user_id(&self, user_id: &str) -> impl Future<Output = Result<Vec<Chat>, sqlx::Error>> + Send;
}

type ChatRow = (String, String, String, String);

fn chat_from_row((id, user_id, title, created_at): ChatRow) -> Chat {
    Chat {
        id,
        user_id,
        title,
        created_at: decode_time(&created_at),
    }
}

impl ChatStore for SqliteStore {
    async fn get_chat_by_id(&self, id: &str) -> Result<Option<Chat>, sqlx::Error> {
        let row: Option<ChatRow> =
            sqlx::query_as("SELECT id, user_id, title, created_at FROM chats WHERE id = ?1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(chat_from_row))
    }

    async fn save_chat(&self, chat: &Chat) -> Result<(), sqlx::Error> {
        sqlx::query("INSERT INTO chats (id, user_id, title, created_at) VALUES (?1, ?2, ?3, ?4)")
            .bind(&chat.id)
            .bind(&chat.user_id)
            .bind(&chat.title)
            .bind(encode_time(&chat.created_at))
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete_chat_by_id(&self, id: &str) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM votes WHERE chat_id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM messages WHERE chat_id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM chats WHERE id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await
    }

    async fn get_chats_by_user_id(&self, user_id: &str) -> Result<Vec<Chat>, sqlx::Error> {
        let rows: Vec<ChatRow> = sqlx::query_as(
            "SELECT id, user_id, title, created_at FROM chats \
             WHERE user_id = ?1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(chat_from_row).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    #[tokio::test]
    async fn saves_and_lists_chats_newest_first() {
        let store = SqliteStore::in_memory().await.unwrap();
        let mut older = Chat::new("c1", "u1", "First");
        older.created_at = Utc::now() - Duration::minutes(5);
        store.save_chat(&older).await.unwrap();
        store.save_chat(&Chat::new("c2", "u1", "Second")).await.unwrap();
        store.save_chat(&Chat::new("c3", "u2", "Other")).await.unwrap();

        let chats = store.get_chats_by_user_id("u1").await.unwrap();
        assert_eq!(chats.iter().map(|c| c.id.as_str()).collect::<Vec<_>>(), vec!["c2", "c1"]);

        let found = store.get_chat_by_id("c1").await.unwrap().unwrap();
        assert_eq!(found.title, "First");
        assert!(store.get_chat_by_id("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn duplicate_chat_ids_are_rejected() {
        let store = SqliteStore::in_memory().await.unwrap();
        store.save_chat(&Chat::new("c1", "u1", "A")).await.unwrap();
        assert!(store.save_chat(&Chat::new("c1", "u2", "B")).await.is_err());
        assert_eq!(store.get_chat_by_id("c1").await.unwrap().unwrap().user_id, "u1");
    }
}
