use std::future::Future;

use parley_types::{Attachment, Message, MessagePart, Role};

use super::{SqliteStore, decode_enum, decode_json, decode_time, encode_json, encode_time};

pub trait MessageStore: Send + Sync + 'static {
    /// Insert all `messages` or none of them.
    fn save_messages(&self, messages: &[Message]) -> impl Future<Output = Result<(), sqlx::Error>> + Send;
    /// Messages of a chat in creation order.
    fn get_messages_by_chat_id(&self, chat_id: &str) -> impl Future<Output = Result<Vec<Message>, sqlx::Error>> + Send;
}

impl MessageStore for SqliteStore {
    async fn save_messages(&self, messages: &[Message]) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        for msg in messages {
            sqlx::query(
                "INSERT INTO messages (id, chat_id, role, parts, attachments, created_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )
            .bind(&msg.id)
            .bind(&msg.chat_id)
            .bind(msg.role.as_ref())
            .bind(encode_json(&msg.parts)?)
            .bind(encode_json(&msg.attachments)?)
            .bind(encode_time(&msg.created_at))
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await
    }

    async fn get_messages_by_chat_id(&self, chat_id: &str) -> Result<Vec<Message>, sqlx::Error> {
        let rows: Vec<(String, String, String, String, String, String)> = sqlx::query_as(
            "SELECT id, chat_id, role, parts, attachments, created_at FROM messages \
             WHERE chat_id = ?1 ORDER BY created_at ASC, rowid ASC",
        )
        .bind(chat_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|(id, chat_id, role, parts, attachments, created_at)| {
                Ok(Message {
                    id,
                    chat_id,
                    role: decode_enum::<Role>("role", &role)?,
                    parts: decode_json::<Vec<MessagePart>>("parts", &parts)?,
                    attachments: decode_json::<Vec<Attachment>>("attachments", &attachments)?,
                    created_at: decode_time(&created_at),
                })
            })
            .collect()
    }
}
