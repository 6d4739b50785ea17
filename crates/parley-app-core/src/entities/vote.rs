use std::future::Future;

use parley_types::{Vote, VoteType};

use super::SqliteStore;

pub trait VoteStore: Send + Sync + 'static {
    /// Record a vote; a later vote on the same message replaces it.
    /// Returns `false` when the message is not part of the chat.
    fn vote_message(
        &self,
        chat_id: &str,
        message_id: &str,
        vote: VoteType,
    ) -> impl Future<Output = Result<bool, sqlx::Error>> + Send;
    fn get_votes_by_chat_id(&self, chat_id: &str) -> impl Future<Output = Result<Vec<Vote>, sqlx::Error>> + Send;
}

impl VoteStore for SqliteStore {
    async fn vote_message(&self, chat_id: &str, message_id: &str, vote: VoteType) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO votes (chat_id, message_id, is_upvoted) \
             SELECT ?1, ?2, ?3 WHERE EXISTS (SELECT 1 FROM messages WHERE id = ?2 AND chat_id = ?1) \
             ON CONFLICT (chat_id, message_id) DO UPDATE SET is_upvoted = excluded.is_upvoted",
        )
        .bind(chat_id)
        .bind(message_id)
        .bind(vote.is_upvote())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn get_votes_by_chat_id(&self, chat_id: &str) -> Result<Vec<Vote>, sqlx::Error> {
        let rows: Vec<(String, String, bool)> =
            sqlx::query_as("SELECT chat_id, message_id, is_upvoted FROM votes WHERE chat_id = ?1")
                .bind(chat_id)
                .fetch_all(&self.pool)
                .await?;
        Ok(rows
            .into_iter()
            .map(|(chat_id, message_id, is_upvoted)| Vote {
                chat_id,
                message_id,
                is_upvoted,
            })
            .collect())
    }
}
