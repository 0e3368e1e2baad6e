//! Direct messages between users.

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};

use super::user::UserSummary;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub sender_id: String,
    pub receiver_id: String,
    pub content: String,
    pub is_read: bool,
    pub created_at: String,
}

impl Message {
    /// Both directions between two users, oldest first within the page
    pub async fn thread(
        db: &SqlitePool,
        user_id: &str,
        other_id: &str,
        query: &ThreadQuery,
    ) -> Result<Vec<Message>, sqlx::Error> {
        let limit = query.limit.unwrap_or(100).clamp(1, 500);
        let offset = query.offset.unwrap_or(0).max(0);

        let mut messages: Vec<Message> = sqlx::query_as(
            r#"
            SELECT * FROM messages
            WHERE (sender_id = ? AND receiver_id = ?) OR (sender_id = ? AND receiver_id = ?)
            ORDER BY created_at DESC
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(user_id)
        .bind(other_id)
        .bind(other_id)
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(db)
        .await?;

        messages.reverse();
        Ok(messages)
    }

    /// Every message the user sent or received, newest first
    pub async fn list_involving(db: &SqlitePool, user_id: &str) -> Result<Vec<Message>, sqlx::Error> {
        sqlx::query_as(
            "SELECT * FROM messages WHERE sender_id = ? OR receiver_id = ? ORDER BY created_at DESC",
        )
        .bind(user_id)
        .bind(user_id)
        .fetch_all(db)
        .await
    }

    pub async fn unread_count(db: &SqlitePool, user_id: &str) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM messages WHERE receiver_id = ? AND is_read = 0")
            .bind(user_id)
            .fetch_one(db)
            .await
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub user: UserSummary,
    pub online: bool,
    pub last_message: Option<Message>,
    pub unread_count: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SendMessageRequest {
    pub content: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ThreadQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}
