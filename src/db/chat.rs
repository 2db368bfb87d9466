//! Support conversations between a customer (the host) and staff.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ConversationRow {
    pub id: i64,
    pub host_id: i64,
    pub host_email: String,
    pub host_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_message_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessageRow {
    pub id: i64,
    pub conversation_id: i64,
    pub sender_id: i64,
    pub sender_name: Option<String>,
    pub content: String,
    pub send_at: DateTime<Utc>,
}

const CONVERSATION_SELECT: &str = "SELECT c.id, c.host_id, u.email AS host_email, u.name AS host_name, c.created_at, \
     (SELECT MAX(m.send_at) FROM chat_messages m WHERE m.conversation_id = c.id) AS last_message_at \
     FROM conversations c JOIN users u ON u.id = c.host_id";

pub struct ChatRepository<'a> { pool: &'a PgPool }

impl<'a> ChatRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self { Self { pool } }

    /// Conversations of ACTIVE hosts, most recent activity first.
    pub async fn list_active(&self) -> Result<Vec<ConversationRow>, sqlx::Error> {
        sqlx::query_as::<_, ConversationRow>(&format!(
            "{CONVERSATION_SELECT} WHERE u.status = 'ACTIVE' ORDER BY last_message_at DESC NULLS LAST, c.created_at DESC"
        ))
        .fetch_all(self.pool)
        .await
    }

    pub async fn find(&self, id: i64) -> Result<Option<ConversationRow>, sqlx::Error> {
        sqlx::query_as::<_, ConversationRow>(&format!("{CONVERSATION_SELECT} WHERE c.id = $1"))
            .bind(id)
            .fetch_optional(self.pool)
            .await
    }

    pub async fn find_by_host(&self, host_id: i64) -> Result<Option<ConversationRow>, sqlx::Error> {
        sqlx::query_as::<_, ConversationRow>(&format!("{CONVERSATION_SELECT} WHERE c.host_id = $1"))
            .bind(host_id)
            .fetch_optional(self.pool)
            .await
    }

    /// Idempotent: an existing conversation of the host is kept.
    pub async fn create(&self, host_id: i64) -> Result<(), sqlx::Error> {
        sqlx::query("INSERT INTO conversations (host_id) VALUES ($1) ON CONFLICT (host_id) DO NOTHING")
            .bind(host_id)
            .execute(self.pool)
            .await?;
        Ok(())
    }

    pub async fn messages(&self, conversation_id: i64) -> Result<Vec<ChatMessageRow>, sqlx::Error> {
        sqlx::query_as::<_, ChatMessageRow>(
            "SELECT m.id, m.conversation_id, m.sender_id, u.name AS sender_name, m.content, m.send_at \
             FROM chat_messages m JOIN users u ON u.id = m.sender_id \
             WHERE m.conversation_id = $1 ORDER BY m.send_at, m.id",
        )
        .bind(conversation_id)
        .fetch_all(self.pool)
        .await
    }

    pub async fn add_message(&self, conversation_id: i64, sender_id: i64, content: &str) -> Result<ChatMessageRow, sqlx::Error> {
        sqlx::query_as::<_, ChatMessageRow>(
            "WITH m AS (INSERT INTO chat_messages (conversation_id, sender_id, content) VALUES ($1, $2, $3) RETURNING *) \
             SELECT m.id, m.conversation_id, m.sender_id, u.name AS sender_name, m.content, m.send_at \
             FROM m JOIN users u ON u.id = m.sender_id",
        )
        .bind(conversation_id)
        .bind(sender_id)
        .bind(content)
        .fetch_one(self.pool)
        .await
    }
}
