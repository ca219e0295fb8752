//! Postgres repository for the append-only message log.

use super::store_error;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use std::str::FromStr;
use stepwise_conversation::{Message, MessageRole, MessageStore, StoreError};
use stepwise_core::{ConversationId, MessageId};

/// Row type for message queries.
#[derive(FromRow)]
struct MessageRow {
    id: String,
    conversation_id: String,
    role: String,
    content: String,
    created_at: DateTime<Utc>,
}

impl MessageRow {
    fn try_into_record(self) -> Result<Message, sqlx::Error> {
        let id = MessageId::from_str(&self.id).map_err(|e| {
            sqlx::Error::Decode(Box::new(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("invalid message id '{}': {}", self.id, e),
            )))
        })?;
        let conversation_id = ConversationId::from_str(&self.conversation_id).map_err(|e| {
            sqlx::Error::Decode(Box::new(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("invalid conversation id '{}': {}", self.conversation_id, e),
            )))
        })?;
        let role = MessageRole::from_str(&self.role).map_err(|e| {
            sqlx::Error::Decode(Box::new(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("invalid message role '{}': {}", self.role, e),
            )))
        })?;

        Ok(Message {
            id,
            conversation_id,
            role,
            content: self.content,
            created_at: self.created_at,
        })
    }
}

/// Repository for message operations.
#[derive(Clone)]
pub struct MessageRepository {
    pool: PgPool,
}

impl MessageRepository {
    /// Creates a new repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MessageStore for MessageRepository {
    async fn append(&self, message: &Message) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO messages (id, conversation_id, role, content, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(message.id.to_string())
        .bind(message.conversation_id.to_string())
        .bind(message.role.as_str())
        .bind(&message.content)
        .bind(message.created_at)
        .execute(&self.pool)
        .await
        .map_err(store_error)?;

        Ok(())
    }

    async fn list(&self, conversation_id: ConversationId) -> Result<Vec<Message>, StoreError> {
        // ULID ids are time-ordered, so the id breaks created_at ties
        // deterministically.
        let rows: Vec<MessageRow> = sqlx::query_as(
            r#"
            SELECT id, conversation_id, role, content, created_at
            FROM messages
            WHERE conversation_id = $1
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(conversation_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(store_error)?;

        rows.into_iter()
            .map(|r| r.try_into_record().map_err(store_error))
            .collect()
    }
}
