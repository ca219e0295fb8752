//! Postgres repository for conversations.

use super::store_error;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use std::str::FromStr;
use stepwise_conversation::{Conversation, ConversationStore, StoreError};
use stepwise_core::{ConversationId, UserId};

/// Row type for conversation queries.
#[derive(FromRow)]
struct ConversationRow {
    id: String,
    user_id: String,
    title: String,
    created_at: DateTime<Utc>,
    last_activity_at: DateTime<Utc>,
}

impl ConversationRow {
    fn try_into_record(self) -> Result<Conversation, sqlx::Error> {
        let id = ConversationId::from_str(&self.id).map_err(|e| {
            sqlx::Error::Decode(Box::new(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("invalid conversation id '{}': {}", self.id, e),
            )))
        })?;
        let user_id = UserId::from_str(&self.user_id).map_err(|e| {
            sqlx::Error::Decode(Box::new(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("invalid user id '{}': {}", self.user_id, e),
            )))
        })?;

        Ok(Conversation {
            id,
            user_id,
            title: self.title,
            created_at: self.created_at,
            last_activity_at: self.last_activity_at,
        })
    }
}

/// Repository for conversation operations.
#[derive(Clone)]
pub struct ConversationRepository {
    pool: PgPool,
}

impl ConversationRepository {
    /// Creates a new repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ConversationStore for ConversationRepository {
    async fn create(&self, conversation: &Conversation) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO conversations (id, user_id, title, created_at, last_activity_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(conversation.id.to_string())
        .bind(conversation.user_id.to_string())
        .bind(&conversation.title)
        .bind(conversation.created_at)
        .bind(conversation.last_activity_at)
        .execute(&self.pool)
        .await
        .map_err(store_error)?;

        Ok(())
    }

    async fn find(&self, id: ConversationId) -> Result<Option<Conversation>, StoreError> {
        let row: Option<ConversationRow> = sqlx::query_as(
            r#"
            SELECT id, user_id, title, created_at, last_activity_at
            FROM conversations
            WHERE id = $1
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(store_error)?;

        match row {
            Some(r) => Ok(Some(r.try_into_record().map_err(store_error)?)),
            None => Ok(None),
        }
    }

    async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Conversation>, StoreError> {
        let rows: Vec<ConversationRow> = sqlx::query_as(
            r#"
            SELECT id, user_id, title, created_at, last_activity_at
            FROM conversations
            WHERE user_id = $1
            ORDER BY last_activity_at DESC, id DESC
            "#,
        )
        .bind(user_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(store_error)?;

        rows.into_iter()
            .map(|r| r.try_into_record().map_err(store_error))
            .collect()
    }

    async fn rename(&self, id: ConversationId, title: &str) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            UPDATE conversations
            SET title = $2
            WHERE id = $1
            "#,
        )
        .bind(id.to_string())
        .bind(title)
        .execute(&self.pool)
        .await
        .map_err(store_error)?;

        Ok(())
    }

    async fn touch(&self, id: ConversationId, at: DateTime<Utc>) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            UPDATE conversations
            SET last_activity_at = $2
            WHERE id = $1
            "#,
        )
        .bind(id.to_string())
        .bind(at)
        .execute(&self.pool)
        .await
        .map_err(store_error)?;

        Ok(())
    }

    async fn delete(&self, id: ConversationId) -> Result<(), StoreError> {
        // Message rows cascade via the schema's foreign key, so this single
        // statement removes the conversation and its log atomically.
        sqlx::query(
            r#"
            DELETE FROM conversations
            WHERE id = $1
            "#,
        )
        .bind(id.to_string())
        .execute(&self.pool)
        .await
        .map_err(store_error)?;

        Ok(())
    }
}
