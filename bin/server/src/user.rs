//! User record bookkeeping for conversation owners.
//!
//! Identity is established upstream; this module only records who owns
//! conversations. Updates go through an explicit merge: an immutable
//! existing record plus a partial patch produce the next record value.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use std::str::FromStr;
use stepwise_core::UserId;

/// A stored user record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    /// Stable user identifier, assigned upstream.
    pub id: UserId,
    /// Display name, if the upstream layer forwards one.
    pub display_name: Option<String>,
    /// Email, if the upstream layer forwards one.
    pub email: Option<String>,
    /// When this record was first created.
    pub created_at: DateTime<Utc>,
    /// When this user last made a request.
    pub last_seen_at: DateTime<Utc>,
}

impl UserRecord {
    /// Creates a fresh record for a first-seen user.
    #[must_use]
    pub fn new(id: UserId) -> Self {
        let now = Utc::now();
        Self {
            id,
            display_name: None,
            email: None,
            created_at: now,
            last_seen_at: now,
        }
    }

    /// Returns the next record value with the patch applied.
    ///
    /// Unset patch fields keep the existing value; `id` and `created_at`
    /// are never patched.
    #[must_use]
    pub fn apply(&self, patch: &UserPatch) -> Self {
        Self {
            id: self.id,
            display_name: patch
                .display_name
                .clone()
                .or_else(|| self.display_name.clone()),
            email: patch.email.clone().or_else(|| self.email.clone()),
            created_at: self.created_at,
            last_seen_at: patch.last_seen_at.unwrap_or(self.last_seen_at),
        }
    }
}

/// A partial update to a user record.
#[derive(Debug, Clone, Default)]
pub struct UserPatch {
    /// New display name, if any.
    pub display_name: Option<String>,
    /// New email, if any.
    pub email: Option<String>,
    /// New last-seen timestamp, if any.
    pub last_seen_at: Option<DateTime<Utc>>,
}

impl UserPatch {
    /// A patch that only refreshes the last-seen timestamp.
    #[must_use]
    pub fn seen_now() -> Self {
        Self {
            last_seen_at: Some(Utc::now()),
            ..Self::default()
        }
    }
}

/// Row type for user queries.
#[derive(FromRow)]
struct UserRow {
    id: String,
    display_name: Option<String>,
    email: Option<String>,
    created_at: DateTime<Utc>,
    last_seen_at: DateTime<Utc>,
}

impl UserRow {
    fn try_into_record(self) -> Result<UserRecord, sqlx::Error> {
        let id = UserId::from_str(&self.id).map_err(|e| {
            sqlx::Error::Decode(Box::new(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("invalid user id '{}': {}", self.id, e),
            )))
        })?;
        Ok(UserRecord {
            id,
            display_name: self.display_name,
            email: self.email,
            created_at: self.created_at,
            last_seen_at: self.last_seen_at,
        })
    }
}

/// Repository for user operations.
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    /// Creates a new repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Finds a user by ID.
    pub async fn find_by_id(&self, id: UserId) -> Result<Option<UserRecord>, sqlx::Error> {
        let row: Option<UserRow> = sqlx::query_as(
            r#"
            SELECT id, display_name, email, created_at, last_seen_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(r) => Ok(Some(r.try_into_record()?)),
            None => Ok(None),
        }
    }

    /// Inserts or merges a user record.
    ///
    /// The next value is computed with [`UserRecord::apply`] against the
    /// existing record (or a fresh one), then written whole.
    pub async fn upsert(&self, id: UserId, patch: &UserPatch) -> Result<UserRecord, sqlx::Error> {
        let existing = self.find_by_id(id).await?;
        let next = existing.unwrap_or_else(|| UserRecord::new(id)).apply(patch);

        sqlx::query(
            r#"
            INSERT INTO users (id, display_name, email, created_at, last_seen_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (id)
            DO UPDATE SET display_name = $2, email = $3, last_seen_at = $5
            "#,
        )
        .bind(next.id.to_string())
        .bind(&next.display_name)
        .bind(&next.email)
        .bind(next.created_at)
        .bind(next.last_seen_at)
        .execute(&self.pool)
        .await?;

        Ok(next)
    }
}
