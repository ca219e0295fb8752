//! Database repositories for the stepwise server.
//!
//! This module provides Postgres-backed implementations of the
//! conversation and message store contracts.

pub mod conversation;
pub mod message;

pub use conversation::ConversationRepository;
pub use message::MessageRepository;

use stepwise_conversation::StoreError;

/// Folds a sqlx error into the store error taxonomy.
///
/// Connectivity failures map to `Unavailable` so callers can tell a dead
/// store apart from a bad query.
pub(crate) fn store_error(e: sqlx::Error) -> StoreError {
    match e {
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
            StoreError::Unavailable {
                reason: e.to_string(),
            }
        }
        other => StoreError::QueryFailed {
            reason: other.to_string(),
        },
    }
}
