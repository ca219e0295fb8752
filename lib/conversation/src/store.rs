//! Store contracts for conversations and messages.
//!
//! These traits are the durable-store seams the exchange engine writes
//! through. The engine is the writer-of-record for exchange-driven rows;
//! implementations only have to make each individual write atomic.

use crate::conversation::Conversation;
use crate::error::StoreError;
use crate::message::Message;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use stepwise_core::{ConversationId, UserId};

/// Durable storage for conversations.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Persists a new conversation.
    async fn create(&self, conversation: &Conversation) -> Result<(), StoreError>;

    /// Finds a conversation by ID.
    async fn find(&self, id: ConversationId) -> Result<Option<Conversation>, StoreError>;

    /// Lists a user's conversations, most recently active first.
    async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Conversation>, StoreError>;

    /// Replaces a conversation's title.
    async fn rename(&self, id: ConversationId, title: &str) -> Result<(), StoreError>;

    /// Advances a conversation's activity timestamp.
    async fn touch(&self, id: ConversationId, at: DateTime<Utc>) -> Result<(), StoreError>;

    /// Deletes a conversation and, atomically with respect to observers,
    /// all of its messages.
    async fn delete(&self, id: ConversationId) -> Result<(), StoreError>;
}

/// Durable, append-only storage for messages.
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Appends a message to its conversation's log. The write must be
    /// durable before this returns.
    async fn append(&self, message: &Message) -> Result<(), StoreError>;

    /// Returns a conversation's full log, ordered by creation time
    /// ascending. Reads back writes appended earlier in the same task.
    async fn list(&self, conversation_id: ConversationId) -> Result<Vec<Message>, StoreError>;
}
