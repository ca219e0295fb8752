//! Error types for the conversation crate.
//!
//! - `StoreError`: failures from the durable store seams
//! - `ExchangeError`: failures of lifecycle operations and exchanges, with
//!   the invocation class preserved so callers can tell transport, timeout,
//!   and malformed-response failures apart

use std::fmt;
use stepwise_ai::LlmError;
use stepwise_core::ConversationId;

/// Errors from conversation/message store operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The durable store cannot be reached.
    Unavailable { reason: String },
    /// A store query or write failed.
    QueryFailed { reason: String },
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unavailable { reason } => {
                write!(f, "store unavailable: {reason}")
            }
            Self::QueryFailed { reason } => {
                write!(f, "store query failed: {reason}")
            }
        }
    }
}

impl std::error::Error for StoreError {}

/// Errors from exchange and conversation lifecycle operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExchangeError {
    /// The submitted question was empty.
    EmptyQuestion,
    /// The submitted title was empty.
    EmptyTitle,
    /// The conversation does not exist.
    ConversationNotFound { id: ConversationId },
    /// A durable-store operation failed.
    Store { operation: &'static str, error: StoreError },
    /// The LLM invocation failed. No assistant message was persisted.
    Invocation { id: ConversationId, error: LlmError },
}

impl fmt::Display for ExchangeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyQuestion => write!(f, "question must not be empty"),
            Self::EmptyTitle => write!(f, "title must not be empty"),
            Self::ConversationNotFound { id } => {
                write!(f, "conversation not found: {id}")
            }
            Self::Store { operation, error } => {
                write!(f, "store operation '{operation}' failed: {error}")
            }
            Self::Invocation { id, error } => {
                write!(f, "invocation failed for conversation {id}: {error}")
            }
        }
    }
}

impl std::error::Error for ExchangeError {}
