//! Conversation orchestration for the stepwise platform.
//!
//! This crate provides:
//!
//! - **Domain records**: conversations and their append-only message logs
//! - **Store contracts**: the durable-store seams the engine writes through
//! - **Context Window Builder**: bounded, role-tagged model input
//! - **Exchange Engine**: the question→answer exchange with its ordering
//!   and failure semantics

pub mod context;
pub mod conversation;
pub mod engine;
pub mod error;
pub mod message;
pub mod store;

pub use context::ContextWindow;
pub use conversation::{Conversation, DEFAULT_TITLE};
pub use engine::ExchangeEngine;
pub use error::{ExchangeError, StoreError};
pub use message::{Message, MessageRole};
pub use store::{ConversationStore, MessageStore};
