//! LLM invocation gateway for the stepwise platform.
//!
//! This crate provides the stateless boundary to the external completion
//! service:
//!
//! - **Backend contract**: role-tagged messages in, one completion out
//! - **OpenAI-compatible client**: bounded-wait HTTP transport, no retries
//!
//! Failures are classified (transport, provider, malformed payload, timeout)
//! so callers can tell them apart; none are converted into default values.

pub mod backend;
pub mod error;
pub mod openai;

pub use backend::{ChatMessage, ChatRole, Completion, CompletionBackend, LlmBackendConfig, TokenUsage};
pub use error::LlmError;
pub use openai::OpenAiCompatibleBackend;
