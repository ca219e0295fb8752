//! Context window construction.
//!
//! Transforms a conversation's persisted message log into the exact input
//! sequence handed to the LLM: the fixed tutor framing first, then the most
//! recent window of the log in chronological order. Pure function of its
//! input, so a given log always produces the same context.

use crate::message::{Message, MessageRole};
use stepwise_ai::{ChatMessage, ChatRole};

/// Fixed instructional framing prepended to every invocation.
pub const TUTOR_SYSTEM_PROMPT: &str = "당신은 수학 문제를 해결하는 전문 AI 조수입니다. \
    사용자가 수학 문제를 제공하면, 단계별로 자세히 풀이 과정을 설명하고 최종 답을 제시하세요. \
    수식은 LaTeX 형식으로 작성하여 $...$ 또는 $$...$$ 로 감싸주세요.";

/// Default bound on log messages included in one context window.
pub const DEFAULT_MAX_HISTORY: usize = 10;

/// Builds bounded, role-tagged context windows from message logs.
#[derive(Debug, Clone)]
pub struct ContextWindow {
    max_history: usize,
}

impl ContextWindow {
    /// Creates a builder with the given history bound.
    #[must_use]
    pub fn new(max_history: usize) -> Self {
        Self { max_history }
    }

    /// Returns the history bound.
    #[must_use]
    pub fn max_history(&self) -> usize {
        self.max_history
    }

    /// Builds the outbound message sequence for one invocation.
    ///
    /// The synthetic system entry comes first, followed by the most recent
    /// `max_history` log messages in chronological order. Shorter logs are
    /// included whole; the output never exceeds `max_history + 1` entries.
    #[must_use]
    pub fn build(&self, history: &[Message]) -> Vec<ChatMessage> {
        let start = history.len().saturating_sub(self.max_history);

        let mut context = Vec::with_capacity(history.len() - start + 1);
        context.push(ChatMessage::system(TUTOR_SYSTEM_PROMPT));
        context.extend(history[start..].iter().map(|message| ChatMessage {
            role: outbound_role(message.role),
            content: message.content.clone(),
        }));
        context
    }
}

impl Default for ContextWindow {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_HISTORY)
    }
}

fn outbound_role(role: MessageRole) -> ChatRole {
    match role {
        MessageRole::User => ChatRole::User,
        MessageRole::Assistant => ChatRole::Assistant,
        MessageRole::System => ChatRole::System,
    }
}
