//! Message types for conversations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use stepwise_core::{ConversationId, MessageId};

/// The role of a message sender.
///
/// `System` exists for the outbound context window; system framing is
/// injected at invocation time and never persisted as a log row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// User/human message.
    User,
    /// Assistant/AI message.
    Assistant,
    /// System message.
    System,
}

impl MessageRole {
    /// Returns the canonical string form, matching the serde representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::System => "system",
        }
    }
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing a role from a string fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseRoleError {
    /// The string that failed to parse.
    pub value: String,
}

impl fmt::Display for ParseRoleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown message role '{}'", self.value)
    }
}

impl std::error::Error for ParseRoleError {}

impl FromStr for MessageRole {
    type Err = ParseRoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Self::User),
            "assistant" => Ok(Self::Assistant),
            "system" => Ok(Self::System),
            other => Err(ParseRoleError {
                value: other.to_string(),
            }),
        }
    }
}

/// A persisted message in a conversation.
///
/// Messages are immutable once written; the log is append-only and ordered
/// by `created_at` (with the ULID id breaking timestamp ties in creation
/// order).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Unique message identifier.
    pub id: MessageId,
    /// The conversation this message belongs to.
    pub conversation_id: ConversationId,
    /// Message role.
    pub role: MessageRole,
    /// Message content. May contain `$...$` / `$$...$$` math delimiters.
    pub content: String,
    /// When the message was created.
    pub created_at: DateTime<Utc>,
}

impl Message {
    /// Creates a new message.
    #[must_use]
    pub fn new(
        conversation_id: ConversationId,
        role: MessageRole,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: MessageId::new(),
            conversation_id,
            role,
            content: content.into(),
            created_at: Utc::now(),
        }
    }

    /// Creates a user message.
    #[must_use]
    pub fn user(conversation_id: ConversationId, content: impl Into<String>) -> Self {
        Self::new(conversation_id, MessageRole::User, content)
    }

    /// Creates an assistant message.
    #[must_use]
    pub fn assistant(conversation_id: ConversationId, content: impl Into<String>) -> Self {
        Self::new(conversation_id, MessageRole::Assistant, content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_creation() {
        let conversation_id = ConversationId::new();
        let msg = Message::user(conversation_id, "2+2는?");
        assert_eq!(msg.role, MessageRole::User);
        assert_eq!(msg.content, "2+2는?");
        assert_eq!(msg.conversation_id, conversation_id);
    }

    #[test]
    fn role_round_trips_through_str() {
        for role in [MessageRole::User, MessageRole::Assistant, MessageRole::System] {
            let parsed: MessageRole = role.as_str().parse().expect("parse");
            assert_eq!(parsed, role);
        }
    }

    #[test]
    fn unknown_role_fails_to_parse() {
        let err = "tool".parse::<MessageRole>().expect_err("should fail");
        assert_eq!(err.value, "tool");
    }

    #[test]
    fn role_serde_matches_as_str() {
        let json = serde_json::to_string(&MessageRole::Assistant).expect("serialize");
        assert_eq!(json, format!("\"{}\"", MessageRole::Assistant.as_str()));
    }

    #[test]
    fn message_serde_roundtrip() {
        let msg = Message::assistant(ConversationId::new(), "답: 4");
        let json = serde_json::to_string(&msg).expect("serialize");
        let parsed: Message = serde_json::from_str(&json).expect("deserialize");

        assert_eq!(msg.id, parsed.id);
        assert_eq!(msg.content, parsed.content);
    }
}
