//! Conversation records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use stepwise_core::{ConversationId, UserId};

/// Title given to a conversation created without one.
pub const DEFAULT_TITLE: &str = "새 대화";

/// A conversation owned by a user.
///
/// The conversation exclusively owns its messages: deleting it deletes them.
/// A conversation with zero messages is valid and displayable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    /// Unique conversation identifier.
    pub id: ConversationId,
    /// The user who created this conversation. Immutable.
    pub user_id: UserId,
    /// Short display title.
    pub title: String,
    /// When the conversation was created.
    pub created_at: DateTime<Utc>,
    /// When the last exchange completed. Advanced exactly once per
    /// completed exchange.
    pub last_activity_at: DateTime<Utc>,
}

impl Conversation {
    /// Creates a new conversation for a user.
    ///
    /// A missing title falls back to [`DEFAULT_TITLE`].
    #[must_use]
    pub fn new(user_id: UserId, title: Option<String>) -> Self {
        let now = Utc::now();
        let title = match title {
            Some(t) if !t.trim().is_empty() => t,
            _ => DEFAULT_TITLE.to_string(),
        };
        Self {
            id: ConversationId::new(),
            user_id,
            title,
            created_at: now,
            last_activity_at: now,
        }
    }

    /// Renames the conversation.
    pub fn rename(&mut self, title: impl Into<String>) {
        self.title = title.into();
    }

    /// Advances the activity timestamp.
    pub fn touch(&mut self, at: DateTime<Utc>) {
        self.last_activity_at = at;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conversation_creation() {
        let user_id = UserId::new();
        let conversation = Conversation::new(user_id, Some("이차방정식".to_string()));

        assert_eq!(conversation.user_id, user_id);
        assert_eq!(conversation.title, "이차방정식");
        assert_eq!(conversation.created_at, conversation.last_activity_at);
    }

    #[test]
    fn missing_title_falls_back_to_default() {
        let conversation = Conversation::new(UserId::new(), None);
        assert_eq!(conversation.title, DEFAULT_TITLE);
    }

    #[test]
    fn blank_title_falls_back_to_default() {
        let conversation = Conversation::new(UserId::new(), Some("   ".to_string()));
        assert_eq!(conversation.title, DEFAULT_TITLE);
    }

    #[test]
    fn rename_replaces_title() {
        let mut conversation = Conversation::new(UserId::new(), None);
        conversation.rename("삼각함수 복습");
        assert_eq!(conversation.title, "삼각함수 복습");
    }

    #[test]
    fn touch_advances_activity_only() {
        let mut conversation = Conversation::new(UserId::new(), None);
        let created = conversation.created_at;
        let later = created + chrono::Duration::seconds(30);

        conversation.touch(later);

        assert_eq!(conversation.last_activity_at, later);
        assert_eq!(conversation.created_at, created);
    }

    #[test]
    fn conversation_serde_roundtrip() {
        let conversation = Conversation::new(UserId::new(), None);
        let json = serde_json::to_string(&conversation).expect("serialize");
        let parsed: Conversation = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(conversation, parsed);
    }
}
