//! The exchange engine.
//!
//! Coordinates the stores, the context window builder, and the completion
//! backend to implement conversation lifecycle operations and the
//! question→answer exchange. The engine is the writer-of-record for
//! exchange-driven rows; collaborators are injected at construction and
//! their lifecycles belong to whatever composes the engine.

use crate::context::ContextWindow;
use crate::conversation::Conversation;
use crate::error::ExchangeError;
use crate::message::Message;
use crate::store::{ConversationStore, MessageStore};
use chrono::Utc;
use stepwise_ai::CompletionBackend;
use stepwise_core::{ConversationId, UserId};

/// Orchestrates conversations, message persistence, and LLM invocations.
pub struct ExchangeEngine<C, M, B> {
    conversations: C,
    messages: M,
    backend: B,
    window: ContextWindow,
}

impl<C, M, B> ExchangeEngine<C, M, B>
where
    C: ConversationStore,
    M: MessageStore,
    B: CompletionBackend,
{
    /// Creates an engine over the given stores and backend.
    pub fn new(conversations: C, messages: M, backend: B, window: ContextWindow) -> Self {
        Self {
            conversations,
            messages,
            backend,
            window,
        }
    }

    /// Creates a new conversation for a user.
    ///
    /// A missing title falls back to the default placeholder.
    pub async fn create_conversation(
        &self,
        user_id: UserId,
        title: Option<String>,
    ) -> Result<Conversation, ExchangeError> {
        let conversation = Conversation::new(user_id, title);
        self.conversations
            .create(&conversation)
            .await
            .map_err(|error| ExchangeError::Store {
                operation: "create_conversation",
                error,
            })?;

        tracing::info!(
            conversation_id = %conversation.id,
            user_id = %user_id,
            "Created conversation"
        );
        Ok(conversation)
    }

    /// Lists a user's conversations, most recently active first.
    pub async fn list_conversations(
        &self,
        user_id: UserId,
    ) -> Result<Vec<Conversation>, ExchangeError> {
        self.conversations
            .list_for_user(user_id)
            .await
            .map_err(|error| ExchangeError::Store {
                operation: "list_conversations",
                error,
            })
    }

    /// Returns a conversation's full message log, oldest first.
    ///
    /// This is the canonical read used both for display and as the source
    /// for context building.
    pub async fn get_messages(
        &self,
        id: ConversationId,
    ) -> Result<Vec<Message>, ExchangeError> {
        self.require_conversation(id).await?;
        self.messages
            .list(id)
            .await
            .map_err(|error| ExchangeError::Store {
                operation: "list_messages",
                error,
            })
    }

    /// Renames a conversation. Does not advance its activity timestamp.
    pub async fn rename_conversation(
        &self,
        id: ConversationId,
        title: &str,
    ) -> Result<(), ExchangeError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(ExchangeError::EmptyTitle);
        }

        self.require_conversation(id).await?;
        self.conversations
            .rename(id, title)
            .await
            .map_err(|error| ExchangeError::Store {
                operation: "rename_conversation",
                error,
            })
    }

    /// Deletes a conversation and all of its messages.
    pub async fn delete_conversation(&self, id: ConversationId) -> Result<(), ExchangeError> {
        self.require_conversation(id).await?;
        self.conversations
            .delete(id)
            .await
            .map_err(|error| ExchangeError::Store {
                operation: "delete_conversation",
                error,
            })?;

        tracing::info!(conversation_id = %id, "Deleted conversation");
        Ok(())
    }

    /// Executes one question→answer exchange.
    ///
    /// The user's question is committed durably before the LLM is invoked,
    /// so a failed invocation never loses it. The assistant's answer and the
    /// conversation's activity timestamp are committed only on success; a
    /// trailing unanswered user message is a valid, representable state.
    pub async fn solve_problem(
        &self,
        id: ConversationId,
        question: &str,
    ) -> Result<String, ExchangeError> {
        let question = question.trim();
        if question.is_empty() {
            return Err(ExchangeError::EmptyQuestion);
        }
        self.require_conversation(id).await?;

        let user_message = Message::user(id, question);
        self.messages
            .append(&user_message)
            .await
            .map_err(|error| ExchangeError::Store {
                operation: "append_user_message",
                error,
            })?;

        // Read the log back rather than threading the new message through:
        // the context must reflect what was actually persisted.
        let history = self
            .messages
            .list(id)
            .await
            .map_err(|error| ExchangeError::Store {
                operation: "list_messages",
                error,
            })?;
        let context = self.window.build(&history);

        let completion = self.backend.complete(&context).await.map_err(|error| {
            tracing::warn!(
                conversation_id = %id,
                error = %error,
                "Invocation failed; user message retained"
            );
            ExchangeError::Invocation { id, error }
        })?;

        tracing::debug!(
            conversation_id = %id,
            model = %completion.model,
            input_tokens = completion.usage.input_tokens,
            output_tokens = completion.usage.output_tokens,
            "Completion received"
        );

        let assistant_message = Message::assistant(id, completion.content);
        self.messages
            .append(&assistant_message)
            .await
            .map_err(|error| ExchangeError::Store {
                operation: "append_assistant_message",
                error,
            })?;
        self.conversations
            .touch(id, Utc::now())
            .await
            .map_err(|error| ExchangeError::Store {
                operation: "touch_conversation",
                error,
            })?;

        Ok(assistant_message.content)
    }

    async fn require_conversation(
        &self,
        id: ConversationId,
    ) -> Result<Conversation, ExchangeError> {
        self.conversations
            .find(id)
            .await
            .map_err(|error| ExchangeError::Store {
                operation: "find_conversation",
                error,
            })?
            .ok_or(ExchangeError::ConversationNotFound { id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::message::MessageRole;
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use std::sync::{Arc, Mutex};
    use stepwise_ai::{ChatMessage, ChatRole, Completion, LlmError, TokenUsage};

    /// Shared in-memory store backing both store contracts.
    #[derive(Default)]
    struct InMemoryStore {
        conversations: Mutex<Vec<Conversation>>,
        messages: Mutex<Vec<Message>>,
    }

    #[async_trait]
    impl ConversationStore for Arc<InMemoryStore> {
        async fn create(&self, conversation: &Conversation) -> Result<(), StoreError> {
            self.conversations.lock().unwrap().push(conversation.clone());
            Ok(())
        }

        async fn find(&self, id: ConversationId) -> Result<Option<Conversation>, StoreError> {
            Ok(self
                .conversations
                .lock()
                .unwrap()
                .iter()
                .find(|c| c.id == id)
                .cloned())
        }

        async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Conversation>, StoreError> {
            let mut listed: Vec<Conversation> = self
                .conversations
                .lock()
                .unwrap()
                .iter()
                .filter(|c| c.user_id == user_id)
                .cloned()
                .collect();
            listed.sort_by(|a, b| b.last_activity_at.cmp(&a.last_activity_at));
            Ok(listed)
        }

        async fn rename(&self, id: ConversationId, title: &str) -> Result<(), StoreError> {
            for conversation in self.conversations.lock().unwrap().iter_mut() {
                if conversation.id == id {
                    conversation.rename(title);
                }
            }
            Ok(())
        }

        async fn touch(&self, id: ConversationId, at: DateTime<Utc>) -> Result<(), StoreError> {
            for conversation in self.conversations.lock().unwrap().iter_mut() {
                if conversation.id == id {
                    conversation.touch(at);
                }
            }
            Ok(())
        }

        async fn delete(&self, id: ConversationId) -> Result<(), StoreError> {
            self.conversations.lock().unwrap().retain(|c| c.id != id);
            self.messages
                .lock()
                .unwrap()
                .retain(|m| m.conversation_id != id);
            Ok(())
        }
    }

    #[async_trait]
    impl MessageStore for Arc<InMemoryStore> {
        async fn append(&self, message: &Message) -> Result<(), StoreError> {
            self.messages.lock().unwrap().push(message.clone());
            Ok(())
        }

        async fn list(&self, conversation_id: ConversationId) -> Result<Vec<Message>, StoreError> {
            Ok(self
                .messages
                .lock()
                .unwrap()
                .iter()
                .filter(|m| m.conversation_id == conversation_id)
                .cloned()
                .collect())
        }
    }

    /// Backend stub returning a fixed reply and recording received contexts.
    struct StubBackend {
        reply: Result<String, LlmError>,
        calls: Mutex<Vec<Vec<ChatMessage>>>,
    }

    impl StubBackend {
        fn answering(reply: impl Into<String>) -> Self {
            Self {
                reply: Ok(reply.into()),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn failing(error: LlmError) -> Self {
            Self {
                reply: Err(error),
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl CompletionBackend for StubBackend {
        async fn complete(&self, messages: &[ChatMessage]) -> Result<Completion, LlmError> {
            self.calls.lock().unwrap().push(messages.to_vec());
            self.reply.clone().map(|content| Completion {
                content,
                model: "stub".to_string(),
                usage: TokenUsage::default(),
            })
        }

        fn model(&self) -> &str {
            "stub"
        }
    }

    type TestEngine = ExchangeEngine<Arc<InMemoryStore>, Arc<InMemoryStore>, Arc<StubBackend>>;

    fn engine_with(backend: StubBackend) -> (TestEngine, Arc<InMemoryStore>, Arc<StubBackend>) {
        let store = Arc::new(InMemoryStore::default());
        let backend = Arc::new(backend);
        let engine = ExchangeEngine::new(
            store.clone(),
            store.clone(),
            backend.clone(),
            ContextWindow::default(),
        );
        (engine, store, backend)
    }

    #[tokio::test]
    async fn successful_exchange_appends_causal_pair() {
        let (engine, _, _) = engine_with(StubBackend::answering("답: 4"));
        let conversation = engine
            .create_conversation(UserId::new(), None)
            .await
            .expect("create");

        let answer = engine
            .solve_problem(conversation.id, "2+2는?")
            .await
            .expect("exchange");
        assert_eq!(answer, "답: 4");

        let log = engine.get_messages(conversation.id).await.expect("log");
        assert_eq!(log.len(), 2);
        assert_eq!(log[0].role, MessageRole::User);
        assert_eq!(log[0].content, "2+2는?");
        assert_eq!(log[1].role, MessageRole::Assistant);
        assert_eq!(log[1].content, "답: 4");
    }

    #[tokio::test]
    async fn successful_exchange_advances_activity() {
        let (engine, store, _) = engine_with(StubBackend::answering("답"));
        let conversation = engine
            .create_conversation(UserId::new(), None)
            .await
            .expect("create");
        let created_activity = conversation.last_activity_at;

        engine
            .solve_problem(conversation.id, "질문")
            .await
            .expect("exchange");

        let stored = ConversationStore::find(&store, conversation.id)
            .await
            .expect("find")
            .expect("exists");
        assert!(stored.last_activity_at > created_activity);
    }

    #[tokio::test]
    async fn failed_invocation_keeps_user_message_only() {
        let (engine, store, _) = engine_with(StubBackend::failing(LlmError::Timeout {
            endpoint: "stub".to_string(),
        }));
        let conversation = engine
            .create_conversation(UserId::new(), None)
            .await
            .expect("create");
        let created_activity = conversation.last_activity_at;

        let err = engine
            .solve_problem(conversation.id, "적분 문제를 풀어줘")
            .await
            .expect_err("should fail");
        assert!(matches!(
            err,
            ExchangeError::Invocation {
                error: LlmError::Timeout { .. },
                ..
            }
        ));

        let log = engine.get_messages(conversation.id).await.expect("log");
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].role, MessageRole::User);
        assert_eq!(log[0].content, "적분 문제를 풀어줘");

        let stored = ConversationStore::find(&store, conversation.id)
            .await
            .expect("find")
            .expect("exists");
        assert_eq!(stored.last_activity_at, created_activity);
    }

    #[tokio::test]
    async fn empty_question_rejected_before_any_write() {
        let (engine, store, backend) = engine_with(StubBackend::answering("답"));
        let conversation = engine
            .create_conversation(UserId::new(), None)
            .await
            .expect("create");

        let err = engine
            .solve_problem(conversation.id, "   ")
            .await
            .expect_err("should fail");
        assert_eq!(err, ExchangeError::EmptyQuestion);

        assert!(store.messages.lock().unwrap().is_empty());
        assert!(backend.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn unknown_conversation_rejected_before_any_write() {
        let (engine, store, _) = engine_with(StubBackend::answering("답"));

        let missing = ConversationId::new();
        let err = engine
            .solve_problem(missing, "2+2는?")
            .await
            .expect_err("should fail");
        assert_eq!(err, ExchangeError::ConversationNotFound { id: missing });

        assert!(store.messages.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn context_includes_fresh_user_message_after_system_entry() {
        let (engine, _, backend) = engine_with(StubBackend::answering("답"));
        let conversation = engine
            .create_conversation(UserId::new(), None)
            .await
            .expect("create");

        engine
            .solve_problem(conversation.id, "미분이란?")
            .await
            .expect("exchange");

        let calls = backend.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        let context = &calls[0];
        assert_eq!(context[0].role, ChatRole::System);
        assert_eq!(context.last().expect("nonempty").content, "미분이란?");
    }

    #[tokio::test]
    async fn context_is_bounded_for_long_conversations() {
        let (engine, store, backend) = engine_with(StubBackend::answering("답"));
        let conversation = engine
            .create_conversation(UserId::new(), None)
            .await
            .expect("create");

        // 15 prior messages already in the log.
        for i in 0..15 {
            let role = if i % 2 == 0 {
                MessageRole::User
            } else {
                MessageRole::Assistant
            };
            MessageStore::append(
                &store,
                &Message::new(conversation.id, role, format!("prior {i}")),
            )
            .await
            .expect("append");
        }

        engine
            .solve_problem(conversation.id, "마지막 질문")
            .await
            .expect("exchange");

        let calls = backend.calls.lock().unwrap();
        let context = &calls[0];
        // System entry plus the 10 most recent of the 16 log messages.
        assert_eq!(context.len(), 11);
        assert_eq!(context[1].content, "prior 6");
        assert_eq!(context.last().expect("nonempty").content, "마지막 질문");
    }

    #[tokio::test]
    async fn list_orders_by_recent_activity() {
        let (engine, _, _) = engine_with(StubBackend::answering("답"));
        let user_id = UserId::new();

        let a = engine
            .create_conversation(user_id, Some("A".to_string()))
            .await
            .expect("create a");
        let b = engine
            .create_conversation(user_id, Some("B".to_string()))
            .await
            .expect("create b");

        // Complete an exchange in A so it becomes the most recent.
        engine.solve_problem(a.id, "질문").await.expect("exchange");

        let listed = engine.list_conversations(user_id).await.expect("list");
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, a.id);
        assert_eq!(listed[1].id, b.id);
    }

    #[tokio::test]
    async fn list_excludes_other_users() {
        let (engine, _, _) = engine_with(StubBackend::answering("답"));
        let owner = UserId::new();
        engine
            .create_conversation(owner, None)
            .await
            .expect("create");
        engine
            .create_conversation(UserId::new(), None)
            .await
            .expect("create other");

        let listed = engine.list_conversations(owner).await.expect("list");
        assert_eq!(listed.len(), 1);
    }

    #[tokio::test]
    async fn delete_cascades_to_messages() {
        let (engine, store, _) = engine_with(StubBackend::answering("답"));
        let conversation = engine
            .create_conversation(UserId::new(), None)
            .await
            .expect("create");
        engine
            .solve_problem(conversation.id, "질문")
            .await
            .expect("exchange");

        engine
            .delete_conversation(conversation.id)
            .await
            .expect("delete");

        assert!(store.conversations.lock().unwrap().is_empty());
        assert!(store.messages.lock().unwrap().is_empty());

        let err = engine
            .get_messages(conversation.id)
            .await
            .expect_err("should be gone");
        assert_eq!(
            err,
            ExchangeError::ConversationNotFound {
                id: conversation.id
            }
        );
    }

    #[tokio::test]
    async fn rename_persists_title_without_touching_activity() {
        let (engine, store, _) = engine_with(StubBackend::answering("답"));
        let conversation = engine
            .create_conversation(UserId::new(), None)
            .await
            .expect("create");

        engine
            .rename_conversation(conversation.id, "수열의 극한")
            .await
            .expect("rename");

        let stored = ConversationStore::find(&store, conversation.id)
            .await
            .expect("find")
            .expect("exists");
        assert_eq!(stored.title, "수열의 극한");
        assert_eq!(stored.last_activity_at, conversation.last_activity_at);
    }

    #[tokio::test]
    async fn rename_rejects_blank_title() {
        let (engine, _, _) = engine_with(StubBackend::answering("답"));
        let conversation = engine
            .create_conversation(UserId::new(), None)
            .await
            .expect("create");

        let err = engine
            .rename_conversation(conversation.id, "  ")
            .await
            .expect_err("should fail");
        assert_eq!(err, ExchangeError::EmptyTitle);
    }

    #[tokio::test]
    async fn malformed_completion_is_surfaced_not_persisted() {
        let (engine, _, _) = engine_with(StubBackend::failing(LlmError::MalformedCompletion {
            reason: "completion message carried no text content".to_string(),
        }));
        let conversation = engine
            .create_conversation(UserId::new(), None)
            .await
            .expect("create");

        let err = engine
            .solve_problem(conversation.id, "질문")
            .await
            .expect_err("should fail");
        assert!(matches!(
            err,
            ExchangeError::Invocation {
                error: LlmError::MalformedCompletion { .. },
                ..
            }
        ));

        let log = engine.get_messages(conversation.id).await.expect("log");
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].role, MessageRole::User);
    }
}
