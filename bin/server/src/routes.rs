//! HTTP routes for the conversation API.
//!
//! Request/response shapes mirror the external interface: conversation
//! lifecycle operations plus the question→answer exchange.

use crate::db::{ConversationRepository, MessageRepository};
use crate::error::ApiError;
use crate::identity::Identity;
use crate::user::{UserPatch, UserRepository};
use axum::extract::{Path, State};
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use stepwise_ai::OpenAiCompatibleBackend;
use stepwise_conversation::{ExchangeEngine, MessageRole};
use stepwise_core::ConversationId;
use tower_http::trace::TraceLayer;

/// The concrete engine the server composes.
pub type TutorEngine =
    ExchangeEngine<ConversationRepository, MessageRepository, OpenAiCompatibleBackend>;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// The exchange engine.
    pub engine: Arc<TutorEngine>,
    /// User record repository.
    pub users: UserRepository,
}

/// Builds the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route(
            "/api/conversations",
            post(create_conversation).get(list_conversations),
        )
        .route(
            "/api/conversations/{id}",
            patch(rename_conversation).delete(delete_conversation),
        )
        .route("/api/conversations/{id}/messages", get(get_messages))
        .route("/api/conversations/{id}/solve", post(solve_problem))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Debug, Deserialize)]
pub struct CreateConversationRequest {
    #[serde(default)]
    pub title: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CreateConversationResponse {
    pub conversation_id: String,
}

#[derive(Debug, Serialize)]
pub struct ConversationSummary {
    pub id: String,
    pub title: String,
    pub last_activity: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct MessageView {
    pub id: String,
    pub role: MessageRole,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct RenameConversationRequest {
    pub title: String,
}

#[derive(Debug, Deserialize)]
pub struct SolveProblemRequest {
    pub question: String,
}

#[derive(Debug, Serialize)]
pub struct SolveProblemResponse {
    pub answer: String,
}

#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

async fn create_conversation(
    State(state): State<AppState>,
    identity: Identity,
    Json(request): Json<CreateConversationRequest>,
) -> Result<Json<CreateConversationResponse>, ApiError> {
    // Record (or refresh) the owner before hanging a conversation off them.
    let patch = UserPatch {
        display_name: identity.display_name.clone(),
        email: identity.email.clone(),
        last_seen_at: Some(Utc::now()),
    };
    state.users.upsert(identity.user_id, &patch).await?;

    let conversation = state
        .engine
        .create_conversation(identity.user_id, request.title)
        .await?;

    Ok(Json(CreateConversationResponse {
        conversation_id: conversation.id.to_string(),
    }))
}

async fn list_conversations(
    State(state): State<AppState>,
    identity: Identity,
) -> Result<Json<Vec<ConversationSummary>>, ApiError> {
    let conversations = state.engine.list_conversations(identity.user_id).await?;

    Ok(Json(
        conversations
            .into_iter()
            .map(|c| ConversationSummary {
                id: c.id.to_string(),
                title: c.title,
                last_activity: c.last_activity_at,
            })
            .collect(),
    ))
}

async fn get_messages(
    State(state): State<AppState>,
    _identity: Identity,
    Path(id): Path<String>,
) -> Result<Json<Vec<MessageView>>, ApiError> {
    let conversation_id = parse_conversation_id(&id)?;
    let messages = state.engine.get_messages(conversation_id).await?;

    Ok(Json(
        messages
            .into_iter()
            .map(|m| MessageView {
                id: m.id.to_string(),
                role: m.role,
                content: m.content,
                created_at: m.created_at,
            })
            .collect(),
    ))
}

async fn rename_conversation(
    State(state): State<AppState>,
    _identity: Identity,
    Path(id): Path<String>,
    Json(request): Json<RenameConversationRequest>,
) -> Result<Json<SuccessResponse>, ApiError> {
    let conversation_id = parse_conversation_id(&id)?;
    state
        .engine
        .rename_conversation(conversation_id, &request.title)
        .await?;

    Ok(Json(SuccessResponse { success: true }))
}

async fn delete_conversation(
    State(state): State<AppState>,
    _identity: Identity,
    Path(id): Path<String>,
) -> Result<Json<SuccessResponse>, ApiError> {
    let conversation_id = parse_conversation_id(&id)?;
    state.engine.delete_conversation(conversation_id).await?;

    Ok(Json(SuccessResponse { success: true }))
}

async fn solve_problem(
    State(state): State<AppState>,
    _identity: Identity,
    Path(id): Path<String>,
    Json(request): Json<SolveProblemRequest>,
) -> Result<Json<SolveProblemResponse>, ApiError> {
    let conversation_id = parse_conversation_id(&id)?;
    let answer = state
        .engine
        .solve_problem(conversation_id, &request.question)
        .await?;

    Ok(Json(SolveProblemResponse { answer }))
}

fn parse_conversation_id(raw: &str) -> Result<ConversationId, ApiError> {
    ConversationId::from_str(raw).map_err(|e| ApiError::InvalidId {
        id: raw.to_string(),
        reason: e.to_string(),
    })
}
