//! API error types for server operations.
//!
//! Engine and gateway errors are mapped to HTTP statuses here, with
//! user-safe bodies. Failure classes stay distinguishable across the
//! boundary: validation, missing conversation, store trouble, and the
//! invocation classes each get their own status/message.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use std::fmt;
use stepwise_ai::LlmError;
use stepwise_conversation::{ExchangeError, StoreError};

/// Errors surfaced by the HTTP API.
#[derive(Debug)]
pub enum ApiError {
    /// The request carried no caller identity.
    MissingIdentity,
    /// A path or header value failed to parse.
    InvalidId { id: String, reason: String },
    /// The submitted question was empty.
    EmptyQuestion,
    /// The submitted title was empty.
    EmptyTitle,
    /// The conversation does not exist.
    ConversationNotFound { id: String },
    /// The durable store cannot be reached.
    StoreUnavailable { details: String },
    /// A database operation failed.
    DatabaseError { details: String },
    /// The LLM invocation timed out.
    InvocationTimeout { details: String },
    /// The LLM invocation failed (transport, provider, or malformed payload).
    InvocationFailed { details: String },
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingIdentity => write!(f, "request carried no caller identity"),
            Self::InvalidId { id, reason } => {
                write!(f, "invalid id '{}': {}", id, reason)
            }
            Self::EmptyQuestion => write!(f, "question must not be empty"),
            Self::EmptyTitle => write!(f, "title must not be empty"),
            Self::ConversationNotFound { id } => {
                write!(f, "conversation '{}' not found", id)
            }
            Self::StoreUnavailable { details } => {
                write!(f, "store unavailable: {}", details)
            }
            Self::DatabaseError { details } => {
                write!(f, "database error: {}", details)
            }
            Self::InvocationTimeout { details } => {
                write!(f, "invocation timed out: {}", details)
            }
            Self::InvocationFailed { details } => {
                write!(f, "invocation failed: {}", details)
            }
        }
    }
}

impl std::error::Error for ApiError {}

impl From<ExchangeError> for ApiError {
    fn from(err: ExchangeError) -> Self {
        match err {
            ExchangeError::EmptyQuestion => Self::EmptyQuestion,
            ExchangeError::EmptyTitle => Self::EmptyTitle,
            ExchangeError::ConversationNotFound { id } => Self::ConversationNotFound {
                id: id.to_string(),
            },
            ExchangeError::Store {
                error: StoreError::Unavailable { .. },
                ..
            } => Self::StoreUnavailable {
                details: err.to_string(),
            },
            ExchangeError::Store { .. } => Self::DatabaseError {
                details: err.to_string(),
            },
            ExchangeError::Invocation {
                error: LlmError::Timeout { .. },
                ..
            } => Self::InvocationTimeout {
                details: err.to_string(),
            },
            ExchangeError::Invocation { .. } => Self::InvocationFailed {
                details: err.to_string(),
            },
        }
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        Self::DatabaseError {
            details: err.to_string(),
        }
    }
}

/// JSON body returned for every error response.
#[derive(Debug, Serialize)]
struct ErrorBody {
    error: &'static str,
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            Self::MissingIdentity => StatusCode::UNAUTHORIZED,
            Self::InvalidId { .. } | Self::EmptyQuestion | Self::EmptyTitle => {
                StatusCode::BAD_REQUEST
            }
            Self::ConversationNotFound { .. } => StatusCode::NOT_FOUND,
            Self::StoreUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            Self::DatabaseError { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Self::InvocationTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            Self::InvocationFailed { .. } => StatusCode::BAD_GATEWAY,
        }
    }

    /// User-safe message; details stay in the server logs.
    fn public_message(&self) -> &'static str {
        match self {
            Self::MissingIdentity => "Not authenticated",
            Self::InvalidId { .. } => "Invalid identifier",
            Self::EmptyQuestion => "Question must not be empty",
            Self::EmptyTitle => "Title must not be empty",
            Self::ConversationNotFound { .. } => "Conversation not found",
            Self::StoreUnavailable { .. } => "Storage unavailable",
            Self::DatabaseError { .. } => "Database error",
            Self::InvocationTimeout { .. } => "Answer generation timed out",
            Self::InvocationFailed { .. } => "Answer generation failed",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, status = %status, "Request failed");
        } else {
            tracing::debug!(error = %self, status = %status, "Request rejected");
        }

        (
            status,
            Json(ErrorBody {
                error: self.public_message(),
            }),
        )
            .into_response()
    }
}
