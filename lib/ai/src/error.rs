//! Error types for the AI crate.
//!
//! `LlmError` classifies every way an invocation can fail. The classes are
//! deliberately distinguishable: a malformed completion payload is its own
//! variant rather than a caught-and-defaulted "no answer", since masking it
//! would hide upstream problems from the caller.

use std::fmt;

/// Errors from LLM backend operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LlmError {
    /// The endpoint could not be reached.
    ProviderUnavailable { endpoint: String, reason: String },
    /// The endpoint answered with an error status.
    RequestFailed { status: u16, reason: String },
    /// The response body could not be decoded.
    ResponseParseFailed { reason: String },
    /// The response decoded but carried no usable completion text.
    MalformedCompletion { reason: String },
    /// The bounded wait elapsed before a response arrived.
    Timeout { endpoint: String },
    /// Invalid backend configuration.
    InvalidConfig { reason: String },
}

impl fmt::Display for LlmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ProviderUnavailable { endpoint, reason } => {
                write!(f, "LLM endpoint '{endpoint}' unavailable: {reason}")
            }
            Self::RequestFailed { status, reason } => {
                write!(f, "LLM request failed with HTTP {status}: {reason}")
            }
            Self::ResponseParseFailed { reason } => {
                write!(f, "failed to parse LLM response: {reason}")
            }
            Self::MalformedCompletion { reason } => {
                write!(f, "LLM returned a malformed completion: {reason}")
            }
            Self::Timeout { endpoint } => {
                write!(f, "request to '{endpoint}' timed out")
            }
            Self::InvalidConfig { reason } => {
                write!(f, "invalid LLM configuration: {reason}")
            }
        }
    }
}

impl std::error::Error for LlmError {}
