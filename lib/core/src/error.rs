//! Error handling foundation for the stepwise platform.
//!
//! This module provides only the `Result` type alias using rootcause.
//! The conversation, AI, and server crates define their own error enums
//! (store, exchange, and invocation classes) in their own error modules;
//! rootcause's `.context()` adds layer-appropriate context as errors
//! propagate up the stack.

use rootcause::Report;

/// A Result type alias using rootcause's Report for error handling.
///
/// Each layer adds its own context via `.context()` as errors propagate.
pub type Result<T, C = ()> = std::result::Result<T, Report<C>>;
